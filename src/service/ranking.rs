// Token search and top-token rankings

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use super::prices::PriceHistoryEngine;
use super::tokens::TokenCatalog;
use super::{ExplorerResult, ADDRESS_CHAINY};
use crate::cache::{CacheKey, CacheStore, ReadPolicy};
use crate::db::{Accumulator, Collection, DataSource, Filter, GroupBy, Pipeline, SortKey};
use crate::models::{RawAmount, SearchHit, SearchResult, TopToken, TokenSummary, VolumeToken};

/// Matches returned by a search; `total` still counts all of them
pub const SEARCH_RESULTS: usize = 6;

const TOP_TOKENS_TTL: Duration = Duration::from_secs(24 * 3600);
const CURRENT_VOLUME_TTL: Duration = Duration::from_secs(600);
const SECONDS_PER_DAY: i64 = 86_400;
/// Fixed activity weight of the Chainy entry in search results
const CHAINY_SEARCH_WEIGHT: u64 = 99_999;

struct SearchCandidate {
    address: String,
    name: String,
    symbol: String,
    txs_count: u64,
}

#[derive(Clone)]
pub struct Ranking {
    db: Arc<dyn DataSource>,
    cache: CacheStore,
    tokens: TokenCatalog,
    prices: PriceHistoryEngine,
}

impl Ranking {
    pub fn new(db: Arc<dyn DataSource>, cache: CacheStore, tokens: TokenCatalog, prices: PriceHistoryEngine) -> Self {
        Self {
            db,
            cache,
            tokens,
            prices,
        }
    }

    /// Case-insensitive substring search over token name, symbol and address,
    /// most active tokens first
    pub async fn search_token(&self, query: &str) -> ExplorerResult<SearchResult> {
        let search = query.to_lowercase();
        let tokens = self.tokens.get_tokens(false).await?;

        let mut candidates: Vec<SearchCandidate> = tokens
            .iter()
            .map(|t| SearchCandidate {
                address: t.record.address.clone(),
                name: t.record.name.clone().unwrap_or_default(),
                symbol: t.record.symbol.clone().unwrap_or_default(),
                txs_count: t.record.txs_count.unwrap_or(0),
            })
            .collect();

        let chainy = SearchCandidate {
            address: ADDRESS_CHAINY.to_string(),
            name: "Chainy".to_string(),
            symbol: String::new(),
            txs_count: CHAINY_SEARCH_WEIGHT,
        };
        match candidates.iter_mut().find(|c| c.address == ADDRESS_CHAINY) {
            Some(existing) => *existing = chainy,
            None => candidates.push(chainy),
        }

        let mut found: Vec<SearchCandidate> = candidates
            .into_iter()
            .filter(|c| {
                c.address.contains(&search)
                    || (!c.name.is_empty() && c.name.to_lowercase().contains(&search))
                    || (!c.symbol.is_empty() && c.symbol.to_lowercase().contains(&search))
            })
            .collect();
        found.sort_by(|a, b| b.txs_count.cmp(&a.txs_count));

        let total = found.len();
        let results = found
            .into_iter()
            .take(SEARCH_RESULTS)
            .map(|c| SearchHit {
                name: c.name,
                symbol: c.symbol,
                address: c.address,
            })
            .collect();

        Ok(SearchResult {
            results,
            total,
            search: query.to_string(),
        })
    }

    /// Tokens with the most operations over the last `period` days
    pub async fn get_top_tokens(&self, limit: usize, period: u32) -> ExplorerResult<Vec<TopToken>> {
        let key = CacheKey::TopTokens { limit, period };
        if let Some(cached) = self
            .cache
            .get_with::<Vec<TopToken>>(&key, ReadPolicy::ttl(TOP_TOKENS_TTL))
            .await
        {
            return Ok(cached);
        }

        let since = Utc::now().timestamp() - i64::from(period) * SECONDS_PER_DAY;
        let pipeline = Pipeline::group(Filter::gt("timestamp", since), GroupBy::Field("contract"))
            .accumulate("cnt", Accumulator::Count)
            .sort(SortKey::desc("cnt"))
            .limit(limit as u64);
        let rows = self.db.aggregate(Collection::Operations, &pipeline).await?;

        let mut top = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(contract) = row.get("_id").and_then(Value::as_str) else {
                continue;
            };
            let op_count = row.get("cnt").and_then(Value::as_u64).unwrap_or(0);
            match self.tokens.get_token(contract).await? {
                Some(token) => top.push(TopToken { token, op_count }),
                None => debug!("Skipping unknown token {} in top tokens", contract),
            }
        }

        if !top.is_empty() {
            self.cache.save(key, &top).await;
        }
        Ok(top)
    }

    /// Tokens by market capitalisation at the current rate
    pub async fn get_top_tokens_by_current_volume(&self, limit: usize) -> ExplorerResult<Vec<VolumeToken>> {
        let key = CacheKey::TopTokensByCurrentVolume { limit };
        if let Some(cached) = self
            .cache
            .get_with::<Vec<VolumeToken>>(&key, ReadPolicy::ttl(CURRENT_VOLUME_TTL))
            .await
        {
            return Ok(cached);
        }

        let tokens = self.tokens.get_tokens(false).await?;
        let mut ranked = Vec::new();
        for summary in tokens.iter() {
            let address = &summary.record.address;
            let Some(price) = self.prices.get_token_price(address, false).await else {
                continue;
            };
            let supply = summary.record.total_supply.as_ref().map(RawAmount::as_f64).unwrap_or(0.0);
            if supply == 0.0 {
                continue;
            }
            let Some(token) = self.tokens.get_token(address).await? else {
                continue;
            };

            ranked.push(VolumeToken {
                volume: price.rate * token.scale(supply),
                token: with_name(summary, token.name),
            });
        }

        let top = rank_by_volume(ranked, limit);
        self.cache.save(key, &top).await;
        Ok(top)
    }

    /// Tokens by traded value over the last `period` days
    pub async fn get_top_tokens_by_period_volume(&self, limit: usize, period: u32) -> ExplorerResult<Vec<VolumeToken>> {
        let key = CacheKey::TopTokensByPeriodVolume { limit, period };
        if let Some(cached) = self
            .cache
            .get_with::<Vec<VolumeToken>>(&key, ReadPolicy::ttl(TOP_TOKENS_TTL))
            .await
        {
            return Ok(cached);
        }

        let tokens = self.tokens.get_tokens(false).await?;
        let mut ranked = Vec::new();
        for summary in tokens.iter() {
            let address = &summary.record.address;
            let has_supply = summary.record.total_supply.as_ref().is_some_and(|s| !s.is_zero());
            if !has_supply || self.prices.get_token_price(address, false).await.is_none() {
                continue;
            }
            let Some(token) = self.tokens.get_token(address).await? else {
                continue;
            };

            let volume = self.prices.period_volume(&token, period).await?;
            ranked.push(VolumeToken {
                volume,
                token: with_name(summary, token.name),
            });
        }

        let top = rank_by_volume(ranked, limit);
        self.cache.save(key, &top).await;
        Ok(top)
    }
}

fn with_name(summary: &TokenSummary, name: Option<String>) -> TokenSummary {
    let mut summary = summary.clone();
    if name.is_some() {
        summary.record.name = name;
    }
    summary
}

/// Highest volumes first, keeping catalog order among equal volumes
pub fn rank_by_volume(mut tokens: Vec<VolumeToken>, limit: usize) -> Vec<VolumeToken> {
    tokens.sort_by(|a, b| b.volume.total_cmp(&a.volume));
    tokens.truncate(limit);
    tokens
}
