use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use super::operations::{self, contract_operations_query, holders_query, LastTransfersQuery};
use super::prices::PriceHistoryEngine;
use super::ExplorerResult;
use crate::cache::{CacheKey, CacheStore, ReadPolicy};
use crate::config::ClientTokenOverride;
use crate::db::{decode_all, Accumulator, Collection, DataSource, Filter, FindOptions, GroupBy, Pipeline, SortKey};
use crate::models::{
    Balance, Holder, OperationKind, OperationView, RawAmount, TokenList, TokenRecord, TokenSummary, TokenView,
};
use crate::query::TextFilter;

/// How long a resolved token stays fresh
pub const TOKEN_TTL: Duration = Duration::from_secs(30);

/// Supply above which a token without decimals is assumed to use 18
const DECIMALS_GUESS_THRESHOLD: f64 = 1e18;

/// Stored keys that would shadow values computed for the token views
const COMPUTED_FIELDS: [&str; 5] = ["estimatedDecimals", "holdersCount", "totalIn", "totalOut", "price"];

/// Token metadata with inferred decimals, operation counters, balance
/// aggregates and the current price.
#[derive(Clone)]
pub struct TokenCatalog {
    db: Arc<dyn DataSource>,
    cache: CacheStore,
    prices: PriceHistoryEngine,
    overrides: Arc<HashMap<String, ClientTokenOverride>>,
}

impl TokenCatalog {
    pub fn new(
        db: Arc<dyn DataSource>,
        cache: CacheStore,
        prices: PriceHistoryEngine,
        overrides: Arc<HashMap<String, ClientTokenOverride>>,
    ) -> Self {
        Self {
            db,
            cache,
            prices,
            overrides,
        }
    }

    /// All tokens, most transferred first, with balance sums and holder counts
    pub async fn get_tokens(&self, force_refresh: bool) -> ExplorerResult<TokenList> {
        if !force_refresh {
            if let Some(tokens) = self.cache.get::<TokenList>(&CacheKey::Tokens).await {
                return Ok(tokens);
            }
        }

        let options = FindOptions::sorted(vec![SortKey::desc("transfersCount")]);
        let docs = self.db.find(Collection::Tokens, &Filter::All, &options).await?;
        let records: Vec<TokenRecord> = decode_all(docs)?;
        let totals = self.balance_totals().await?;

        let mut tokens = Vec::with_capacity(records.len());
        for mut record in records {
            for field in COMPUTED_FIELDS {
                record.extra.remove(field);
            }
            self.apply_override(&mut record.name, &mut record.symbol, &record.address);
            let (total_in, total_out) = totals.get(&record.address).copied().unwrap_or_default();
            let holders_count = self.get_token_holders_count(&record.address, None).await?;
            tokens.push(TokenSummary {
                record,
                total_in,
                total_out,
                holders_count,
            });
        }

        info!("Loaded {} tokens from the store", tokens.len());
        let tokens = TokenList(tokens);
        self.cache.save(CacheKey::Tokens, &tokens).await;
        Ok(tokens)
    }

    /// Summed `totalIn`/`totalOut` of all balances, by contract
    async fn balance_totals(&self) -> ExplorerResult<HashMap<String, (f64, f64)>> {
        let pipeline = Pipeline::group(Filter::All, GroupBy::Field("contract"))
            .accumulate("totalIn", Accumulator::Sum("totalIn"))
            .accumulate("totalOut", Accumulator::Sum("totalOut"));
        let rows = self.db.aggregate(Collection::Balances, &pipeline).await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let contract = row.get("_id")?.as_str()?.to_string();
                let total_in = row.get("totalIn").and_then(Value::as_f64).unwrap_or(0.0);
                let total_out = row.get("totalOut").and_then(Value::as_f64).unwrap_or(0.0);
                Some((contract, (total_in, total_out)))
            })
            .collect())
    }

    fn apply_override(&self, name: &mut Option<String>, symbol: &mut Option<String>, address: &str) {
        if let Some(custom) = self.overrides.get(address) {
            if let Some(custom_name) = &custom.name {
                *name = Some(custom_name.clone());
            }
            if let Some(custom_symbol) = &custom.symbol {
                *symbol = Some(custom_symbol.clone());
            }
        }
    }

    /// Resolved token, `None` when the address is not a known token.
    ///
    /// Negative results are cached too.
    pub async fn get_token(&self, address: &str) -> ExplorerResult<Option<TokenView>> {
        let key = CacheKey::token(address);
        if let Some(cached) = self
            .cache
            .get_with::<Option<TokenView>>(&key, ReadPolicy::ttl(TOKEN_TTL))
            .await
        {
            return Ok(cached);
        }

        let tokens = self.get_tokens(false).await?;
        let token = match tokens.get(address) {
            Some(summary) => Some(self.resolve(summary.clone()).await?),
            None => {
                debug!("{} is not a known token", address);
                None
            }
        };

        self.cache.save(key, &token).await;
        Ok(token)
    }

    async fn resolve(&self, summary: TokenSummary) -> ExplorerResult<TokenView> {
        let TokenSummary {
            record,
            total_in,
            total_out,
            holders_count,
        } = summary;
        let address = record.address;

        let (decimals, estimated_decimals) = infer_decimals(
            record.decimals.as_ref(),
            record.total_supply.as_ref().map(RawAmount::as_f64),
        );

        let db = self.db.as_ref();
        let transfers_count = contract_operations_query(&address, &[OperationKind::Transfer])
            .count_total(db)
            .await?;
        let issuances_count = contract_operations_query(&address, &OperationKind::ISSUANCES)
            .count_total(db)
            .await?;

        let mut name = record.name;
        let mut symbol = record.symbol;
        self.apply_override(&mut name, &mut symbol, &address);

        let price = self.prices.get_token_price(&address, false).await.map(|mut price| {
            price.currency = Some("USD".to_string());
            price
        });

        Ok(TokenView {
            name,
            symbol: symbol.unwrap_or_default(),
            decimals,
            estimated_decimals,
            total_supply: record.total_supply,
            owner: record.owner,
            txs_count: record.txs_count.map(|count| count + 1),
            transfers_count,
            issuances_count,
            holders_count,
            total_in,
            total_out,
            price,
            extra: record.extra,
            address,
        })
    }

    pub async fn get_token_holders_count(&self, address: &str, text: Option<&TextFilter>) -> ExplorerResult<u64> {
        Ok(holders_query(address).count(self.db.as_ref(), text).await?)
    }

    /// Holders by balance with their share of supply; empty for unknown tokens
    pub async fn get_token_holders(
        &self,
        address: &str,
        limit: u64,
        offset: u64,
        text: Option<&TextFilter>,
    ) -> ExplorerResult<Vec<Holder>> {
        let Some(token) = self.get_token(address).await? else {
            return Ok(Vec::new());
        };
        let docs = holders_query(address)
            .fetch(self.db.as_ref(), text, limit, offset)
            .await?;
        let balances: Vec<Balance> = decode_all(docs)?;
        Ok(holder_shares(&balances, token.total_supply.as_ref().map(RawAmount::as_f64)))
    }

    /// Latest operations, each with its token attached
    pub async fn get_last_transfers(&self, query: &LastTransfersQuery) -> ExplorerResult<Vec<OperationView>> {
        let operations = operations::find_last_transfers(self.db.as_ref(), query).await?;

        let mut views = Vec::with_capacity(operations.len());
        for operation in operations {
            let token = self.get_token(&operation.contract).await?;
            views.push(OperationView {
                operation,
                success: true,
                token,
            });
        }
        Ok(views)
    }
}

/// Decimals from the stored field, or a guess from the supply.
///
/// Returns the decimals and whether they were estimated.
pub fn infer_decimals(decimals: Option<&Value>, total_supply: Option<f64>) -> (u32, bool) {
    let stored = decimals.and_then(|value| match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    });

    match stored.map(f64::trunc) {
        Some(d) if d >= 1.0 && d <= u32::MAX as f64 => (d as u32, false),
        _ if total_supply.is_some_and(|supply| supply > DECIMALS_GUESS_THRESHOLD) => (18, true),
        _ => (0, false),
    }
}

/// Share of each holder in percent, two decimals.
///
/// Shares are taken of the page's summed balance, raised to the total
/// supply when that is larger.
pub fn holder_shares(balances: &[Balance], total_supply: Option<f64>) -> Vec<Holder> {
    let page_total: f64 = balances.iter().map(|b| b.balance).sum();
    let total = total_supply.map_or(page_total, |supply| supply.max(page_total));

    balances
        .iter()
        .map(|balance| Holder {
            address: balance.address.clone().unwrap_or_default(),
            balance: balance.balance,
            share: if total > 0.0 {
                (balance.balance / total * 10_000.0).round() / 100.0
            } else {
                0.0
            },
        })
        .collect()
}
