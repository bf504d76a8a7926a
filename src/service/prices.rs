//! Current quotes and price history of tokens, folded to daily candles and
//! combined with per-day operation counts and volumes.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use super::{is_chainy_address, ExplorerResult};
use crate::cache::{CacheKey, CacheStore, ReadPolicy};
use crate::db::{Accumulator, Collection, DataSource, Filter, GroupBy, Pipeline, SortKey};
use crate::models::{DailyCount, OperationKind, PriceHistoryGrouped, PriceQuote, TokenPrice, TokenView};
use crate::rpc::CurrencyClient;

/// Pseudo-address the price service uses for ether
pub const ETH_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

const HISTORY_GROUPED_TTL: Duration = Duration::from_secs(600);
const SECONDS_PER_DAY: i64 = 86_400;
/// Hourly records averaged for one day's rate
const HOURS_PER_DAY: usize = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Granularity {
    #[default]
    Hourly,
    Daily,
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            other => Err(format!("unknown granularity: {}", other)),
        }
    }
}

#[derive(Clone)]
pub struct PriceHistoryEngine {
    db: Arc<dyn DataSource>,
    cache: CacheStore,
    currency: Option<CurrencyClient>,
    /// Tokens whose quotes may be fetched when missing from the cache
    update_rates: Arc<HashSet<String>>,
}

impl PriceHistoryEngine {
    pub fn new(
        db: Arc<dyn DataSource>,
        cache: CacheStore,
        currency: Option<CurrencyClient>,
        update_rates: Arc<HashSet<String>>,
    ) -> Self {
        Self {
            db,
            cache,
            currency,
            update_rates,
        }
    }

    fn can_refresh(&self, address: &str) -> bool {
        self.currency.is_some() && self.update_rates.contains(address)
    }

    /// Current quote; fetched only for allow-listed tokens or when forced
    pub async fn get_token_price(&self, address: &str, force_refresh: bool) -> Option<TokenPrice> {
        let cached: Option<HashMap<String, TokenPrice>> = self.cache.get(&CacheKey::Rates).await;
        let missing = cached.as_ref().is_none_or(|rates| !rates.contains_key(address));
        let mut rates = cached.unwrap_or_default();

        if force_refresh || (missing && self.can_refresh(address)) {
            if let Some(currency) = &self.currency {
                match currency.current(address).await {
                    Some(price) => {
                        rates.insert(address.to_string(), price);
                        self.cache.save(CacheKey::Rates, &rates).await;
                    }
                    None => warn!("No current quote for {}", address),
                }
            }
        }

        rates.remove(address)
    }

    pub async fn get_eth_price(&self) -> Option<TokenPrice> {
        self.get_token_price(ETH_ADDRESS, false).await
    }

    /// Raw hourly history as returned by the price service
    async fn raw_history(&self, address: &str, force_refresh: bool) -> Option<Vec<PriceQuote>> {
        let key = CacheKey::rates_history(address);
        let cached: Option<Option<Vec<PriceQuote>>> = self.cache.get(&key).await;

        if force_refresh || (cached.is_none() && self.can_refresh(address)) {
            if let Some(currency) = &self.currency {
                let fresh = currency.history(address).await;
                self.cache.save(key, &fresh).await;
                return fresh;
            }
        }

        cached.flatten()
    }

    /// History since `period_days` days before today (all of it for 0)
    pub async fn get_token_price_history(
        &self,
        address: &str,
        period_days: u32,
        granularity: Granularity,
    ) -> Option<Vec<PriceQuote>> {
        let mut history = self.raw_history(address, false).await?;
        if period_days > 0 {
            let start = period_start(period_days);
            history.retain(|quote| quote.ts >= start);
        }
        Some(match granularity {
            Granularity::Hourly => history,
            Granularity::Daily => fold_daily(&history),
        })
    }

    pub async fn average_rate_by_date(&self, address: &str, date: &str) -> f64 {
        match self.raw_history(address, false).await {
            Some(history) => average_rate_on(&history, date),
            None => 0.0,
        }
    }

    pub async fn rate_by_timestamp(&self, address: &str, timestamp: i64) -> f64 {
        match self.raw_history(address, false).await {
            Some(history) => rate_at(&history, timestamp),
            None => 0.0,
        }
    }

    /// Operations per UTC day since midnight `period` days ago, newest day
    /// first, for all tokens or one. Chainy counts its transactions instead.
    pub async fn token_history_grouped(&self, period: u32, address: Option<&str>) -> ExplorerResult<Vec<DailyCount>> {
        if let Some(address) = address.filter(|a| is_chainy_address(a)) {
            let since = Utc::now().timestamp() - i64::from(period) * SECONDS_PER_DAY;
            let filter = Filter::eq("to", address).and(Filter::gt("timestamp", since));
            return self.daily_counts(Collection::Transactions, filter).await;
        }

        let key = CacheKey::token_history_grouped(address, period);
        if let Some(cached) = self
            .cache
            .get_with::<Vec<DailyCount>>(&key, ReadPolicy::ttl(HISTORY_GROUPED_TTL))
            .await
        {
            return Ok(cached);
        }

        let mut filter = Filter::gt("timestamp", period_start(period));
        if let Some(address) = address {
            filter = Filter::eq("contract", address).and(filter);
        }
        let counts = self.daily_counts(Collection::Operations, filter).await?;
        if !counts.is_empty() {
            self.cache.save(key, &counts).await;
        }
        Ok(counts)
    }

    async fn daily_counts(&self, collection: Collection, filter: Filter) -> ExplorerResult<Vec<DailyCount>> {
        let pipeline = Pipeline::group(filter, GroupBy::Day("timestamp"))
            .accumulate("ts", Accumulator::Min("timestamp"))
            .accumulate("cnt", Accumulator::Count)
            .sort(SortKey::desc("ts"));
        let rows = self.db.aggregate(collection, &pipeline).await?;
        Ok(rows.iter().filter_map(daily_count).collect())
    }

    /// Daily operation counts, price history and the current rate of a token
    pub async fn get_token_price_history_grouped(
        &self,
        address: &str,
        period: u32,
        granularity: Granularity,
    ) -> ExplorerResult<PriceHistoryGrouped> {
        let count_txs = self.token_history_grouped(period, Some(address)).await?;
        let prices = self.get_token_price_history(address, period, granularity).await;
        let current = self.rate_by_timestamp(address, Utc::now().timestamp()).await;

        Ok(PriceHistoryGrouped {
            count_txs,
            prices,
            current,
        })
    }

    /// Traded value of a token over the last `period` days, excluding today,
    /// each day's volume priced at that day's average rate
    pub async fn period_volume(&self, token: &TokenView, period: u32) -> ExplorerResult<f64> {
        let since = Utc::now().timestamp() - i64::from(period) * SECONDS_PER_DAY;
        let filter = Filter::eq("contract", token.address.as_str())
            .and(Filter::is_in("type", OperationKind::ALL.iter().map(OperationKind::as_str)))
            .and(Filter::gt("timestamp", since));
        let pipeline = Pipeline::group(filter, GroupBy::Day("timestamp"))
            .accumulate("sum", Accumulator::Sum("intValue"))
            .accumulate("ts", Accumulator::Min("timestamp"))
            .sort(SortKey::desc("ts"));
        let rows = self.db.aggregate(Collection::Operations, &pipeline).await?;

        let history = self.raw_history(&token.address, false).await.unwrap_or_default();
        let today = Utc::now().format("%Y-%m-%d").to_string();

        let mut volume = 0.0;
        for row in &rows {
            let Some(date) = row.get("_id").and_then(Value::as_str) else {
                continue;
            };
            if date == today {
                continue;
            }
            let sum = row.get("sum").and_then(Value::as_f64).unwrap_or(0.0);
            volume += token.scale(sum) * average_rate_on(&history, date);
        }

        debug!("Volume of {} over {} days: {}", token.address, period, volume);
        Ok(volume)
    }
}

fn daily_count(row: &Value) -> Option<DailyCount> {
    Some(DailyCount {
        date: row.get("_id")?.as_str()?.to_string(),
        ts: row.get("ts")?.as_i64()?,
        cnt: row.get("cnt")?.as_u64()?,
    })
}

/// Unix time of UTC midnight `days` days before today
pub fn period_start(days: u32) -> i64 {
    Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(u64::from(days)))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp())
        .unwrap_or_default()
}

/// Fold date-ordered hourly records into one candle per date.
///
/// A day opens with its first record, closes with its last, and spans the
/// extreme highs and lows in between.
pub fn fold_daily(records: &[PriceQuote]) -> Vec<PriceQuote> {
    let mut daily = Vec::new();
    let mut candle: Option<PriceQuote> = None;

    for (i, record) in records.iter().enumerate() {
        match candle.as_mut() {
            Some(open) if open.date == record.date => {
                open.high = open.high.max(record.high);
                open.low = open.low.min(record.low);
            }
            _ => candle = Some(record.clone()),
        }

        let closes_day = records.get(i + 1).is_none_or(|next| next.date != record.date);
        if closes_day {
            if let Some(mut done) = candle.take() {
                done.close = record.close;
                daily.push(done);
            }
        }
    }

    daily
}

/// Mean of `(open + close) / 2` over the 24 records starting at the first
/// record of `date`, rounded to two decimals; 0 when the date is absent.
///
/// Assumes hourly records.
pub fn average_rate_on(records: &[PriceQuote], date: &str) -> f64 {
    let Some(start) = records.iter().position(|r| r.date == date) else {
        return 0.0;
    };
    let window = &records[start..(start + HOURS_PER_DAY).min(records.len())];
    let sum: f64 = window.iter().map(|r| (r.open + r.close) / 2.0).sum();
    round2(sum / window.len() as f64)
}

/// Opening rate of the last record at or before `timestamp`, 0 when none
pub fn rate_at(records: &[PriceQuote], timestamp: i64) -> f64 {
    records
        .iter()
        .take_while(|r| r.ts <= timestamp)
        .last()
        .map(|r| r.open)
        .unwrap_or(0.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
