//! tests/price_tests.rs - quotes, candles and per-day aggregates

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::sync::Arc;

    use crate::{
        db::{Collection, DataSource, SqliteStore},
        models::PriceQuote,
        rpc::CurrencyClient,
        service::{
            prices::{average_rate_on, fold_daily, period_start, rate_at},
            ExplorerSettings, Granularity, PriceHistoryEngine, ADDRESS_CHAINY,
        },
        tests::fixtures::{build_explorer, now, test_cache, StubTransport, OTHER, TOKEN, WALLET},
    };

    const DAY: i64 = 86_400;

    fn quote(date: &str, ts: i64, open: f64, high: f64, low: f64, close: f64) -> PriceQuote {
        PriceQuote {
            date: date.to_string(),
            hour: None,
            ts,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    fn date_of(ts: i64) -> String {
        DateTime::from_timestamp(ts, 0).unwrap().format("%Y-%m-%d").to_string()
    }

    fn currency_stub(history: Value) -> Arc<StubTransport> {
        Arc::new(
            StubTransport::new()
                .with("getCurrencyCurrent", json!({ "rate": 3.0, "diff": 0.5 }))
                .with("getCurrencyHistory", history),
        )
    }

    fn engine(db: Arc<dyn DataSource>, stub: Arc<StubTransport>, allowed: &[&str]) -> PriceHistoryEngine {
        let update_rates: HashSet<String> = allowed.iter().map(|a| a.to_string()).collect();
        PriceHistoryEngine::new(db, test_cache(), Some(CurrencyClient::new(stub)), Arc::new(update_rates))
    }

    async fn empty_store() -> Arc<dyn DataSource> {
        Arc::new(SqliteStore::in_memory().await.unwrap())
    }

    #[test]
    fn test_fold_daily() {
        let records = vec![
            quote("2020-01-01", 100, 1.0, 2.0, 1.0, 1.5),
            quote("2020-01-01", 200, 1.5, 3.0, 1.0, 2.0),
            quote("2020-01-02", 300, 2.0, 2.5, 0.5, 2.2),
        ];
        let daily = fold_daily(&records);

        assert_eq!(daily.len(), 2, "Single-record days still produce a candle");
        assert_eq!(daily[0], quote("2020-01-01", 100, 1.0, 3.0, 1.0, 2.0));
        assert_eq!(daily[1], records[2]);
        assert!(fold_daily(&[]).is_empty());
    }

    #[test]
    fn test_average_rate_on() {
        let records = vec![
            quote("2020-01-01", 100, 1.0, 2.0, 1.0, 1.5),
            quote("2020-01-01", 200, 1.5, 3.0, 1.0, 2.0),
        ];
        assert_eq!(average_rate_on(&records, "2020-01-01"), 1.5);
        assert_eq!(average_rate_on(&records, "2020-01-05"), 0.0, "Absent date yields 0");

        let uneven = vec![quote("2020-01-01", 100, 1.0, 1.0, 1.0, 1.25)];
        assert_eq!(average_rate_on(&uneven, "2020-01-01"), 1.13, "Rounded to two decimals");
    }

    #[test]
    fn test_rate_at() {
        let records = vec![
            quote("2020-01-01", 100, 1.0, 1.0, 1.0, 1.0),
            quote("2020-01-01", 200, 1.5, 1.5, 1.5, 1.5),
        ];
        assert_eq!(rate_at(&records, 150), 1.0);
        assert_eq!(rate_at(&records, 200), 1.5);
        assert_eq!(rate_at(&records, 250), 1.5);
        assert_eq!(rate_at(&records, 50), 0.0, "Nothing at or before the timestamp");
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!("daily".parse::<Granularity>(), Ok(Granularity::Daily));
        assert_eq!("hourly".parse::<Granularity>(), Ok(Granularity::Hourly));
        assert!("weekly".parse::<Granularity>().is_err());
        assert_eq!(Granularity::default(), Granularity::Hourly);
    }

    #[test]
    fn test_period_start_is_midnight() {
        let start = period_start(3);
        assert_eq!(start % DAY, 0);
        assert!(start <= now() - 2 * DAY);
        assert!(start > now() - 4 * DAY);
    }

    #[tokio::test]
    async fn test_quotes_fetched_only_for_allow_listed_tokens() {
        let stub = currency_stub(json!([]));
        let prices = engine(empty_store().await, stub.clone(), &[TOKEN]);

        assert!(prices.get_token_price(OTHER, false).await.is_none());
        assert_eq!(stub.calls(), 0, "Not allow-listed, nothing fetched");

        let price = prices.get_token_price(TOKEN, false).await.unwrap();
        assert_eq!(price.rate, 3.0);
        assert_eq!(stub.calls(), 1);

        prices.get_token_price(TOKEN, false).await.unwrap();
        assert_eq!(stub.calls(), 1, "Cached quote reused");

        let forced = prices.get_token_price(OTHER, true).await.unwrap();
        assert_eq!(forced.rate, 3.0);
        assert_eq!(stub.calls(), 2, "Forced refresh ignores the allow-list");
        assert!(prices.get_token_price(TOKEN, false).await.is_some(), "Earlier quotes survive");
    }

    #[tokio::test]
    async fn test_price_history_daily_fold() {
        let history = json!([
            { "date": "2020-01-01", "hour": 0, "ts": 100, "open": 1.0, "high": 2.0, "low": 1.0, "close": 1.5 },
            { "date": "2020-01-01", "hour": 1, "ts": 200, "open": 1.5, "high": 3.0, "low": 0.8, "close": 2.0 },
            { "date": "2020-01-02", "hour": 0, "ts": 300, "open": 2.0, "high": 2.0, "low": 2.0, "close": 2.0 }
        ]);
        let prices = engine(empty_store().await, currency_stub(history), &[TOKEN]);

        let hourly = prices.get_token_price_history(TOKEN, 0, Granularity::Hourly).await.unwrap();
        assert_eq!(hourly.len(), 3);

        let daily = prices.get_token_price_history(TOKEN, 0, Granularity::Daily).await.unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].low, 0.8);
        assert_eq!(daily[0].close, 2.0);

        let recent = prices.get_token_price_history(TOKEN, 30, Granularity::Hourly).await.unwrap();
        assert!(recent.is_empty(), "Quotes older than the period are dropped");

        assert!(prices.get_token_price_history(OTHER, 0, Granularity::Daily).await.is_none());
    }

    #[tokio::test]
    async fn test_rate_lookups() {
        let history = json!([
            { "date": "2020-01-01", "ts": 100, "open": 2.0, "high": 2.0, "low": 2.0, "close": 4.0 }
        ]);
        let prices = engine(empty_store().await, currency_stub(history), &[TOKEN]);

        assert_eq!(prices.average_rate_by_date(TOKEN, "2020-01-01").await, 3.0);
        assert_eq!(prices.rate_by_timestamp(TOKEN, now()).await, 2.0);
        assert_eq!(prices.rate_by_timestamp(OTHER, now()).await, 0.0, "No history");
    }

    /// One whole token moved from WALLET to OTHER
    fn transfer_at(contract: &str, ts: i64) -> Value {
        json!({
            "type": "transfer", "contract": contract, "from": WALLET, "to": OTHER,
            "value": "1000000000000000000", "intValue": 1e18, "transactionHash": "0x01",
            "timestamp": ts, "priority": 0
        })
    }

    async fn recent_store() -> SqliteStore {
        let t = now();
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .insert(
                Collection::Operations,
                &[
                    transfer_at(TOKEN, t - 2 * DAY),
                    transfer_at(TOKEN, t - 2 * DAY),
                    transfer_at(TOKEN, t - DAY),
                    transfer_at(OTHER, t - DAY),
                    transfer_at(TOKEN, t - 30 * DAY),
                ],
            )
            .await
            .unwrap();
        store
            .insert(
                Collection::Transactions,
                &[
                    json!({ "hash": "0x02", "from": WALLET, "to": ADDRESS_CHAINY, "timestamp": t - DAY }),
                    json!({ "hash": "0x03", "from": WALLET, "to": ADDRESS_CHAINY, "timestamp": t - 20 * DAY }),
                ],
            )
            .await
            .unwrap();
        store
            .insert(
                Collection::Tokens,
                &[json!({ "address": TOKEN, "name": "Alpha Token", "symbol": "ALP", "decimals": 18 })],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_token_history_grouped() {
        let t = now();
        let (explorer, _) =
            build_explorer(recent_store().await, StubTransport::new(), None, ExplorerSettings::default()).await;

        let all = explorer.get_token_history_grouped(7, None).await.unwrap();
        assert_eq!(all.len(), 2, "Operations older than the period are excluded");
        assert_eq!(all[0].date, date_of(t - DAY), "Newest day first");
        assert_eq!(all[0].cnt, 2);
        assert_eq!(all[1].cnt, 2);
        assert_eq!(all[1].ts, t - 2 * DAY, "Earliest timestamp of the day");

        let token = explorer.get_token_history_grouped(7, Some(TOKEN)).await.unwrap();
        let counts: Vec<u64> = token.iter().map(|d| d.cnt).collect();
        assert_eq!(counts, vec![1, 2]);

        let chainy = explorer.get_token_history_grouped(7, Some(ADDRESS_CHAINY)).await.unwrap();
        assert_eq!(chainy.len(), 1, "Chainy counts its recent transactions");
        assert_eq!(chainy[0].cnt, 1);
    }

    #[tokio::test]
    async fn test_price_history_grouped() {
        let (explorer, _) =
            build_explorer(recent_store().await, StubTransport::new(), None, ExplorerSettings::default()).await;

        let grouped = explorer
            .get_token_price_history_grouped(TOKEN, 7, Granularity::Daily)
            .await
            .unwrap();
        assert_eq!(grouped.count_txs.len(), 2);
        assert!(grouped.prices.is_none(), "No price service configured");
        assert_eq!(grouped.current, 0.0);
    }

    #[tokio::test]
    async fn test_period_volume() {
        let t = now();
        let history = json!([
            { "date": date_of(t - 2 * DAY), "ts": t - 2 * DAY, "open": 3.0, "high": 3.0, "low": 3.0, "close": 3.0 },
            { "date": date_of(t - DAY), "ts": t - DAY, "open": 5.0, "high": 5.0, "low": 5.0, "close": 5.0 },
            { "date": date_of(t), "ts": t, "open": 7.0, "high": 7.0, "low": 7.0, "close": 7.0 }
        ]);
        let settings = ExplorerSettings {
            update_rates: HashSet::from([TOKEN.to_string()]),
            ..ExplorerSettings::default()
        };
        let store = recent_store().await;
        store
            .insert(Collection::Operations, &[transfer_at(TOKEN, t), transfer_at(TOKEN, t)])
            .await
            .unwrap();
        let currency = StubTransport::new().with("getCurrencyHistory", history);
        let (explorer, _) = build_explorer(store, StubTransport::new(), Some(currency), settings).await;

        let token = explorer.get_token(TOKEN).await.unwrap().unwrap();
        let volume = explorer.prices().period_volume(&token, 7).await.unwrap();
        // Two tokens two days ago averaging (3 + 5 + 7) / 3 plus one yesterday
        // averaging (5 + 7) / 2; today's transfers are not counted
        assert_eq!(volume, 2.0 * 5.0 + 6.0);
    }
}
