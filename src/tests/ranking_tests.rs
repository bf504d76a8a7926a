//! tests/ranking_tests.rs - token search and top-token rankings

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::collections::HashSet;

    use crate::{
        db::Collection,
        models::VolumeToken,
        service::{ranking::rank_by_volume, ExplorerSettings, ADDRESS_CHAINY},
        tests::fixtures::{
            build_explorer, explorer, seeded_store, StubTransport, HASH_B, TOKEN, TOKEN_NO_DECIMALS, TOKEN_SMALL,
            UNKNOWN, WALLET,
        },
    };

    #[tokio::test]
    async fn test_search_by_name() {
        let explorer = explorer().await;

        let result = explorer.search_token("alp").await.unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.results[0].address, TOKEN);
        assert_eq!(result.results[0].symbol, "ALP");
        assert_eq!(result.search, "alp");

        let upper = explorer.search_token("ALPHA").await.unwrap();
        assert_eq!(upper.total, 1, "Search is case-insensitive");
        assert_eq!(upper.search, "ALPHA", "The query is echoed as given");

        let chainy = explorer.search_token("chainy").await.unwrap();
        assert_eq!(chainy.results[0].address, ADDRESS_CHAINY);

        assert_eq!(explorer.search_token("zzz").await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_search_orders_by_activity() {
        let explorer = explorer().await;
        let result = explorer.search_token("0x").await.unwrap();

        assert_eq!(result.total, 4, "Every address matches");
        let order: Vec<&str> = result.results.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(order, vec![ADDRESS_CHAINY, TOKEN, TOKEN_NO_DECIMALS, TOKEN_SMALL]);
    }

    #[tokio::test]
    async fn test_rank_by_volume_is_stable() {
        let explorer = explorer().await;
        let tokens = explorer.get_tokens(false).await.unwrap();
        let ranked: Vec<VolumeToken> = tokens
            .iter()
            .zip([1.0, 1.0, 2.0])
            .map(|(token, volume)| VolumeToken {
                token: token.clone(),
                volume,
            })
            .collect();

        let top = rank_by_volume(ranked, 2);
        let order: Vec<&str> = top.iter().map(|t| t.token.record.address.as_str()).collect();
        assert_eq!(order, vec![TOKEN_SMALL, TOKEN], "Ties keep catalog order");
    }

    #[tokio::test]
    async fn test_top_tokens_skip_unknown_contracts() {
        let store = seeded_store().await;
        let orphan = |hash: &str| {
            json!({
                "type": "transfer", "contract": UNKNOWN, "from": WALLET, "to": UNKNOWN,
                "value": "1", "transactionHash": hash, "timestamp": 1_600_000_100
            })
        };
        store
            .insert(Collection::Operations, &[orphan(HASH_B), orphan(HASH_B)])
            .await
            .unwrap();
        let (explorer, _) = build_explorer(store, StubTransport::new(), None, ExplorerSettings::default()).await;

        let top = explorer.get_top_tokens(10, 3650).await.unwrap();
        let counts: Vec<(&str, u64)> = top.iter().map(|t| (t.token.address.as_str(), t.op_count)).collect();
        assert_eq!(counts, vec![(TOKEN, 4), (TOKEN_NO_DECIMALS, 1)]);

        assert!(explorer.get_top_tokens(10, 1).await.unwrap().is_empty(), "No recent operations");
    }

    fn priced_settings() -> ExplorerSettings {
        ExplorerSettings {
            update_rates: HashSet::from([TOKEN.to_string(), TOKEN_NO_DECIMALS.to_string()]),
            ..ExplorerSettings::default()
        }
    }

    #[tokio::test]
    async fn test_top_tokens_by_current_volume() {
        let currency = StubTransport::new().with("getCurrencyCurrent", json!({ "rate": 2.0 }));
        let (explorer, _) =
            build_explorer(seeded_store().await, StubTransport::new(), Some(currency), priced_settings()).await;

        let top = explorer.get_top_tokens_by_current_volume(10).await.unwrap();
        let volumes: Vec<(&str, f64)> = top
            .iter()
            .map(|t| (t.token.record.address.as_str(), t.volume))
            .collect();
        assert_eq!(
            volumes,
            vec![(TOKEN, 2000.0), (TOKEN_NO_DECIMALS, 4.0)],
            "Unpriced tokens are left out; supply scaled by inferred decimals"
        );

        let limited = explorer.get_top_tokens_by_current_volume(1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_top_tokens_by_period_volume_requires_price() {
        let currency = StubTransport::new().with("getCurrencyCurrent", json!({ "rate": 2.0 }));
        let (explorer, _) =
            build_explorer(seeded_store().await, StubTransport::new(), Some(currency), priced_settings()).await;

        let top = explorer.get_top_tokens_by_period_volume(10, 30).await.unwrap();
        let addresses: Vec<&str> = top.iter().map(|t| t.token.record.address.as_str()).collect();
        assert_eq!(addresses, vec![TOKEN, TOKEN_NO_DECIMALS]);
        assert!(top.iter().all(|t| t.volume == 0.0), "No operations in the period");
    }
}
