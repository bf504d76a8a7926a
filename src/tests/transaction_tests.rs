//! tests/transaction_tests.rs - transaction details and derived fields

#[cfg(test)]
mod tests {
    use crate::{
        models::OperationKind,
        query::TextFilter,
        service::ADDRESS_CHAINY,
        tests::fixtures::{explorer, HASH_A, HASH_B, HASH_C, HASH_D, HASH_F, TOKEN, WALLET},
    };

    #[tokio::test]
    async fn test_last_block() {
        let explorer = explorer().await;
        assert_eq!(explorer.get_last_block().await.unwrap(), Some(105));
    }

    #[tokio::test]
    async fn test_transaction_success() {
        let explorer = explorer().await;

        let transfer = explorer.get_transaction(HASH_A).await.unwrap().unwrap();
        assert_eq!(transfer.gas_limit, 100000);
        assert_eq!(transfer.gas_used, 100000);
        assert!(transfer.success, "All gas used but logs were emitted");

        let plain = explorer.get_transaction(HASH_B).await.unwrap().unwrap();
        assert!(!plain.success, "All gas used and no logs");

        let chainy = explorer.get_transaction(HASH_C).await.unwrap().unwrap();
        assert!(chainy.success);

        assert!(explorer.get_transaction(HASH_D).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transaction_details() {
        let explorer = explorer().await;
        let details = explorer.get_transaction_details(HASH_A).await.unwrap().unwrap();

        assert_eq!(details.contracts, vec![TOKEN.to_string()]);
        assert_eq!(details.tx.confirmations, Some(6));
        assert_eq!(details.tx.tx.from, WALLET);
        assert_eq!(details.token.as_ref().map(|t| t.address.as_str()), Some(TOKEN));

        let kinds: Vec<OperationKind> = details.operations.iter().map(|op| op.operation.kind).collect();
        assert_eq!(kinds, vec![OperationKind::Transfer, OperationKind::Issuance], "Priority order");
        assert!(details.operations.iter().all(|op| op.success && op.token.is_some()));

        let cached = explorer.get_transaction_details(HASH_A).await.unwrap().unwrap();
        assert_eq!(cached, details);
    }

    #[tokio::test]
    async fn test_plain_transfer_details() {
        let explorer = explorer().await;
        let details = explorer.get_transaction_details(HASH_B).await.unwrap().unwrap();

        assert!(details.contracts.is_empty());
        assert!(details.token.is_none());
        assert!(details.operations.is_empty());
        assert_eq!(details.tx.confirmations, Some(5));
    }

    #[tokio::test]
    async fn test_contract_without_token() {
        let explorer = explorer().await;
        let details = explorer.get_transaction_details(HASH_C).await.unwrap().unwrap();

        assert_eq!(details.contracts, vec![ADDRESS_CHAINY.to_string()]);
        assert!(details.token.is_none());
    }

    #[tokio::test]
    async fn test_unknown_transaction() {
        let explorer = explorer().await;
        assert!(explorer.get_transaction_details(HASH_D).await.unwrap().is_none());
        assert!(
            explorer.get_transaction_details(HASH_F).await.unwrap().is_none(),
            "Operations alone do not make a transaction"
        );
    }

    #[tokio::test]
    async fn test_operations_filtered_by_kind() {
        let explorer = explorer().await;

        let all = explorer.get_operations(HASH_A, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let issuances = explorer
            .get_operations(HASH_A, Some(&[OperationKind::Issuance][..]))
            .await
            .unwrap();
        assert_eq!(issuances.len(), 1);
        assert_eq!(issuances[0].priority, 1);
    }

    #[tokio::test]
    async fn test_address_transactions() {
        let explorer = explorer().await;

        assert_eq!(explorer.count_transactions(WALLET).await.unwrap(), 2);
        assert_eq!(
            explorer.count_transactions(TOKEN).await.unwrap(),
            2,
            "One incoming transaction plus the contract creation"
        );

        let valued = explorer.get_transactions(WALLET, 10, false).await.unwrap();
        let hashes: Vec<&str> = valued.iter().map(|tx| tx.hash.as_str()).collect();
        assert_eq!(hashes, vec![HASH_B], "Zero-value transactions are hidden");

        let all = explorer.get_transactions(WALLET, 10, true).await.unwrap();
        let hashes: Vec<&str> = all.iter().map(|tx| tx.hash.as_str()).collect();
        assert_eq!(hashes, vec![HASH_B, HASH_A], "Newest first");

        assert_eq!(explorer.get_transactions(WALLET, 1, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_count_operations() {
        let explorer = explorer().await;

        assert_eq!(explorer.count_operations(TOKEN, true, None).await.unwrap(), 4);
        assert_eq!(explorer.count_operations(WALLET, false, None).await.unwrap(), 5);

        let filter = TextFilter::new(&HASH_D[..12]);
        assert_eq!(
            explorer.count_operations(WALLET, false, filter.as_ref()).await.unwrap(),
            1,
            "Text filter matches the transaction hash"
        );
    }

    #[tokio::test]
    async fn test_eth_price_without_price_service() {
        let explorer = explorer().await;
        assert!(explorer.get_eth_price().await.is_none());
    }
}
