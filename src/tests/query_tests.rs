//! tests/query_tests.rs - text filters, paging context and the pagination clamp

#[cfg(test)]
mod tests {
    use crate::{
        db::{Collection, DataSource, Filter, SqliteStore},
        models::OperationKind,
        query::{clamp_page, FilteredQuery, QueryContext, Section, TextFilter},
        service::operations::contract_operations_query,
        tests::fixtures::{seeded_store, HASH_D, OTHER, TOKEN, WALLET},
    };

    async fn setup() -> SqliteStore {
        seeded_store().await
    }

    fn transfers() -> FilteredQuery {
        contract_operations_query(TOKEN, &[OperationKind::Transfer])
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(21, 100, 5), (1, 0), "Offset past the filtered count resets to page 1");
        assert_eq!(clamp_page(2, 50, 60), (2, 50));
        assert_eq!(clamp_page(1, 0, 0), (1, 0));
        assert_eq!(clamp_page(2, 5, 5), (2, 5), "Offset equal to the count is kept");
    }

    #[test]
    fn test_text_filter() {
        assert_eq!(TextFilter::new("   "), None, "Blank filter means no filter");
        assert_eq!(TextFilter::new(" 0xaa ").unwrap().pattern(), "0xaa");
        assert_eq!(
            TextFilter::new("(abc").unwrap().pattern(),
            r"\(abc",
            "Invalid regex should be escaped"
        );
    }

    #[test]
    fn test_query_context() {
        let ctx = QueryContext::new()
            .with_page_size(20)
            .with_page(Section::Holders, 3)
            .with_refresh(Section::Holders)
            .with_filter("");

        assert_eq!(ctx.page_size(), Some(20));
        assert_eq!(ctx.page(Section::Holders), 3);
        assert_eq!(ctx.page(Section::Transfers), 1, "Unset sections start on page 1");
        assert_eq!(ctx.offset(Section::Holders, 20), 40);
        assert_eq!(ctx.offset(Section::Transfers, 20), 0);
        assert!(ctx.renders(Section::Holders));
        assert!(!ctx.renders(Section::Transfers));
        assert!(ctx.filter().is_none());

        assert!(QueryContext::new().renders(Section::Chainy), "Without refresh everything renders");
        assert_eq!(QueryContext::new().with_page_size(0).page_size(), None);
    }

    #[test]
    fn test_filter_composition() {
        let query = FilteredQuery::new(Collection::Operations, Filter::eq("contract", TOKEN));
        assert_eq!(query.filter(None), Filter::eq("contract", TOKEN));

        let text = TextFilter::new("abc");
        match query.filter(text.as_ref()) {
            Filter::And(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(&parts[1], Filter::Or(fields) if fields.len() == 4));
            }
            other => panic!("Expected a conjunction, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_returns_items_and_count() {
        let store = setup().await;

        let (items, count) = transfers().run(&store, None, 2, 0).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(count, 3);
        assert!(
            items[0]["timestamp"].as_i64() > items[1]["timestamp"].as_i64(),
            "Newest operations first"
        );
    }

    #[tokio::test]
    async fn test_paginate_clamps_offset_past_count() {
        let store = setup().await;
        let ctx = QueryContext::new().with_page(Section::Transfers, 10);

        let page = transfers().paginate(&store, &ctx, Section::Transfers, 2).await.unwrap();

        assert_eq!(page.pager.page, 1, "Page should reset when offset exceeds the count");
        assert_eq!(page.pager.records, 3);
        assert_eq!(page.pager.total, 3);
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn test_offset_saturates_for_huge_pages() {
        let ctx = QueryContext::new().with_page(Section::Transfers, u64::MAX);
        assert_eq!(ctx.offset(Section::Transfers, 50), u64::MAX);
    }

    #[tokio::test]
    async fn test_paginate_huge_page_resets_to_first() {
        let store = setup().await;
        let ctx = QueryContext::new().with_page(Section::Transfers, u64::MAX);

        let page = transfers().paginate(&store, &ctx, Section::Transfers, 50).await.unwrap();

        assert_eq!(page.pager.page, 1);
        assert_eq!(page.items.len(), 3);
    }

    #[tokio::test]
    async fn test_paginate_with_filter_reports_unfiltered_total() {
        let store = setup().await;
        let ctx = QueryContext::new().with_filter(&HASH_D[..20]);

        let page = transfers().paginate(&store, &ctx, Section::Transfers, 10).await.unwrap();

        assert_eq!(page.pager.records, 1, "Only one transfer matches the hash prefix");
        assert_eq!(page.pager.total, 3, "Total ignores the filter");
        assert_eq!(page.items[0]["transactionHash"], HASH_D);
    }

    #[tokio::test]
    async fn test_filter_matches_any_text_field() {
        let store = setup().await;
        let text = TextFilter::new(OTHER);

        let count = transfers().count(&store, text.as_ref()).await.unwrap();
        assert_eq!(count, 3, "Every transfer involves OTHER as sender or receiver");

        let text = TextFilter::new(WALLET);
        let query = FilteredQuery::new(Collection::Balances, Filter::eq("contract", TOKEN)).text_fields(&["address"]);
        assert_eq!(query.count(&store, text.as_ref()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_regex_matches_literally() {
        let store = setup().await;
        let ctx = QueryContext::new().with_filter("(");

        let page = transfers().paginate(&store, &ctx, Section::Transfers, 10).await.unwrap();
        assert_eq!(page.pager.records, 0);
        assert!(page.items.is_empty());

        let all = store.count(Collection::Operations, &Filter::All).await.unwrap();
        assert_eq!(all, 5);
    }
}
