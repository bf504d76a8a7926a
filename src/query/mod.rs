//! Filtered, sorted, paginated queries over a collection.

pub mod context;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::db::{Collection, DataSource, DbError, Filter, FindOptions, SortKey};

pub use context::{QueryContext, Section, TextFilter};

/// Fields an operation text filter is matched against
pub const OPERATION_TEXT_FIELDS: &[&str] = &["from", "to", "address", "transactionHash"];

/// Pagination figures reported with each paginated section
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pager {
    pub page: u64,
    /// Records matching the active filter
    pub records: u64,
    /// Records available without the filter
    pub total: u64,
}

/// One resolved page of a section
#[derive(Debug, Clone, PartialEq)]
pub struct PageSlice {
    pub items: Vec<Value>,
    pub pager: Pager,
}

/// Resets to the first page when the offset lies past the filtered count.
pub fn clamp_page(page: u64, offset: u64, count: u64) -> (u64, u64) {
    if offset > 0 && offset > count {
        (1, 0)
    } else {
        (page, offset)
    }
}

#[derive(Debug, Clone)]
pub struct FilteredQuery {
    collection: Collection,
    base: Filter,
    text_fields: &'static [&'static str],
    sort: Vec<SortKey>,
}

impl FilteredQuery {
    /// Query over `collection`, newest first, text-filterable on operation fields
    pub fn new(collection: Collection, base: Filter) -> Self {
        Self {
            collection,
            base,
            text_fields: OPERATION_TEXT_FIELDS,
            sort: vec![SortKey::desc("timestamp")],
        }
    }

    pub fn text_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.text_fields = fields;
        self
    }

    pub fn sort_by(mut self, sort: Vec<SortKey>) -> Self {
        self.sort = sort;
        self
    }

    /// Base filter, ANDed with the text clause when a text filter is set
    pub fn filter(&self, text: Option<&TextFilter>) -> Filter {
        match text {
            Some(text) => self
                .base
                .clone()
                .and(Filter::any_regex(self.text_fields, text.pattern())),
            None => self.base.clone(),
        }
    }

    /// Records matching the base filter and the text filter
    pub async fn count(&self, source: &dyn DataSource, text: Option<&TextFilter>) -> Result<u64, DbError> {
        source.count(self.collection, &self.filter(text)).await
    }

    /// Records matching the base filter alone
    pub async fn count_total(&self, source: &dyn DataSource) -> Result<u64, DbError> {
        source.count(self.collection, &self.base).await
    }

    pub async fn fetch(
        &self,
        source: &dyn DataSource,
        text: Option<&TextFilter>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Value>, DbError> {
        let mut options = FindOptions::sorted(self.sort.clone()).skip(offset);
        if limit > 0 {
            options = options.limit(limit);
        }
        source.find(self.collection, &self.filter(text), &options).await
    }

    /// A page of items together with the filtered match count
    pub async fn run(
        &self,
        source: &dyn DataSource,
        text: Option<&TextFilter>,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Value>, u64), DbError> {
        let items = self.fetch(source, text, limit, offset).await?;
        let count = self.count(source, text).await?;
        Ok((items, count))
    }

    /// Resolve one section of a paginated view.
    ///
    /// The filtered count is taken once, before the clamp, and is both the
    /// clamp bound and the reported `records`.
    pub async fn paginate(
        &self,
        source: &dyn DataSource,
        ctx: &QueryContext,
        section: Section,
        limit: u64,
    ) -> Result<PageSlice, DbError> {
        let text = ctx.filter();
        let count = self.count(source, text).await?;
        let total = if text.is_some() { self.count_total(source).await? } else { count };

        let (page, offset) = clamp_page(ctx.page(section), ctx.offset(section, limit), count);
        debug!(
            "Paginating {} of {:?}: page {}, offset {}, {} of {} records",
            section, self.collection, page, offset, count, total
        );

        let items = self.fetch(source, text, limit, offset).await?;
        Ok(PageSlice {
            items,
            pager: Pager { page, records: count, total },
        })
    }
}
