pub mod filter;
pub mod migration;
pub mod sqlite;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use filter::{Accumulator, Filter, GroupBy, Pipeline, SortKey, SortOrder};
pub use sqlite::SqliteStore;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Malformed document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Collections maintained by the indexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Transactions,
    Blocks,
    Contracts,
    Tokens,
    Operations,
    Balances,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Self::Transactions,
        Self::Blocks,
        Self::Contracts,
        Self::Tokens,
        Self::Operations,
        Self::Balances,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Blocks => "blocks",
            Self::Contracts => "contracts",
            Self::Tokens => "tokens",
            Self::Operations => "operations",
            Self::Balances => "balances",
        }
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.table_name() == s)
            .ok_or_else(|| format!("unknown collection: {}", s))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
    /// Keep only these top-level fields
    pub projection: Option<Vec<&'static str>>,
}

impl FindOptions {
    pub fn sorted(sort: Vec<SortKey>) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn project(mut self, fields: Vec<&'static str>) -> Self {
        self.projection = Some(fields);
        self
    }
}

/// Read access to the document store
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Documents matching `filter`, ordered by `options.sort` then insertion order
    async fn find(&self, collection: Collection, filter: &Filter, options: &FindOptions) -> Result<Vec<Value>, DbError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DbError>;

    async fn aggregate(&self, collection: Collection, pipeline: &Pipeline) -> Result<Vec<Value>, DbError>;

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Value>, DbError> {
        let options = FindOptions::default().limit(1);
        Ok(self.find(collection, filter, &options).await?.into_iter().next())
    }
}

/// Decode stored documents into typed records
pub fn decode_all<T: DeserializeOwned>(docs: Vec<Value>) -> Result<Vec<T>, DbError> {
    docs.into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(DbError::from))
        .collect()
}

pub fn decode_one<T: DeserializeOwned>(doc: Option<Value>) -> Result<Option<T>, DbError> {
    doc.map(serde_json::from_value).transpose().map_err(DbError::from)
}
