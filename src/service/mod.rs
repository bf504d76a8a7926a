//! Query layer of the explorer: resolves addresses, tokens, transactions and
//! prices from the document store, the node and the price service, caching
//! computed results.

pub mod address;
pub mod api_keys;
pub mod contracts;
pub mod export;
pub mod notes;
pub mod operations;
pub mod prices;
pub mod ranking;
pub mod tokens;
pub mod transaction;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::cache::CacheStore;
use crate::config::{ClientTokenOverride, Config, Note};
use crate::db::{DataSource, DbError};
use crate::models::{
    ActiveNote, AddressDetails, Balance, ContractView, DailyCount, Operation, OperationKind, OperationView, PriceHistoryGrouped,
    SearchResult, TokenList, TokenPrice, TokenView, TopToken, Transaction, TransactionDetails, TransactionView,
    VolumeToken,
};
use crate::query::{QueryContext, TextFilter};
use crate::rpc::{CurrencyClient, NodeClient};

pub use address::{AddressResolver, DEFAULT_PAGE_SIZE};
pub use api_keys::ApiKeys;
pub use export::CsvExporter;
pub use operations::LastTransfersQuery;
pub use prices::{Granularity, PriceHistoryEngine};
pub use ranking::Ranking;
pub use tokens::TokenCatalog;
pub use transaction::TransactionService;

/// The Chainy publication contract
pub const ADDRESS_CHAINY: &str = "0xf3763c30dd6986b53402d41a8552b8f7f6a6089b";

pub fn is_chainy_address(address: &str) -> bool {
    address == ADDRESS_CHAINY
}

#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export failed: {0}")]
    Export(String),
}

pub type ExplorerResult<T> = Result<T, ExplorerError>;

/// Settings the services read from the configuration
#[derive(Debug, Clone, Default)]
pub struct ExplorerSettings {
    pub update_rates: HashSet<String>,
    pub client_tokens: HashMap<String, ClientTokenOverride>,
    pub page_size: Option<u64>,
    pub api_keys: HashMap<String, Value>,
    pub notes: Vec<Note>,
}

impl From<&Config> for ExplorerSettings {
    fn from(config: &Config) -> Self {
        Self {
            update_rates: config.update_rates.clone(),
            client_tokens: config.client_tokens.clone(),
            page_size: config.page_size,
            api_keys: config.api_keys.clone(),
            notes: config.notes.clone(),
        }
    }
}

/// Entry point of the query layer, wiring the services over shared
/// store, cache and RPC clients
#[derive(Clone)]
pub struct Explorer {
    db: Arc<dyn DataSource>,
    tokens: TokenCatalog,
    prices: PriceHistoryEngine,
    addresses: AddressResolver,
    transactions: TransactionService,
    ranking: Ranking,
    exporter: CsvExporter,
    api_keys: ApiKeys,
    notes: Arc<Vec<Note>>,
}

impl Explorer {
    /// Wire the services and pin the last block number
    pub async fn new(
        db: Arc<dyn DataSource>,
        cache: CacheStore,
        node: NodeClient,
        currency: Option<CurrencyClient>,
        settings: ExplorerSettings,
    ) -> ExplorerResult<Self> {
        let prices = PriceHistoryEngine::new(db.clone(), cache.clone(), currency, Arc::new(settings.update_rates));
        let tokens = TokenCatalog::new(
            db.clone(),
            cache.clone(),
            prices.clone(),
            Arc::new(settings.client_tokens),
        );
        let addresses = AddressResolver::new(db.clone(), node, tokens.clone(), settings.page_size);
        let transactions = TransactionService::new(db.clone(), cache.clone(), tokens.clone());
        let ranking = Ranking::new(db.clone(), cache.clone(), tokens.clone(), prices.clone());
        let exporter = CsvExporter::new(db.clone(), cache, tokens.clone());
        let api_keys = ApiKeys::new(settings.api_keys);
        let notes = Arc::new(settings.notes);

        let explorer = Self {
            db,
            tokens,
            prices,
            addresses,
            transactions,
            ranking,
            exporter,
            api_keys,
            notes,
        };
        explorer.transactions.refresh_last_block().await?;
        info!("Explorer ready");

        Ok(explorer)
    }

    pub fn tokens(&self) -> &TokenCatalog {
        &self.tokens
    }

    pub fn prices(&self) -> &PriceHistoryEngine {
        &self.prices
    }

    pub async fn get_address_details(
        &self,
        address: &str,
        ctx: &QueryContext,
        limit: u64,
    ) -> ExplorerResult<AddressDetails> {
        self.addresses.get_address_details(address, ctx, limit).await
    }

    pub async fn get_transaction_details(&self, hash: &str) -> ExplorerResult<Option<TransactionDetails>> {
        self.transactions.get_transaction_details(hash).await
    }

    pub async fn get_transaction(&self, hash: &str) -> ExplorerResult<Option<TransactionView>> {
        contracts::get_transaction(self.db.as_ref(), hash).await
    }

    pub async fn get_operations(
        &self,
        hash: &str,
        kinds: Option<&[OperationKind]>,
    ) -> ExplorerResult<Vec<Operation>> {
        operations::get_operations(self.db.as_ref(), hash, kinds).await
    }

    pub async fn get_contract(&self, address: &str) -> ExplorerResult<Option<ContractView>> {
        contracts::get_contract(self.db.as_ref(), address).await
    }

    pub async fn count_transactions(&self, address: &str) -> ExplorerResult<u64> {
        contracts::count_transactions(self.db.as_ref(), address).await
    }

    pub async fn get_transactions(&self, address: &str, limit: u64, show_zero: bool) -> ExplorerResult<Vec<Transaction>> {
        contracts::get_transactions(self.db.as_ref(), address, limit, show_zero).await
    }

    /// Operations of a token contract, or operations an address took part in
    pub async fn count_operations(
        &self,
        address: &str,
        is_token: bool,
        text: Option<&TextFilter>,
    ) -> ExplorerResult<u64> {
        operations::count_operations(self.db.as_ref(), address, is_token, text).await
    }

    pub async fn get_address_balances(&self, address: &str, with_zero: bool) -> ExplorerResult<Vec<Balance>> {
        operations::get_address_balances(self.db.as_ref(), address, with_zero).await
    }

    pub async fn get_last_transfers(&self, query: &LastTransfersQuery) -> ExplorerResult<Vec<OperationView>> {
        self.tokens.get_last_transfers(query).await
    }

    pub async fn get_last_block(&self) -> ExplorerResult<Option<u64>> {
        self.transactions.get_last_block().await
    }

    pub async fn get_tokens(&self, force_refresh: bool) -> ExplorerResult<TokenList> {
        self.tokens.get_tokens(force_refresh).await
    }

    pub async fn get_token(&self, address: &str) -> ExplorerResult<Option<TokenView>> {
        self.tokens.get_token(address).await
    }

    pub async fn get_eth_price(&self) -> Option<TokenPrice> {
        self.prices.get_eth_price().await
    }

    pub async fn get_top_tokens(&self, limit: usize, period: u32) -> ExplorerResult<Vec<TopToken>> {
        self.ranking.get_top_tokens(limit, period).await
    }

    pub async fn get_top_tokens_by_current_volume(&self, limit: usize) -> ExplorerResult<Vec<VolumeToken>> {
        self.ranking.get_top_tokens_by_current_volume(limit).await
    }

    pub async fn get_top_tokens_by_period_volume(&self, limit: usize, period: u32) -> ExplorerResult<Vec<VolumeToken>> {
        self.ranking.get_top_tokens_by_period_volume(limit, period).await
    }

    pub async fn get_token_history_grouped(&self, period: u32, address: Option<&str>) -> ExplorerResult<Vec<DailyCount>> {
        self.prices.token_history_grouped(period, address).await
    }

    pub async fn get_token_price_history_grouped(
        &self,
        address: &str,
        period: u32,
        granularity: Granularity,
    ) -> ExplorerResult<PriceHistoryGrouped> {
        self.prices
            .get_token_price_history_grouped(address, period, granularity)
            .await
    }

    pub async fn search_token(&self, query: &str) -> ExplorerResult<SearchResult> {
        self.ranking.search_token(query).await
    }

    pub async fn get_address_operations_csv(&self, address: &str) -> ExplorerResult<String> {
        self.exporter.get_address_operations_csv(address).await
    }

    pub fn check_api_key(&self, key: &str) -> bool {
        self.api_keys.check(key)
    }

    pub fn get_api_key_defaults(&self, key: &str, option: Option<&str>) -> Option<Value> {
        self.api_keys.defaults(key, option)
    }

    pub fn get_active_notes(&self) -> Vec<ActiveNote> {
        notes::active_notes_at(&self.notes, Utc::now().timestamp())
    }
}
