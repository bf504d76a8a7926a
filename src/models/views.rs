// Assembled results handed to the presentation layer

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Balance, Contract, Operation, PriceQuote, RawAmount, TokenPrice, Transaction};
use crate::query::Pager;

/// Contract with its derived counters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContractView {
    #[serde(flatten)]
    pub contract: Contract,
    pub txs_count: u64,
    #[serde(default)]
    pub is_chainy: bool,
}

/// Token list entry: stored token document plus balance aggregates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    #[serde(flatten)]
    pub record: super::TokenRecord,
    pub total_in: f64,
    pub total_out: f64,
    pub holders_count: u64,
}

/// Ordered token catalog, most transferred first
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenList(pub Vec<TokenSummary>);

impl TokenList {
    pub fn get(&self, address: &str) -> Option<&TokenSummary> {
        self.0.iter().find(|t| t.record.address == address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenSummary> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fully resolved token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenView {
    pub address: String,
    pub name: Option<String>,
    pub symbol: String,
    pub decimals: u32,
    #[serde(default)]
    pub estimated_decimals: bool,
    pub total_supply: Option<RawAmount>,
    pub owner: Option<String>,
    pub txs_count: Option<u64>,
    pub transfers_count: u64,
    pub issuances_count: u64,
    pub holders_count: u64,
    pub total_in: f64,
    pub total_out: f64,
    pub price: Option<TokenPrice>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenView {
    /// Divide a raw integer amount by `10^decimals`
    pub fn scale(&self, raw: f64) -> f64 {
        raw / 10f64.powi(self.decimals as i32)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holder {
    pub address: String,
    pub balance: f64,
    /// Percentage of supply, two decimals
    pub share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainyEntry {
    pub hash: String,
    pub timestamp: i64,
    pub input: String,
    pub link: String,
}

/// Ether balance figures of an address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EtherBalance {
    /// `None` when the node could not be reached
    pub balance: Option<f64>,
    pub balance_in: f64,
    pub balance_out: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenPagers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfers: Option<Pager>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuances: Option<Pager>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holders: Option<Pager>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenSections {
    /// Empty when the token has no contract record
    pub contract: Option<ContractView>,
    pub token: TokenView,
    pub page_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfers: Option<Vec<Operation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuances: Option<Vec<Operation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holders: Option<Vec<Holder>>,
    pub pager: TokenPagers,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainySections {
    pub contract: ContractView,
    pub chainy: Vec<ChainyEntry>,
    pub pager: Pager,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WalletSections {
    pub balances: Vec<Balance>,
    /// Metadata of every token the address holds, in balance order
    pub tokens: Vec<TokenView>,
    pub transfers: Vec<Operation>,
    pub pager: Pager,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractSections {
    pub contract: ContractView,
    #[serde(flatten)]
    pub wallet: WalletSections,
}

/// What an address turned out to be
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AddressView {
    Token(TokenSections),
    Chainy(ChainySections),
    Contract(ContractSections),
    Wallet(WalletSections),
}

impl AddressView {
    pub fn is_contract(&self) -> bool {
        !matches!(self, Self::Wallet(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddressDetails {
    pub address: String,
    pub is_contract: bool,
    /// Skipped while re-rendering a single section
    pub balance: Option<EtherBalance>,
    #[serde(flatten)]
    pub view: AddressView,
}

/// Transaction as presented, with derived gas and success fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    #[serde(flatten)]
    pub tx: Transaction,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub success: bool,
    #[serde(default)]
    pub confirmations: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationView {
    #[serde(flatten)]
    pub operation: Operation,
    pub success: bool,
    pub token: Option<TokenView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionDetails {
    pub tx: TransactionView,
    pub contracts: Vec<String>,
    pub token: Option<TokenView>,
    pub operations: Vec<OperationView>,
}

/// Record count of one UTC day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyCount {
    pub date: String,
    pub ts: i64,
    pub cnt: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryGrouped {
    pub count_txs: Vec<DailyCount>,
    pub prices: Option<Vec<PriceQuote>>,
    pub current: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopToken {
    #[serde(flatten)]
    pub token: TokenView,
    pub op_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeToken {
    #[serde(flatten)]
    pub token: TokenSummary,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub name: String,
    pub symbol: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub results: Vec<SearchHit>,
    pub total: usize,
    pub search: String,
}

/// A notice still within its display window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveNote {
    #[serde(flatten)]
    pub note: crate::config::Note,
    /// More than one notice is configured
    pub has_next: bool,
}
