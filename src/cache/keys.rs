//! Cache key generation and management

use std::fmt;

/// A structured cache key that can be converted to a string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Full token list with balance aggregates
    Tokens,
    /// Enriched view of a single token
    Token(String),
    /// Assembled transaction details
    Transaction(String),
    /// Current price quotes keyed by token address
    Rates,
    /// Raw price history of a token
    RatesHistory(String),
    /// Top tokens by operation count
    TopTokens { limit: usize, period: u32 },
    /// Top tokens by traded volume over a period
    TopTokensByPeriodVolume { limit: usize, period: u32 },
    /// Top tokens by current market capitalisation
    TopTokensByCurrentVolume { limit: usize },
    /// Operations per day, optionally for one contract
    TokenHistoryGrouped { address: Option<String>, period: u32 },
    /// Rendered CSV export of an address
    AddressOperationsCsv { address: String, limit: usize },
    /// Last known block number, pinned for the process lifetime
    LastBlock,
}

impl CacheKey {
    pub fn token(address: &str) -> Self {
        Self::Token(address.to_string())
    }

    pub fn transaction(hash: &str) -> Self {
        Self::Transaction(hash.to_string())
    }

    pub fn rates_history(address: &str) -> Self {
        Self::RatesHistory(address.to_string())
    }

    pub fn token_history_grouped(address: Option<&str>, period: u32) -> Self {
        Self::TokenHistoryGrouped {
            address: address.map(str::to_string),
            period,
        }
    }

    pub fn address_operations_csv(address: &str, limit: usize) -> Self {
        Self::AddressOperationsCsv {
            address: address.to_string(),
            limit,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokens => write!(f, "tokens"),
            Self::Token(address) => write!(f, "token:{}", address),
            Self::Transaction(hash) => write!(f, "tx:{}", hash),
            Self::Rates => write!(f, "rates"),
            Self::RatesHistory(address) => write!(f, "rates-history:{}", address),
            Self::TopTokens { limit, period } => write!(f, "top-tokens:{}:{}", period, limit),
            Self::TopTokensByPeriodVolume { limit, period } => {
                write!(f, "top-tokens-period-volume:{}:{}", limit, period)
            }
            Self::TopTokensByCurrentVolume { limit } => {
                write!(f, "top-tokens-current-volume:{}", limit)
            }
            Self::TokenHistoryGrouped { address, period } => match address {
                Some(address) => write!(f, "token-history-grouped:{}:{}", address, period),
                None => write!(f, "token-history-grouped:*:{}", period),
            },
            Self::AddressOperationsCsv { address, limit } => {
                write!(f, "address-operations-csv:{}:{}", address, limit)
            }
            Self::LastBlock => write!(f, "last-block"),
        }
    }
}
