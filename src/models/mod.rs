// Documents as stored by the indexer, one struct per collection.
// Field names follow the stored camelCase keys.

pub mod views;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

pub use views::*;

/// Raw on-chain integer amount, stored either as a JSON number or a
/// decimal string. Kept as text so large values survive untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAmount(String);

impl RawAmount {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0.trim().parse().unwrap_or(0.0)
    }

    pub fn is_zero(&self) -> bool {
        self.as_f64() == 0.0
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RawAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RawAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            Value::Null => Ok(Self::default()),
            other => Err(serde::de::Error::custom(format!(
                "expected number or numeric string, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    #[serde(default)]
    pub gas_used: u64,
    #[serde(default)]
    pub logs: Vec<Log>,
}

/// Transaction document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    #[serde(default)]
    pub block_number: Option<u64>,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub gas: u64,
    #[serde(default)]
    pub gas_price: Option<f64>,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub creates: Option<String>,
    #[serde(default)]
    pub receipt: Option<Receipt>,
}

/// Contract document; everything beyond the address is indexer metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contract {
    pub address: String,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Token contract document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    /// Number or numeric string, absent on many legacy tokens
    #[serde(default)]
    pub decimals: Option<Value>,
    #[serde(default)]
    pub total_supply: Option<RawAmount>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub txs_count: Option<u64>,
    #[serde(default)]
    pub transfers_count: Option<u64>,
    #[serde(default)]
    pub issuances_count: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Transfer,
    Issuance,
    Burn,
    Mint,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [Self::Transfer, Self::Issuance, Self::Burn, Self::Mint];
    pub const ISSUANCES: [OperationKind; 3] = [Self::Issuance, Self::Burn, Self::Mint];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Issuance => "issuance",
            Self::Burn => "burn",
            Self::Mint => "mint",
        }
    }
}

/// Token-level event; one transaction may carry several
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub contract: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub value: RawAmount,
    #[serde(default)]
    pub int_value: Option<f64>,
    pub transaction_hash: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub block_number: Option<u64>,
}

/// Token balance of one address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    #[serde(default)]
    pub address: Option<String>,
    pub contract: String,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub total_in: f64,
    #[serde(default)]
    pub total_out: f64,
}

/// One OHLC record of the price history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub date: String,
    #[serde(default)]
    pub hour: Option<u32>,
    pub ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

/// Current quote of a token as returned by the price service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPrice {
    pub rate: f64,
    #[serde(default)]
    pub diff: Option<f64>,
    #[serde(default)]
    pub ts: Option<i64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}
