use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bigdecimal::num_bigint::{BigInt, BigUint, Sign};
use bigdecimal::{BigDecimal, RoundingMode};
use chrono::DateTime;
use csv::{Terminator, WriterBuilder};
use serde::Serialize;
use tracing::{debug, warn};

use super::contracts::get_contract;
use super::operations::{get_address_operations, LastTransfersQuery};
use super::tokens::TokenCatalog;
use super::{ExplorerError, ExplorerResult};
use crate::cache::{CacheKey, CacheStore, ReadPolicy};
use crate::db::DataSource;
use crate::models::{Operation, OperationKind, TokenView};

/// Operations exported per address
pub const CSV_LIMIT: usize = 1000;

const CSV_TTL: Duration = Duration::from_secs(600);
const VALUE_SCALE: i64 = 4;

/// One exported operation; field order is column order
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CsvRow {
    pub date: String,
    pub txhash: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "token-name")]
    pub token_name: String,
    #[serde(rename = "token-address")]
    pub token_address: String,
    pub value: String,
    pub symbol: String,
}

#[derive(Clone)]
pub struct CsvExporter {
    db: Arc<dyn DataSource>,
    cache: CacheStore,
    tokens: TokenCatalog,
}

impl CsvExporter {
    pub fn new(db: Arc<dyn DataSource>, cache: CacheStore, tokens: TokenCatalog) -> Self {
        Self { db, cache, tokens }
    }

    /// Semicolon-separated, CRLF-terminated table of an address's transfers
    pub async fn get_address_operations_csv(&self, address: &str) -> ExplorerResult<String> {
        let key = CacheKey::address_operations_csv(address, CSV_LIMIT);
        if let Some(csv) = self.cache.get_with::<String>(&key, ReadPolicy::ttl(CSV_TTL)).await {
            return Ok(csv);
        }

        let db = self.db.as_ref();
        let with_token_info = get_contract(db, address).await?.is_none();
        let token = self.tokens.get_token(address).await?;

        let operations: Vec<Operation> = match &token {
            Some(_) => {
                let query = LastTransfersQuery {
                    limit: Some(CSV_LIMIT as u64),
                    ..LastTransfersQuery::for_contract(address)
                };
                self.tokens
                    .get_last_transfers(&query)
                    .await?
                    .into_iter()
                    .map(|view| view.operation)
                    .collect()
            }
            None => {
                get_address_operations(db, address, CSV_LIMIT as u64, 0, &[OperationKind::Transfer], None).await?
            }
        };

        let mut known: HashMap<String, Option<TokenView>> = HashMap::new();
        let mut rows = Vec::with_capacity(operations.len());
        for operation in &operations {
            let row_token = if with_token_info {
                if !known.contains_key(&operation.contract) {
                    let found = self.tokens.get_token(&operation.contract).await?;
                    known.insert(operation.contract.clone(), found);
                }
                known.get(&operation.contract).and_then(Option::as_ref)
            } else {
                token.as_ref()
            };
            rows.push(csv_row(operation, row_token, with_token_info));
        }

        let csv = render_csv(&rows)?;
        debug!("Exported {} operations of {}", rows.len(), address);
        self.cache.save(key, &csv).await;
        Ok(csv)
    }
}

fn csv_row(operation: &Operation, token: Option<&TokenView>, with_token_address: bool) -> CsvRow {
    let date = DateTime::from_timestamp(operation.timestamp, 0)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();
    let raw = operation.value.as_str();

    CsvRow {
        date,
        txhash: operation.transaction_hash.clone(),
        from: operation.from.clone().unwrap_or_default(),
        to: operation.to.clone().unwrap_or_default(),
        token_name: token.and_then(|t| t.name.clone()).unwrap_or_default(),
        token_address: match token {
            Some(t) if with_token_address => t.address.clone(),
            _ => String::new(),
        },
        value: match token {
            Some(t) => format_token_value(raw, t.decimals),
            None => raw.to_string(),
        },
        symbol: token.map(|t| t.symbol.clone()).unwrap_or_default(),
    }
}

/// `raw / 10^decimals` rounded half-up to four places; unparsable input is
/// returned unchanged
pub fn format_token_value(raw: &str, decimals: u32) -> String {
    match BigDecimal::from_str(raw.trim()) {
        Ok(value) => {
            let (digits, scale) = value.as_bigint_and_exponent();
            let units = BigDecimal::new(digits, scale + i64::from(decimals) - VALUE_SCALE)
                .with_scale_round(0, RoundingMode::HalfUp);
            fixed_point(&units.as_bigint_and_exponent().0)
        }
        Err(e) => {
            warn!("Exporting unparsable value {:?}: {}", raw, e);
            raw.to_string()
        }
    }
}

/// Render an integer count of 10^-4 units with exactly four decimals
fn fixed_point(units: &BigInt) -> String {
    let one = BigUint::from(10u32.pow(VALUE_SCALE as u32));
    let magnitude = units.magnitude();
    let sign = if units.sign() == Sign::Minus { "-" } else { "" };
    format!("{}{}.{:0>4}", sign, magnitude / &one, (magnitude % &one).to_string())
}

pub fn render_csv(rows: &[CsvRow]) -> ExplorerResult<String> {
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());

    if rows.is_empty() {
        writer.write_record(["date", "txhash", "from", "to", "token-name", "token-address", "value", "symbol"])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExplorerError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExplorerError::Export(e.to_string()))
}
