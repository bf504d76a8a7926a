// Operation and balance lookups shared by the address, token and export views

use serde_json::Value;

use super::ExplorerResult;
use crate::db::{decode_all, Accumulator, Collection, DataSource, Filter, FindOptions, GroupBy, Pipeline, SortKey};
use crate::models::{Balance, Operation, OperationKind};
use crate::query::{FilteredQuery, TextFilter};
use crate::validation::is_valid_address;

const PARTY_FIELDS: &[&str] = &["from", "to", "address"];

fn kinds_filter(kinds: &[OperationKind]) -> Filter {
    match kinds {
        [kind] => Filter::eq("type", kind.as_str()),
        kinds => Filter::is_in("type", kinds.iter().map(OperationKind::as_str)),
    }
}

/// Newest first; operations of one transaction in execution order
pub fn operation_sort() -> Vec<SortKey> {
    vec![SortKey::desc("timestamp"), SortKey::asc("priority")]
}

/// Operations of a token contract
pub fn contract_operations_query(contract: &str, kinds: &[OperationKind]) -> FilteredQuery {
    let base = Filter::eq("contract", contract).and(kinds_filter(kinds));
    FilteredQuery::new(Collection::Operations, base).sort_by(operation_sort())
}

/// Operations an address took part in
pub fn address_operations_query(address: &str, kinds: &[OperationKind]) -> FilteredQuery {
    let base = Filter::any_eq(PARTY_FIELDS, address).and(kinds_filter(kinds));
    FilteredQuery::new(Collection::Operations, base).sort_by(operation_sort())
}

/// Positive balances of a token, largest first, filterable by holder address
pub fn holders_query(contract: &str) -> FilteredQuery {
    let base = Filter::eq("contract", contract).and(Filter::gt("balance", 0));
    FilteredQuery::new(Collection::Balances, base)
        .text_fields(&["address"])
        .sort_by(vec![SortKey::desc("balance")])
}

/// Operations of one transaction ordered by `priority`
pub async fn get_operations(
    db: &dyn DataSource,
    hash: &str,
    kinds: Option<&[OperationKind]>,
) -> ExplorerResult<Vec<Operation>> {
    let mut filter = Filter::eq("transactionHash", hash);
    if let Some(kinds) = kinds {
        filter = filter.and(kinds_filter(kinds));
    }
    let options = FindOptions::sorted(vec![SortKey::asc("priority")]);
    let docs = db.find(Collection::Operations, &filter, &options).await?;
    Ok(decode_all(docs)?)
}

pub async fn get_address_operations(
    db: &dyn DataSource,
    address: &str,
    limit: u64,
    offset: u64,
    kinds: &[OperationKind],
    text: Option<&TextFilter>,
) -> ExplorerResult<Vec<Operation>> {
    let docs = address_operations_query(address, kinds)
        .fetch(db, text, limit, offset)
        .await?;
    Ok(decode_all(docs)?)
}

/// Operation count of an address: by contract for tokens, by party otherwise
pub async fn count_operations(
    db: &dyn DataSource,
    address: &str,
    is_token: bool,
    text: Option<&TextFilter>,
) -> ExplorerResult<u64> {
    let query = if is_token {
        FilteredQuery::new(Collection::Operations, Filter::eq("contract", address))
    } else {
        address_operations_query(address, &OperationKind::ALL)
    };
    Ok(query.count(db, text).await?)
}

/// Token balances of an address that ever received anything
pub async fn get_address_balances(db: &dyn DataSource, address: &str, with_zero: bool) -> ExplorerResult<Vec<Balance>> {
    let mut filter = Filter::eq("address", address);
    if !with_zero {
        filter = filter.and(Filter::gt("balance", 0));
    }
    filter = filter.and(Filter::gt("totalIn", 0));

    let options = FindOptions::default().project(vec!["address", "contract", "balance", "totalIn", "totalOut"]);
    let docs = db.find(Collection::Balances, &filter, &options).await?;
    Ok(decode_all(docs)?)
}

/// Ether sent by an address over all its transactions
pub async fn ether_total_out(db: &dyn DataSource, address: &str) -> ExplorerResult<f64> {
    if !is_valid_address(address) {
        return Ok(0.0);
    }
    let pipeline = Pipeline::group(Filter::eq("from", address), GroupBy::Field("from"))
        .accumulate("out", Accumulator::Sum("value"));
    let rows = db.aggregate(Collection::Transactions, &pipeline).await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get("out").and_then(Value::as_f64))
        .sum())
}

/// Filter for the latest-operations feed
#[derive(Debug, Clone, PartialEq)]
pub struct LastTransfersQuery {
    pub address: Option<String>,
    /// Match `address` as a party instead of as the contract
    pub history: bool,
    /// Contract restriction used together with `history`
    pub token: Option<String>,
    /// Operation kinds to include; empty means all
    pub kinds: Vec<OperationKind>,
    pub timestamp_after: Option<i64>,
    pub limit: Option<u64>,
}

impl Default for LastTransfersQuery {
    fn default() -> Self {
        Self {
            address: None,
            history: false,
            token: None,
            kinds: vec![OperationKind::Transfer],
            timestamp_after: None,
            limit: None,
        }
    }
}

impl LastTransfersQuery {
    pub fn for_contract(address: &str) -> Self {
        Self {
            address: Some(address.to_string()),
            ..Self::default()
        }
    }

    pub fn filter(&self) -> Filter {
        let mut filter = Filter::All;
        if !self.kinds.is_empty() {
            filter = filter.and(kinds_filter(&self.kinds));
        }
        match (&self.address, self.history) {
            (Some(address), false) => filter = filter.and(Filter::eq("contract", address.as_str())),
            (Some(address), true) => filter = filter.and(Filter::any_eq(PARTY_FIELDS, address)),
            (None, _) => {}
        }
        if let (Some(token), true) = (&self.token, self.history) {
            filter = filter.and(Filter::eq("contract", token.as_str()));
        }
        if let Some(ts) = self.timestamp_after.filter(|ts| *ts > 0) {
            filter = filter.and(Filter::gt("timestamp", ts));
        }
        filter
    }
}

pub async fn find_last_transfers(db: &dyn DataSource, query: &LastTransfersQuery) -> ExplorerResult<Vec<Operation>> {
    let mut options = FindOptions::sorted(operation_sort());
    if let Some(limit) = query.limit {
        options = options.limit(limit);
    }
    let docs = db.find(Collection::Operations, &query.filter(), &options).await?;
    Ok(decode_all(docs)?)
}
