use serde_json::Value;

use super::{is_chainy_address, ExplorerResult};
use crate::db::{decode_all, decode_one, Collection, DataSource, Filter, FindOptions, SortKey};
use crate::models::{Contract, ContractView, Transaction, TransactionView};

/// Contract record with its transaction count (incoming txs plus creation)
pub async fn get_contract(db: &dyn DataSource, address: &str) -> ExplorerResult<Option<ContractView>> {
    let doc = db.find_one(Collection::Contracts, &Filter::eq("address", address)).await?;
    let Some(mut contract) = decode_one::<Contract>(doc)? else {
        return Ok(None);
    };
    contract.metadata.remove("txsCount");
    contract.metadata.remove("isChainy");

    let incoming = db.count(Collection::Transactions, &Filter::eq("to", address)).await?;
    Ok(Some(ContractView {
        contract,
        txs_count: incoming + 1,
        is_chainy: is_chainy_address(address),
    }))
}

/// Incoming and outgoing transactions, plus one for a contract's creation
pub async fn count_transactions(db: &dyn DataSource, address: &str) -> ExplorerResult<u64> {
    let mut count = db
        .count(Collection::Transactions, &Filter::any_eq(&["from", "to"], address))
        .await?;
    if get_contract(db, address).await?.is_some() {
        count += 1;
    }
    Ok(count)
}

/// Latest transactions of an address, zero-value ones only when asked for
pub async fn get_transactions(
    db: &dyn DataSource,
    address: &str,
    limit: u64,
    show_zero: bool,
) -> ExplorerResult<Vec<Transaction>> {
    let mut filter = Filter::any_eq(&["from", "to"], address);
    if !show_zero {
        filter = filter.and(Filter::gt("value", 0));
    }
    let options = FindOptions::sorted(vec![SortKey::desc("timestamp")]).limit(limit);
    let docs = db.find(Collection::Transactions, &filter, &options).await?;
    Ok(decode_all(docs)?)
}

/// Transaction by hash with gas and success derived from its receipt
pub async fn get_transaction(db: &dyn DataSource, hash: &str) -> ExplorerResult<Option<TransactionView>> {
    let doc = db.find_one(Collection::Transactions, &Filter::eq("hash", hash)).await?;
    let Some(tx) = decode_one::<Transaction>(doc)? else {
        return Ok(None);
    };

    let gas_limit = tx.gas;
    let gas_used = tx.receipt.as_ref().map(|r| r.gas_used).unwrap_or(0);
    let has_logs = tx.receipt.as_ref().is_some_and(|r| !r.logs.is_empty());

    Ok(Some(TransactionView {
        tx,
        gas_limit,
        gas_used,
        success: gas_used < gas_limit || has_logs,
        confirmations: None,
    }))
}

/// Highest block number in the store
pub async fn find_last_block(db: &dyn DataSource) -> ExplorerResult<Option<u64>> {
    let options = FindOptions::sorted(vec![SortKey::desc("number")])
        .limit(1)
        .project(vec!["number"]);
    let docs = db.find(Collection::Blocks, &Filter::All, &options).await?;
    Ok(docs.first().and_then(|doc| doc.get("number")).and_then(Value::as_u64))
}
