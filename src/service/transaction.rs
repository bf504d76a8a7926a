use std::sync::Arc;

use tracing::{debug, info};

use super::contracts::{find_last_block, get_contract, get_transaction};
use super::operations::get_operations;
use super::tokens::TokenCatalog;
use super::ExplorerResult;
use crate::cache::{CacheKey, CacheStore};
use crate::db::DataSource;
use crate::models::{OperationView, TransactionDetails};

/// Transaction details with the contracts, token and operations involved
#[derive(Clone)]
pub struct TransactionService {
    db: Arc<dyn DataSource>,
    cache: CacheStore,
    tokens: TokenCatalog,
}

impl TransactionService {
    pub fn new(db: Arc<dyn DataSource>, cache: CacheStore, tokens: TokenCatalog) -> Self {
        Self { db, cache, tokens }
    }

    /// Last block number, read from the store once per process
    pub async fn get_last_block(&self) -> ExplorerResult<Option<u64>> {
        if let Some(block) = self.cache.get::<u64>(&CacheKey::LastBlock).await {
            return Ok(Some(block));
        }
        self.refresh_last_block().await
    }

    pub async fn refresh_last_block(&self) -> ExplorerResult<Option<u64>> {
        let block = find_last_block(self.db.as_ref()).await?;
        match block {
            Some(number) => {
                info!("Last block is {}", number);
                self.cache.store(CacheKey::LastBlock, &number).await;
            }
            None => debug!("No blocks in the store yet"),
        }
        Ok(block)
    }

    /// Assembled details, cached without confirmations; confirmations and
    /// the token are refreshed on every call
    pub async fn get_transaction_details(&self, hash: &str) -> ExplorerResult<Option<TransactionDetails>> {
        let key = CacheKey::transaction(hash);
        let mut details = match self.cache.get::<TransactionDetails>(&key).await {
            Some(details) => details,
            None => {
                let Some(details) = self.assemble(hash).await? else {
                    return Ok(None);
                };
                self.cache.save(key, &details).await;
                details
            }
        };

        if let (Some(last), Some(number)) = (self.get_last_block().await?, details.tx.tx.block_number) {
            details.tx.confirmations = Some(last.saturating_sub(number) + 1);
        }
        if let Some(address) = details.token.as_ref().map(|t| t.address.clone()) {
            details.token = self.tokens.get_token(&address).await?;
        }

        Ok(Some(details))
    }

    async fn assemble(&self, hash: &str) -> ExplorerResult<Option<TransactionDetails>> {
        let db = self.db.as_ref();
        let Some(tx) = get_transaction(db, hash).await? else {
            return Ok(None);
        };

        let mut contracts: Vec<String> = Vec::new();
        let mut token_address = None;

        if let Some(created) = tx.tx.creates.as_deref().filter(|c| !c.is_empty()) {
            push_unique(&mut contracts, created);
            token_address = Some(created.to_string());
        }
        if get_contract(db, &tx.tx.from).await?.is_some() {
            push_unique(&mut contracts, &tx.tx.from);
        }
        if let Some(to) = tx.tx.to.as_deref().filter(|t| !t.is_empty()) {
            if get_contract(db, to).await?.is_some() {
                push_unique(&mut contracts, to);
                token_address = Some(to.to_string());
            }
        }

        let mut token = match &token_address {
            Some(address) => self.tokens.get_token(address).await?,
            None => None,
        };

        let mut operations = Vec::new();
        for operation in get_operations(db, hash, None).await? {
            if tx.tx.to.as_deref() != Some(operation.contract.as_str()) {
                push_unique(&mut contracts, &operation.contract);
            }
            let op_token = self.tokens.get_token(&operation.contract).await?;
            if op_token.is_some() {
                token = op_token.clone();
            }
            operations.push(OperationView {
                operation,
                success: true,
                token: op_token,
            });
        }

        Ok(Some(TransactionDetails {
            tx,
            contracts,
            token,
            operations,
        }))
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
