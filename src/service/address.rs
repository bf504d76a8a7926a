use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::debug;

use super::contracts::get_contract;
use super::operations::{
    address_operations_query, contract_operations_query, ether_total_out, get_address_balances, holders_query,
};
use super::tokens::{holder_shares, TokenCatalog};
use super::{is_chainy_address, ExplorerResult, ADDRESS_CHAINY};
use crate::db::{decode_all, Collection, DataSource, Filter};
use crate::models::{
    AddressDetails, AddressView, Balance, ChainyEntry, ChainySections, ContractSections, ContractView,
    EtherBalance, OperationKind, RawAmount, TokenSections, TokenView, Transaction, WalletSections,
};
use crate::query::{FilteredQuery, QueryContext, Section};
use crate::rpc::NodeClient;

/// Records per page when neither the request nor the config set one
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Concurrent token lookups while assembling a wallet
const TOKEN_LOOKUP_CONCURRENCY: usize = 8;

/// Hex characters of Chainy log data preceding the payload
const CHAINY_DATA_OFFSET: usize = 194;

/// Classifies an address and assembles the matching view
#[derive(Clone)]
pub struct AddressResolver {
    db: Arc<dyn DataSource>,
    node: NodeClient,
    tokens: TokenCatalog,
    page_size: Option<u64>,
}

impl AddressResolver {
    pub fn new(db: Arc<dyn DataSource>, node: NodeClient, tokens: TokenCatalog, page_size: Option<u64>) -> Self {
        Self {
            db,
            node,
            tokens,
            page_size,
        }
    }

    /// Everything known about an address.
    ///
    /// A contract is checked for being a token, then for being Chainy, and
    /// otherwise shown as a contract with wallet sections. A non-contract may
    /// still be a token with no contract record; anything else is a wallet.
    pub async fn get_address_details(
        &self,
        address: &str,
        ctx: &QueryContext,
        limit: u64,
    ) -> ExplorerResult<AddressDetails> {
        let limit = ctx.page_size().or(self.page_size).unwrap_or(limit);

        let balance = match ctx.refresh() {
            Some(_) => None,
            None => Some(self.ether_balance(address).await?),
        };

        let view = match get_contract(self.db.as_ref(), address).await? {
            Some(contract) => match self.tokens.get_token(address).await? {
                Some(token) => AddressView::Token(self.token_sections(address, Some(contract), token, ctx, limit).await?),
                None if is_chainy_address(address) => {
                    AddressView::Chainy(self.chainy_sections(contract, ctx, limit).await?)
                }
                None => AddressView::Contract(self.contract_sections(address, contract, ctx, limit).await?),
            },
            None => match self.tokens.get_token(address).await? {
                Some(token) => AddressView::Token(self.token_sections(address, None, token, ctx, limit).await?),
                None => AddressView::Wallet(self.wallet_sections(address, ctx, limit).await?),
            },
        };

        debug!("Resolved {} as {}", address, view_kind(&view));
        Ok(AddressDetails {
            address: address.to_string(),
            is_contract: view.is_contract(),
            balance,
            view,
        })
    }

    /// Node balance plus ether sent; `balance` is `None` when the node fails
    pub async fn ether_balance(&self, address: &str) -> ExplorerResult<EtherBalance> {
        let balance = self.node.get_balance(address).await;
        let balance_out = ether_total_out(self.db.as_ref(), address).await?;

        Ok(EtherBalance {
            balance,
            balance_in: balance.unwrap_or(0.0) + balance_out,
            balance_out,
        })
    }

    async fn token_sections(
        &self,
        address: &str,
        contract: Option<ContractView>,
        token: TokenView,
        ctx: &QueryContext,
        limit: u64,
    ) -> ExplorerResult<TokenSections> {
        let db = self.db.as_ref();
        let mut sections = TokenSections {
            contract,
            page_size: limit,
            transfers: None,
            issuances: None,
            holders: None,
            pager: Default::default(),
            token,
        };

        if ctx.renders(Section::Transfers) {
            let page = contract_operations_query(address, &[OperationKind::Transfer])
                .paginate(db, ctx, Section::Transfers, limit)
                .await?;
            sections.transfers = Some(decode_all(page.items)?);
            sections.pager.transfers = Some(page.pager);
        }

        if ctx.renders(Section::Issuances) {
            let page = contract_operations_query(address, &OperationKind::ISSUANCES)
                .paginate(db, ctx, Section::Issuances, limit)
                .await?;
            sections.issuances = Some(decode_all(page.items)?);
            sections.pager.issuances = Some(page.pager);
        }

        if ctx.renders(Section::Holders) {
            let page = holders_query(address)
                .paginate(db, ctx, Section::Holders, limit)
                .await?;
            let balances: Vec<Balance> = decode_all(page.items)?;
            let supply = sections.token.total_supply.as_ref().map(RawAmount::as_f64);
            sections.holders = Some(holder_shares(&balances, supply));
            sections.pager.holders = Some(page.pager);
        }

        Ok(sections)
    }

    async fn chainy_sections(
        &self,
        contract: ContractView,
        ctx: &QueryContext,
        limit: u64,
    ) -> ExplorerResult<ChainySections> {
        let page = FilteredQuery::new(Collection::Transactions, Filter::eq("to", ADDRESS_CHAINY))
            .text_fields(&["hash"])
            .paginate(self.db.as_ref(), ctx, Section::Chainy, limit)
            .await?;
        let txs: Vec<Transaction> = decode_all(page.items)?;

        Ok(ChainySections {
            contract,
            chainy: txs.iter().filter_map(chainy_entry).collect(),
            pager: page.pager,
        })
    }

    async fn contract_sections(
        &self,
        address: &str,
        contract: ContractView,
        ctx: &QueryContext,
        limit: u64,
    ) -> ExplorerResult<ContractSections> {
        let wallet = self.wallet_sections(address, ctx, limit).await?;
        Ok(ContractSections { contract, wallet })
    }

    async fn wallet_sections(&self, address: &str, ctx: &QueryContext, limit: u64) -> ExplorerResult<WalletSections> {
        let balances = get_address_balances(self.db.as_ref(), address, true).await?;

        let contracts: Vec<String> = balances.iter().map(|b| b.contract.clone()).collect();
        let tokens = self.tokens.clone();
        let lookups: Vec<ExplorerResult<Option<TokenView>>> = stream::iter(contracts)
            .map(move |contract| {
                let tokens = tokens.clone();
                async move { tokens.get_token(&contract).await }
            })
            .buffered(TOKEN_LOOKUP_CONCURRENCY)
            .collect()
            .await;

        let mut held = Vec::with_capacity(lookups.len());
        for token in lookups {
            if let Some(token) = token? {
                held.push(token);
            }
        }

        let page = address_operations_query(address, &OperationKind::ALL)
            .paginate(self.db.as_ref(), ctx, Section::Transfers, limit)
            .await?;

        Ok(WalletSections {
            balances,
            tokens: held,
            transfers: decode_all(page.items)?,
            pager: page.pager,
        })
    }
}

fn view_kind(view: &AddressView) -> &'static str {
    match view {
        AddressView::Token(_) => "token",
        AddressView::Chainy(_) => "chainy",
        AddressView::Contract(_) => "contract",
        AddressView::Wallet(_) => "wallet",
    }
}

/// Chainy publication carried by a transaction's first log, if any.
///
/// The payload starts at a fixed offset in the log data; trailing zero
/// padding is dropped and an odd-length remainder is re-padded to whole bytes.
pub fn chainy_entry(tx: &Transaction) -> Option<ChainyEntry> {
    let log = tx.receipt.as_ref()?.logs.first()?;
    let payload = log.data.get(CHAINY_DATA_OFFSET..).unwrap_or_default();

    let mut link = payload.trim_end_matches('0').to_string();
    if link.len() % 2 == 1 {
        link.push('0');
    }

    Some(ChainyEntry {
        hash: tx.hash.clone(),
        timestamp: tx.timestamp,
        input: tx.input.clone(),
        link,
    })
}
