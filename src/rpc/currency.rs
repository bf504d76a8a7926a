use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use super::client::RpcTransport;
use crate::models::{PriceQuote, TokenPrice};

const QUOTE_CURRENCY: &str = "USD";

/// Client of the external price-quote service
#[derive(Clone)]
pub struct CurrencyClient {
    transport: Arc<dyn RpcTransport>,
}

impl CurrencyClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    pub async fn current(&self, address: &str) -> Option<TokenPrice> {
        let result = self
            .transport
            .call("getCurrencyCurrent", json!([address, QUOTE_CURRENCY]))
            .await?;
        match serde_json::from_value(result) {
            Ok(price) => Some(price),
            Err(e) => {
                warn!("Unexpected current quote for {}: {}", address, e);
                None
            }
        }
    }

    /// Full quote history, oldest first
    pub async fn history(&self, address: &str) -> Option<Vec<PriceQuote>> {
        let result = self
            .transport
            .call("getCurrencyHistory", json!([address, QUOTE_CURRENCY]))
            .await?;
        match serde_json::from_value(result) {
            Ok(history) => Some(history),
            Err(e) => {
                warn!("Unexpected quote history for {}: {}", address, e);
                None
            }
        }
    }
}
