use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use super::client::RpcTransport;

const WEI_PER_ETHER: f64 = 1e18;

/// Ethereum node calls used by the query layer
#[derive(Clone)]
pub struct NodeClient {
    transport: Arc<dyn RpcTransport>,
}

impl NodeClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    /// Latest ether balance of an address, `None` when the node is unavailable
    pub async fn get_balance(&self, address: &str) -> Option<f64> {
        let result = self
            .transport
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        let hex = result.as_str()?;
        match u128::from_str_radix(hex.trim_start_matches("0x"), 16) {
            Ok(wei) => Some(wei as f64 / WEI_PER_ETHER),
            Err(e) => {
                warn!("Unparseable balance {} for {}: {}", hex, address, e);
                None
            }
        }
    }
}
