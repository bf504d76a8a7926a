use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// JSON-RPC 2.0 request/response round trip.
///
/// Any failure (transport, non-JSON body, missing `result`) yields `None`;
/// callers degrade instead of propagating.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Option<Value>;
}

pub struct JsonRpcClient {
    http: reqwest::Client,
    endpoint: String,
}

impl JsonRpcClient {
    pub fn new(endpoint: &str, timeout: Duration, accept_invalid_certs: bool) -> Result<Self, RpcError> {
        if accept_invalid_certs {
            warn!("TLS certificate verification disabled for RPC endpoint {}", endpoint);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;

        info!("Initializing JSON-RPC client with endpoint: {}", endpoint);

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl RpcTransport for JsonRpcClient {
    async fn call(&self, method: &str, params: Value) -> Option<Value> {
        let id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = match self.http.post(&self.endpoint).json(&request).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("RPC call {} to {} failed: {}", method, self.endpoint, e);
                return None;
            }
        };

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("RPC call {} returned unreadable body: {}", method, e);
                return None;
            }
        };

        if !body.starts_with('{') {
            warn!("RPC call {} returned a non-JSON response", method);
            return None;
        }

        let parsed: Value = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("RPC call {} returned malformed JSON: {}", method, e);
                return None;
            }
        };

        match parsed.get("result") {
            Some(result) if !result.is_null() => Some(result.clone()),
            _ => {
                let error = parsed.get("error").cloned().unwrap_or_default();
                debug!("RPC call {} returned no result: {}", method, error);
                None
            }
        }
    }
}
