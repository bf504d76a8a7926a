use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Display overrides a deployment can apply to token metadata
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ClientTokenOverride {
    pub name: Option<String>,
    pub symbol: Option<String>,
}

/// Announcement shown by the frontend until `active_till` (unix seconds)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_till: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub ethereum_rpc_url: String,
    pub currency_rpc_url: Option<String>,
    pub update_rates: HashSet<String>,
    pub client_tokens: HashMap<String, ClientTokenOverride>,
    /// API key to its per-key defaults
    pub api_keys: HashMap<String, Value>,
    pub notes: Vec<Note>,
    pub cache_ttl: Duration,
    pub cache_max_capacity: u64,
    pub page_size: Option<u64>,
    pub rpc_timeout_secs: u64,
    pub rpc_accept_invalid_certs: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = var("DATABASE_URL").unwrap_or_else(|| "sqlite:data.db".to_string());
        let server_host = var("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let server_port = var("SERVER_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .unwrap_or(8080);
        let ethereum_rpc_url = var("ETHEREUM_RPC_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("ETHEREUM_RPC_URL"))?;
        let currency_rpc_url = var("CURRENCY_RPC_URL").filter(|url| !url.trim().is_empty());
        let update_rates = var("UPDATE_RATES")
            .map(|v| parse_address_list(&v))
            .unwrap_or_default();
        let client_tokens = match var("CLIENT_TOKENS") {
            Some(raw) if !raw.trim().is_empty() => parse_client_tokens(&raw)?,
            _ => HashMap::new(),
        };
        let api_keys = match var("API_KEYS") {
            Some(raw) if !raw.trim().is_empty() => parse_api_keys(&raw)?,
            _ => HashMap::new(),
        };
        let notes = match var("NOTES") {
            Some(raw) if !raw.trim().is_empty() => parse_notes(&raw)?,
            _ => Vec::new(),
        };
        let cache_ttl = var("CACHE_TTL")
            .unwrap_or_else(|| "3600".to_string())
            .parse()
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(3600));
        let cache_max_capacity = var("CACHE_MAX_CAPACITY")
            .unwrap_or_else(|| "10000".to_string())
            .parse()
            .unwrap_or(10000);
        let page_size = var("PAGE_SIZE")
            .and_then(|v| v.parse().ok())
            .filter(|size| *size > 0);
        let rpc_timeout_secs = var("RPC_TIMEOUT_SECS")
            .map(|v| v.parse().unwrap_or(30))
            .unwrap_or(30);
        let rpc_accept_invalid_certs = var("RPC_ACCEPT_INVALID_CERTS")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        Ok(Self {
            database_url,
            server_host,
            server_port,
            ethereum_rpc_url,
            currency_rpc_url,
            update_rates,
            client_tokens,
            api_keys,
            notes,
            cache_ttl,
            cache_max_capacity,
            page_size,
            rpc_timeout_secs,
            rpc_accept_invalid_certs,
        })
    }
}

/// Split a comma-separated address list, lowercasing each entry
pub fn parse_address_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .collect()
}

pub fn parse_client_tokens(raw: &str) -> Result<HashMap<String, ClientTokenOverride>, ConfigError> {
    let tokens: HashMap<String, ClientTokenOverride> =
        serde_json::from_str(raw).map_err(|e| ConfigError::Invalid {
            name: "CLIENT_TOKENS",
            reason: e.to_string(),
        })?;
    Ok(tokens
        .into_iter()
        .map(|(address, token)| (address.to_lowercase(), token))
        .collect())
}

/// `API_KEYS`: JSON object mapping each key to its defaults
pub fn parse_api_keys(raw: &str) -> Result<HashMap<String, Value>, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Invalid {
        name: "API_KEYS",
        reason: e.to_string(),
    })
}

/// `NOTES`: JSON array of announcements
pub fn parse_notes(raw: &str) -> Result<Vec<Note>, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Invalid {
        name: "NOTES",
        reason: e.to_string(),
    })
}
