use explorer_query_service::{
    api, cache,
    config::Config,
    db::{DataSource, SqliteStore},
    rpc::{CurrencyClient, JsonRpcClient, NodeClient, RpcTransport},
    service::{Explorer, ExplorerSettings},
    state::AppState,
};

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting explorer-query-service");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    // Open the document store
    let store = SqliteStore::connect(&config.database_url).await?;
    let db: Arc<dyn DataSource> = Arc::new(store);

    // Initialize cache
    let cache = cache::init_cache(&config);
    tracing::info!(
        "Cache initialized with TTL: {:?} and capacity: {}",
        config.cache_ttl,
        config.cache_max_capacity
    );

    // RPC clients
    let timeout = Duration::from_secs(config.rpc_timeout_secs);
    let node_transport: Arc<dyn RpcTransport> = Arc::new(JsonRpcClient::new(
        &config.ethereum_rpc_url,
        timeout,
        config.rpc_accept_invalid_certs,
    )?);
    let currency = match &config.currency_rpc_url {
        Some(url) => {
            let transport: Arc<dyn RpcTransport> =
                Arc::new(JsonRpcClient::new(url, timeout, config.rpc_accept_invalid_certs)?);
            Some(CurrencyClient::new(transport))
        }
        None => {
            tracing::warn!("CURRENCY_RPC_URL not set, token prices are served from cache only");
            None
        }
    };

    let explorer = Explorer::new(
        db,
        cache,
        NodeClient::new(node_transport),
        currency,
        ExplorerSettings::from(&config),
    )
    .await?;

    // Create shared state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        explorer,
    });

    // Shut down on Ctrl-C
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Shutdown signal received");
        signal_token.cancel();
    });

    // Start HTTP server
    let app = api::create_router(app_state);
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Starting server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
