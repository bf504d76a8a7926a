use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{
    api::{
        error::ApiError,
        response::{csv_attachment, with_total_count, ApiResponse},
    },
    query::{QueryContext, Section},
    service::{Granularity, DEFAULT_PAGE_SIZE},
    state::AppState,
    validation::{validate_address, validate_limit, validate_transaction_hash},
};

const MAX_TOP_LIMIT: usize = 50;

// GET /address/{address} query parameters
#[derive(Debug, Default, Deserialize)]
pub struct AddressQuery {
    page_size: Option<u64>,
    transfers: Option<u64>,
    issuances: Option<u64>,
    holders: Option<u64>,
    chainy: Option<u64>,
    refresh: Option<String>,
    filter: Option<String>,
}

impl AddressQuery {
    fn context(&self) -> Result<QueryContext, ApiError> {
        let mut ctx = QueryContext::new();
        if let Some(size) = self.page_size {
            ctx = ctx.with_page_size(size);
        }
        for (section, page) in [
            (Section::Transfers, self.transfers),
            (Section::Issuances, self.issuances),
            (Section::Holders, self.holders),
            (Section::Chainy, self.chainy),
        ] {
            if let Some(page) = page {
                ctx = ctx.with_page(section, page);
            }
        }
        if let Some(refresh) = self.refresh.as_deref().filter(|r| !r.is_empty()) {
            let section = refresh.parse().map_err(ApiError::InvalidParameter)?;
            ctx = ctx.with_refresh(section);
        }
        if let Some(filter) = &self.filter {
            ctx = ctx.with_filter(filter);
        }
        Ok(ctx)
    }
}

// GET /top query parameters
#[derive(Debug, Deserialize)]
pub struct TopQuery {
    #[serde(default = "default_top_limit")]
    limit: usize,
    #[serde(default = "default_top_period")]
    period: u32,
    /// `count`, `current` or `period`
    #[serde(default)]
    criteria: Option<String>,
}

fn default_top_limit() -> usize {
    10
}

fn default_top_period() -> u32 {
    30
}

// GET /history query parameters
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_top_period")]
    period: u32,
    address: Option<String>,
}

// GET /price-history/{address} query parameters
#[derive(Debug, Deserialize)]
pub struct PriceHistoryQuery {
    #[serde(default = "default_price_period")]
    period: u32,
    #[serde(rename = "type")]
    granularity: Option<String>,
}

fn default_price_period() -> u32 {
    365
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

// Create router with all routes
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/address/{address}", get(get_address))
        .route("/tx/{hash}", get(get_transaction))
        .route("/tokens", get(get_tokens))
        .route("/token/{address}", get(get_token))
        .route("/top", get(get_top_tokens))
        .route("/history", get(get_token_history))
        .route("/price-history/{address}", get(get_price_history))
        .route("/search", get(search_token))
        .route("/csv/{address}", get(get_address_csv))
        .route("/notes", get(get_notes))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

fn normalize_address(raw: &str) -> Result<String, ApiError> {
    let address = raw.trim().to_lowercase();
    validate_address(&address)?;
    Ok(address)
}

// GET /address/{address} handler
async fn get_address(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(params): Query<AddressQuery>,
) -> Result<Response, ApiError> {
    let address = normalize_address(&address)?;
    let ctx = params.context()?;
    info!("Fetching details for address: {}", address);

    let details = state
        .explorer
        .get_address_details(&address, &ctx, DEFAULT_PAGE_SIZE)
        .await?;
    Ok(ApiResponse { data: details }.into_response())
}

// GET /tx/{hash} handler
async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Response, ApiError> {
    let hash = hash.trim().to_lowercase();
    validate_transaction_hash(&hash)?;
    info!("Fetching transaction: {}", hash);

    match state.explorer.get_transaction_details(&hash).await? {
        Some(details) => Ok(ApiResponse { data: details }.into_response()),
        None => Err(ApiError::NotFound(format!("transaction {}", hash))),
    }
}

// GET /tokens handler
async fn get_tokens(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let tokens = state.explorer.get_tokens(false).await?;
    let count = tokens.len();
    Ok(with_total_count(tokens, count))
}

// GET /token/{address} handler
async fn get_token(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Response, ApiError> {
    let address = normalize_address(&address)?;

    match state.explorer.get_token(&address).await? {
        Some(token) => Ok(ApiResponse { data: token }.into_response()),
        None => Err(ApiError::NotFound(format!("token {}", address))),
    }
}

// GET /top handler
async fn get_top_tokens(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopQuery>,
) -> Result<Response, ApiError> {
    let limit = validate_limit(params.limit, MAX_TOP_LIMIT)?;
    let explorer = &state.explorer;

    let response = match params.criteria.as_deref().unwrap_or("count") {
        "count" => {
            let top = explorer.get_top_tokens(limit, params.period).await?;
            let count = top.len();
            with_total_count(top, count)
        }
        "current" => {
            let top = explorer.get_top_tokens_by_current_volume(limit).await?;
            let count = top.len();
            with_total_count(top, count)
        }
        "period" => {
            let top = explorer.get_top_tokens_by_period_volume(limit, params.period).await?;
            let count = top.len();
            with_total_count(top, count)
        }
        other => {
            return Err(ApiError::InvalidParameter(format!(
                "criteria must be 'count', 'current' or 'period', got '{}'",
                other
            )))
        }
    };
    Ok(response)
}

// GET /history handler
async fn get_token_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> Result<Response, ApiError> {
    let address = params.address.as_deref().map(normalize_address).transpose()?;
    let history = state
        .explorer
        .get_token_history_grouped(params.period, address.as_deref())
        .await?;
    Ok(ApiResponse { data: history }.into_response())
}

// GET /price-history/{address} handler
async fn get_price_history(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(params): Query<PriceHistoryQuery>,
) -> Result<Response, ApiError> {
    let address = normalize_address(&address)?;
    let granularity = match params.granularity.as_deref() {
        Some(raw) => raw.parse().map_err(ApiError::InvalidParameter)?,
        None => Granularity::Daily,
    };

    let history = state
        .explorer
        .get_token_price_history_grouped(&address, params.period, granularity)
        .await?;
    Ok(ApiResponse { data: history }.into_response())
}

// GET /search handler
async fn search_token(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Missing parameter: q".to_string()));
    }
    let result = state.explorer.search_token(query).await?;
    Ok(ApiResponse { data: result }.into_response())
}

// GET /csv/{address} handler
async fn get_address_csv(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Response, ApiError> {
    let address = normalize_address(&address)?;
    info!("Exporting operations of {} as CSV", address);

    let csv = state.explorer.get_address_operations_csv(&address).await?;
    Ok(csv_attachment(&address, csv))
}

// GET /notes handler
async fn get_notes(State(state): State<Arc<AppState>>) -> Response {
    let notes = state.explorer.get_active_notes();
    let count = notes.len();
    with_total_count(notes, count)
}
