pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod query;
pub mod rpc;
pub mod service;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod tests;

pub use api::error::ApiError;
pub use api::route::create_router;
pub use service::{Explorer, ExplorerError, ExplorerSettings};
pub use validation::{is_valid_address, is_valid_transaction_hash};
