pub mod client;
pub mod currency;
pub mod node;

pub use client::{JsonRpcClient, RpcError, RpcTransport};
pub use currency::CurrencyClient;
pub use node::NodeClient;
