pub mod keys;
pub mod store;

use crate::config::Config;

pub use keys::CacheKey;
pub use store::{CacheStore, ReadPolicy};

pub fn init_cache(config: &Config) -> CacheStore {
    CacheStore::new(config.cache_max_capacity, config.cache_ttl)
}
