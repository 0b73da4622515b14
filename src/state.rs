//! Shared application state.
//!
//! Constructed once in `main` and handed to axum; handlers extract it
//! with `State<AppState>`. Keeping the cache and config here (instead
//! of module-level singletons) is what lets the filter and cache logic
//! be tested in isolation.

use std::sync::Arc;

use crate::cache::{CacheService, PgCacheStore};
use crate::config::Config;
use crate::db::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub cache: CacheService<PgCacheStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        let cache = CacheService::new(PgCacheStore::new(pool.clone()), config.cache_enabled);
        Self {
            pool,
            cache,
            config: Arc::new(config),
        }
    }

    /// TTL for cached listing/search queries.
    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.cache_ttl_seconds)
    }
}
