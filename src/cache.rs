//! Read-through caching for listing and search queries.
//!
//! The cache is an optimization, never a correctness dependency: every
//! backend failure (read or write) is logged and degraded to a miss, so
//! the wrapped fetcher's result always reaches the caller. Disabling
//! the cache via configuration degrades the system to "always call the
//! fetcher" rather than failing.
//!
//! Concurrent misses for the same key may each invoke the fetcher and
//! write the result. No single-flight coalescing is done; at the
//! traffic volumes involved a thundering herd is tolerated.

use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::db::DbPool;

/// Errors from the cache backend. Callers of [`CacheService`] never see
/// these; they are logged and swallowed at the service layer.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A key-value store with TTL'd JSON values.
///
/// The production implementation is [`PgCacheStore`]; tests use an
/// in-memory store so TTL behavior can run against a paused clock.
pub trait CacheStore: Clone + Send + Sync {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, CacheError>> + Send;

    fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// All stored keys matching a glob pattern (`*` wildcard).
    fn keys(&self, pattern: &str) -> impl Future<Output = Result<Vec<String>, CacheError>> + Send;

    fn delete(&self, keys: &[String]) -> impl Future<Output = Result<(), CacheError>> + Send;
}

/// Build a deterministic cache key from a namespace and query
/// parameters.
///
/// Parameter names are sorted alphabetically and joined as `name:value`
/// pairs with `|`, so two logically-identical queries produce the same
/// key regardless of parameter insertion order.
pub fn cache_key(namespace: &str, params: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join("|");

    format!("{namespace}:{joined}")
}

/// Translate a `*`-glob pattern into a SQL LIKE pattern, escaping LIKE
/// metacharacters in the literal parts.
fn glob_to_like(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        match ch {
            '*' => out.push('%'),
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Match a key against a `*`-glob pattern (used by the in-memory store).
#[cfg(test)]
fn glob_match(pattern: &str, key: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    if segments.len() == 1 {
        return pattern == key;
    }

    let mut rest = key;
    for (i, segment) in segments.iter().enumerate() {
        if i == 0 {
            match rest.strip_prefix(segment) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == segments.len() - 1 {
            return segment.is_empty() || rest.ends_with(segment);
        } else if !segment.is_empty() {
            match rest.find(segment) {
                Some(pos) => rest = &rest[pos + segment.len()..],
                None => return false,
            }
        }
    }
    true
}

/// Cache store backed by the `cache_entries` Postgres table.
///
/// Expired rows are ignored on read and overwritten by the next write
/// to the same key; a periodic sweep is unnecessary at this scale.
#[derive(Debug, Clone)]
pub struct PgCacheStore {
    pool: DbPool,
}

impl PgCacheStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CacheStore for PgCacheStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let value = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT value FROM cache_entries WHERE key = $1 AND expires_at > NOW()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expires_at)
            VALUES ($1, $2, NOW() + $3 * INTERVAL '1 second')
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value,
                created_at = NOW(),
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(ttl.as_secs() as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let keys = sqlx::query_scalar::<_, String>(
            r#"SELECT key FROM cache_entries WHERE key LIKE $1 ESCAPE '\'"#,
        )
        .bind(glob_to_like(pattern))
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ANY($1)")
            .bind(keys)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Read-through cache wrapper around a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct CacheService<S> {
    store: S,
    enabled: bool,
}

impl<S: CacheStore> CacheService<S> {
    pub fn new(store: S, enabled: bool) -> Self {
        Self { store, enabled }
    }

    /// Return the cached value for `key` if present and unexpired;
    /// otherwise invoke `fetcher`, store its result with `ttl`, and
    /// return it.
    ///
    /// Backend errors on either side are logged and treated as a miss;
    /// only the fetcher's own error can surface to the caller.
    pub async fn get_cached<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetcher: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.enabled {
            return fetcher().await;
        }

        match self.store.get(key).await {
            Ok(Some(value)) => match serde_json::from_value::<T>(value) {
                Ok(hit) => {
                    tracing::debug!(key, "cache hit");
                    return Ok(hit);
                }
                Err(e) => {
                    // Stale shape from an older deploy; refetch.
                    tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, treating as miss");
            }
        }

        let fresh = fetcher().await?;

        match serde_json::to_value(&fresh) {
            Ok(value) => {
                if let Err(e) = self.store.set(key, value, ttl).await {
                    tracing::warn!(key, error = %e, "cache write failed");
                }
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "value not cacheable");
            }
        }

        Ok(fresh)
    }

    /// Bulk-delete every key matching a `*`-glob pattern.
    ///
    /// Used when underlying data changes outside the normal TTL window
    /// (e.g. after a maintenance job mutates listings). Enumeration or
    /// deletion failures are logged and otherwise ignored; stale
    /// entries are left to expire via TTL.
    pub async fn invalidate(&self, pattern: &str) {
        if !self.enabled {
            return;
        }

        let keys = match self.store.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(pattern, error = %e, "cache invalidation enumeration failed");
                return;
            }
        };

        if keys.is_empty() {
            return;
        }

        match self.store.delete(&keys).await {
            Ok(()) => {
                tracing::info!(pattern, count = keys.len(), "invalidated cache entries");
            }
            Err(e) => {
                tracing::warn!(pattern, error = %e, "cache invalidation delete failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    /// In-memory store with tokio `Instant` deadlines, so paused-clock
    /// tests can advance time deterministically.
    #[derive(Clone, Default)]
    struct MemoryCacheStore {
        entries: Arc<Mutex<HashMap<String, (serde_json::Value, Instant)>>>,
    }

    impl CacheStore for MemoryCacheStore {
        async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
            let entries = self.entries.lock().unwrap();
            Ok(entries
                .get(key)
                .filter(|(_, deadline)| Instant::now() < *deadline)
                .map(|(value, _)| value.clone()))
        }

        async fn set(
            &self,
            key: &str,
            value: serde_json::Value,
            ttl: Duration,
        ) -> Result<(), CacheError> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value, Instant::now() + ttl));
            Ok(())
        }

        async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .keys()
                .filter(|k| glob_match(pattern, k))
                .cloned()
                .collect())
        }

        async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
            let mut entries = self.entries.lock().unwrap();
            for key in keys {
                entries.remove(key);
            }
            Ok(())
        }
    }

    /// Store whose reads and writes always fail, for the degraded path.
    #[derive(Clone)]
    struct FailingCacheStore;

    impl CacheStore for FailingCacheStore {
        async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>, CacheError> {
            Err(CacheError::Backend(sqlx::Error::PoolTimedOut))
        }

        async fn set(
            &self,
            _key: &str,
            _value: serde_json::Value,
            _ttl: Duration,
        ) -> Result<(), CacheError> {
            Err(CacheError::Backend(sqlx::Error::PoolTimedOut))
        }

        async fn keys(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
            Err(CacheError::Backend(sqlx::Error::PoolTimedOut))
        }

        async fn delete(&self, _keys: &[String]) -> Result<(), CacheError> {
            Err(CacheError::Backend(sqlx::Error::PoolTimedOut))
        }
    }

    fn counting_fetcher(
        calls: Arc<AtomicUsize>,
        value: u64,
    ) -> impl Fn() -> std::future::Ready<Result<u64, Infallible>> {
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(value))
        }
    }

    #[test]
    fn key_is_deterministic_under_param_reordering() {
        let a = cache_key(
            "listings",
            &[("type", "Event".to_string()), ("city", "Oakland".to_string())],
        );
        let b = cache_key(
            "listings",
            &[("city", "Oakland".to_string()), ("type", "Event".to_string())],
        );
        assert_eq!(a, b);
        assert_eq!(a, "listings:city:Oakland|type:Event");
    }

    #[test]
    fn key_namespaces_are_distinct() {
        let params = [("q", "zoo".to_string())];
        assert_ne!(cache_key("listings", &params), cache_key("search", &params));
    }

    #[test]
    fn glob_translation_escapes_like_metacharacters() {
        assert_eq!(glob_to_like("listings:*"), "listings:%");
        assert_eq!(glob_to_like("a_b%c*"), r"a\_b\%c%");
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("listings:*", "listings:city:Oakland"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("search:q:zoo", "search:q:zoo"));
        assert!(!glob_match("listings:*", "search:q:zoo"));
        assert!(glob_match("a*c", "abc"));
        assert!(!glob_match("a*c", "abd"));
    }

    #[tokio::test]
    async fn second_read_within_ttl_skips_the_fetcher() {
        let cache = CacheService::new(MemoryCacheStore::default(), true);
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(calls.clone(), 42);

        let first: u64 = cache
            .get_cached("k", Duration::from_secs(300), &fetcher)
            .await
            .unwrap();
        let second: u64 = cache
            .get_cached("k", Duration::from_secs(300), &fetcher)
            .await
            .unwrap();

        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_reinvokes_the_fetcher() {
        let cache = CacheService::new(MemoryCacheStore::default(), true);
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(calls.clone(), 7);

        let _: u64 = cache
            .get_cached("k", Duration::from_secs(300), &fetcher)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(301)).await;

        let _: u64 = cache
            .get_cached("k", Duration::from_secs(300), &fetcher)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_cache_always_invokes_the_fetcher() {
        let cache = CacheService::new(MemoryCacheStore::default(), false);
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(calls.clone(), 1);

        for _ in 0..3 {
            let _: u64 = cache
                .get_cached("k", Duration::from_secs(300), &fetcher)
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn backend_failure_degrades_to_direct_fetch() {
        let cache = CacheService::new(FailingCacheStore, true);
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(calls.clone(), 9);

        let value: u64 = cache
            .get_cached("k", Duration::from_secs(300), &fetcher)
            .await
            .unwrap();
        assert_eq!(value, 9);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Invalidation against a broken backend is a logged no-op.
        cache.invalidate("listings:*").await;
    }

    #[tokio::test]
    async fn invalidate_removes_only_matching_namespace() {
        let store = MemoryCacheStore::default();
        let cache = CacheService::new(store.clone(), true);
        let ttl = Duration::from_secs(300);

        store
            .set("listings:city:Oakland", serde_json::json!(1), ttl)
            .await
            .unwrap();
        store
            .set("search:q:zoo", serde_json::json!(2), ttl)
            .await
            .unwrap();

        cache.invalidate("listings:*").await;

        assert!(store.get("listings:city:Oakland").await.unwrap().is_none());
        assert!(store.get("search:q:zoo").await.unwrap().is_some());
    }
}
