//!
//! src/cache.rs  Oct 2nd, 2026
//!
//! Short TTL memoization of catalog calls. The cache is an explicit
//! object shared across pipeline runs; CachedCatalog wraps any
//! CatalogResolver and consults it transparently
//!

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::{sync::RwLock, time::Instant};
use tracing::debug;

use crate::config::CacheConfig;
use crate::errors::ProviderError;
use crate::provider::CatalogResolver;
use crate::types::{CatalogId, ResolvedTrack};

/// Stable key over an operation name and its parameters, taken as given.
/// Catalog ids are case sensitive, so callers normalize free text only
pub fn cache_key(op: &str, params: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(op.as_bytes());
    for p in params {
        hasher.update([0x1f]);
        hasher.update(p.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Search text is matched case insensitively by the catalog
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[derive(Debug)]
struct Entry {
    tracks: Vec<ResolvedTrack>,
    expires: Instant
}

#[derive(Debug)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, Entry>>,
    max_entries: usize
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self { entries: RwLock::new(HashMap::new()), max_entries: max_entries.max(1) }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<ResolvedTrack>> {
        let entries = self.entries.read().await;
        entries.get(key)
            .filter(|e| Instant::now() < e.expires)
            .map(|e| e.tracks.clone())
    }

    pub async fn insert(&self, key: String, tracks: Vec<ResolvedTrack>, ttl: Duration) {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries {
            let now = Instant::now();
            entries.retain(|_, e| now < e.expires);
            // still full of live entries, drop the one closest to expiry
            if entries.len() >= self.max_entries {
                if let Some(oldest) = entries.iter()
                    .min_by_key(|(_, e)| e.expires)
                    .map(|(k, _)| k.clone()) {
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(key, Entry { tracks, expires: Instant::now() + ttl });
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Decorator memoizing search and lookup results of the wrapped catalog.
/// Errors are never cached
pub struct CachedCatalog<C> {
    inner: C,
    cache: Arc<ResponseCache>,
    search_ttl: Duration,
    lookup_ttl: Duration
}

impl<C: CatalogResolver> CachedCatalog<C> {
    pub fn new(inner: C, cache: Arc<ResponseCache>, cfg: &CacheConfig) -> Self {
        Self { inner, cache, search_ttl: cfg.search_ttl, lookup_ttl: cfg.lookup_ttl }
    }

    pub fn inner(&self) -> &C { &self.inner }
}

#[async_trait]
impl<C: CatalogResolver> CatalogResolver for CachedCatalog<C> {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<ResolvedTrack>, ProviderError> {
        let key = cache_key("search", &[&normalize_query(query), &limit.to_string()]);
        if let Some(hit) = self.cache.get(&key).await {
            debug!(query, "cache.hit.search");
            return Ok(hit);
        }
        let tracks = self.inner.search(query, limit).await?;
        self.cache.insert(key, tracks.clone(), self.search_ttl).await;
        Ok(tracks)
    }

    async fn lookup_many(&self, ids: &[CatalogId]) -> Result<Vec<ResolvedTrack>, ProviderError> {
        let id_strs: Vec<&str> = ids.iter().map(CatalogId::as_str).collect();
        let key = cache_key("lookup_many", &id_strs);
        if let Some(hit) = self.cache.get(&key).await {
            debug!(count = ids.len(), "cache.hit.lookup");
            return Ok(hit);
        }
        let tracks = self.inner.lookup_many(ids).await?;
        self.cache.insert(key, tracks.clone(), self.lookup_ttl).await;
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{track, FakeCatalog};

    fn cfg() -> CacheConfig {
        CacheConfig::default()
    }

    #[test]
    fn keys_keep_parameters_verbatim() {
        assert_eq!(normalize_query("  Africa   Toto "), "africa toto");
        assert_ne!(cache_key("lookup_many", &["AbC"]), cache_key("lookup_many", &["abc"]));
        assert_ne!(cache_key("search", &["africa", "10"]), cache_key("search", &["africa", "5"]));
        assert_ne!(cache_key("search", &["a"]), cache_key("lookup_many", &["a"]));
    }

    #[tokio::test]
    async fn repeated_search_hits_cache() {
        let fake = FakeCatalog::new().with_search("africa toto", vec![track("1", "Africa")]);
        let cached = CachedCatalog::new(fake, Arc::new(ResponseCache::new(16)), &cfg());

        let first = cached.search("Africa Toto", 10).await.unwrap();
        let second = cached.search("africa toto", 10).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.inner().search_calls(), 1);
    }

    #[tokio::test]
    async fn lookups_differing_only_in_id_case_stay_apart() {
        let fake = FakeCatalog::new()
            .with_search("upper", vec![track("AbC", "Upper")])
            .with_search("lower", vec![track("abc", "Lower")]);
        let cached = CachedCatalog::new(fake, Arc::new(ResponseCache::new(16)), &cfg());

        let first = cached.lookup_many(&[CatalogId::from("AbC")]).await.unwrap();
        let second = cached.lookup_many(&[CatalogId::from("abc")]).await.unwrap();
        assert_eq!(first[0].title, "Upper");
        assert_eq!(second[0].title, "Lower");
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let fake = FakeCatalog::new().failing(ProviderError::Http("down".into()));
        let cached = CachedCatalog::new(fake, Arc::new(ResponseCache::new(16)), &cfg());

        assert!(cached.search("anything", 10).await.is_err());
        assert!(cached.search("anything", 10).await.is_err());
        assert_eq!(cached.inner().search_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = ResponseCache::new(16);
        cache.insert("k".into(), vec![track("1", "a")], Duration::from_secs(5)).await;
        assert!(cache.get("k").await.is_some());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn full_cache_evicts() {
        let cache = ResponseCache::new(2);
        cache.insert("a".into(), vec![], Duration::from_secs(10)).await;
        cache.insert("b".into(), vec![], Duration::from_secs(20)).await;
        cache.insert("c".into(), vec![], Duration::from_secs(30)).await;
        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_none());
        assert!(cache.get("c").await.is_some());
    }
}
