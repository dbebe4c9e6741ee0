//! Storage for composed pages.

use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use axum::http::StatusCode;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tracing::warn;

use super::config::CacheConfig;
use super::keys::ViewKey;

const METRIC_EVICT_TOTAL: &str = "mondrian_view_cache_evict_total";

/// A fully assembled page, ready to be written.
///
/// Entries are immutable once stored; a later insert under the same key
/// replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub status: StatusCode,
    pub body: Bytes,
    pub content_type: &'static str,
}

impl CacheEntry {
    pub fn html(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
            content_type: "text/html; charset=utf-8",
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

/// LRU-ordered page store. Unbounded unless `max_entries` is configured.
pub struct ViewStore {
    enabled: bool,
    pages: RwLock<LruCache<ViewKey, CacheEntry>>,
}

impl ViewStore {
    pub fn new(config: &CacheConfig) -> Self {
        let pages = match config.max_entries {
            Some(limit) => LruCache::new(limit),
            None => LruCache::unbounded(),
        };
        Self {
            enabled: config.enabled,
            pages: RwLock::new(pages),
        }
    }

    pub fn get(&self, key: &ViewKey) -> Option<CacheEntry> {
        if !self.enabled {
            return None;
        }
        // `LruCache::get` bumps recency, so reads take the write lock.
        self.write("get").get(key).cloned()
    }

    /// Store `entry` under `key`; returns the key evicted to make room, if any.
    pub fn put(&self, key: ViewKey, entry: CacheEntry) -> Option<ViewKey> {
        if !self.enabled {
            return None;
        }
        let evicted = self
            .write("put")
            .push(key.clone(), entry)
            .map(|(evicted_key, _)| evicted_key)
            .filter(|evicted_key| *evicted_key != key);
        if evicted.is_some() {
            counter!(METRIC_EVICT_TOTAL).increment(1);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self, op: &'static str) -> RwLockWriteGuard<'_, LruCache<ViewKey, CacheEntry>> {
        self.pages.write().unwrap_or_else(|poisoned| {
            warn!(
                op,
                target_module = "cache::store",
                result = "poisoned_recovered",
                "Recovered from poisoned view store lock"
            );
            poisoned.into_inner()
        })
    }
}
