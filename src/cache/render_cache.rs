//! Single-flight render cache.
//!
//! The first miss for a key registers a shared pending render in
//! `flights`; every concurrent miss for the same key awaits that same
//! handle. The render itself runs on a detached task, so a caller that
//! stops waiting never cancels the work other callers depend on.

use std::{error::Error as StdError, future::Future, sync::Arc, time::Instant};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::{BoxFuture, FutureExt, Shared};
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::view::ViewRequest;

use super::config::CacheConfig;
use super::keys::ViewKey;
use super::store::{CacheEntry, ViewStore};

const METRIC_HIT_TOTAL: &str = "mondrian_view_cache_hit_total";
const METRIC_MISS_TOTAL: &str = "mondrian_view_cache_miss_total";
const METRIC_JOIN_TOTAL: &str = "mondrian_view_cache_join_total";
const METRIC_FAILURE_TOTAL: &str = "mondrian_view_cache_render_failure_total";
const METRIC_RENDER_MS: &str = "mondrian_view_render_ms";

type FlightResult = Result<CacheEntry, CacheError>;
type Flight = Shared<BoxFuture<'static, FlightResult>>;

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("view render failed: {0}")]
    Render(Arc<dyn StdError + Send + Sync>),
    #[error("view render task aborted: {0}")]
    Aborted(String),
}

/// How a lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from the store.
    Hit,
    /// This caller started the render.
    Miss,
    /// This caller waited on a render another caller started.
    Joined,
}

#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub entry: CacheEntry,
    pub outcome: CacheOutcome,
}

pub struct RenderCache {
    store: Arc<ViewStore>,
    flights: Arc<DashMap<ViewKey, Flight>>,
}

impl RenderCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            store: Arc::new(ViewStore::new(config)),
            flights: Arc::new(DashMap::new()),
        }
    }

    /// Return the composed page for `request`, rendering it at most once per
    /// key no matter how many callers miss concurrently.
    ///
    /// A failed render is handed to every caller that joined it and is not
    /// stored; the next request for the key starts a fresh render.
    pub async fn get_or_render<F, Fut, E>(
        &self,
        request: &ViewRequest,
        render: F,
    ) -> Result<CacheLookup, CacheError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<CacheEntry, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        self.get_or_render_key(ViewKey::for_request(request), render)
            .await
    }

    pub async fn get_or_render_key<F, Fut, E>(
        &self,
        key: ViewKey,
        render: F,
    ) -> Result<CacheLookup, CacheError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<CacheEntry, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        if let Some(entry) = self.hit(&key) {
            return Ok(entry);
        }

        let (flight, outcome) = match self.flights.entry(key.clone()) {
            Entry::Occupied(pending) => (pending.get().clone(), CacheOutcome::Joined),
            Entry::Vacant(vacant) => {
                // A render may have stored its page and released its flight
                // between the lookup above and taking this shard lock.
                if let Some(entry) = self.hit(&key) {
                    return Ok(entry);
                }
                let flight = self.launch(key.clone(), render());
                vacant.insert(flight.clone());
                (flight, CacheOutcome::Miss)
            }
        };

        match outcome {
            CacheOutcome::Joined => {
                counter!(METRIC_JOIN_TOTAL).increment(1);
                debug!(cache = "view", outcome = "joined", key = %key.name(), "joining in-flight render");
            }
            _ => {
                counter!(METRIC_MISS_TOTAL).increment(1);
                debug!(cache = "view", outcome = "miss", key = %key.name(), "rendering view");
            }
        }

        let entry = flight.await?;
        Ok(CacheLookup { entry, outcome })
    }

    /// Number of stored pages.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Number of renders currently in flight.
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }

    fn hit(&self, key: &ViewKey) -> Option<CacheLookup> {
        let entry = self.store.get(key)?;
        counter!(METRIC_HIT_TOTAL).increment(1);
        debug!(cache = "view", outcome = "hit", key = %key.name(), "serving cached view");
        Some(CacheLookup {
            entry,
            outcome: CacheOutcome::Hit,
        })
    }

    fn launch<Fut, E>(&self, key: ViewKey, render: Fut) -> Flight
    where
        Fut: Future<Output = Result<CacheEntry, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let store = Arc::clone(&self.store);
        let release = FlightRelease {
            key: key.clone(),
            flights: Arc::clone(&self.flights),
        };

        let task = tokio::spawn(async move {
            let started_at = Instant::now();
            let result = render.await;
            histogram!(METRIC_RENDER_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

            let outcome = match result {
                Ok(entry) => {
                    // Stored before the flight is released.
                    store.put(key, entry.clone());
                    Ok(entry)
                }
                Err(err) => {
                    counter!(METRIC_FAILURE_TOTAL).increment(1);
                    warn!(
                        target: "mondrian::cache",
                        view = %key.name(),
                        error = %err,
                        "view render failed; not caching"
                    );
                    Err(CacheError::Render(Arc::new(err)))
                }
            };
            drop(release);
            outcome
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => Err(CacheError::Aborted(join_error.to_string())),
            }
        }
        .boxed()
        .shared()
    }
}

/// Removes a key from the flight table once its render settles, including
/// when the render task unwinds.
struct FlightRelease {
    key: ViewKey,
    flights: Arc<DashMap<ViewKey, Flight>>,
}

impl Drop for FlightRelease {
    fn drop(&mut self) {
        self.flights.remove(&self.key);
    }
}
