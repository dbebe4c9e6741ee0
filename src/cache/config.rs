//! Render cache configuration.
//!
//! Controlled via the `[cache]` table of `mondrian.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! # Omit for a process-lifetime cache with no eviction.
//! max_entries = 512
//! ```

use std::num::NonZeroUsize;

/// Render cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Store composed pages. When disabled, concurrent misses are still
    /// coalesced but nothing is kept afterwards.
    pub enabled: bool,
    /// Upper bound on stored pages; `None` keeps every page for the life of
    /// the process.
    pub max_entries: Option<NonZeroUsize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: None,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            max_entries: settings.max_entries,
        }
    }
}

impl CacheConfig {
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            enabled: true,
            max_entries: NonZeroUsize::new(max_entries),
        }
    }
}
