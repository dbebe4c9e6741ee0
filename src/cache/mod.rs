//! Mondrian view cache.
//!
//! Maps `(view name, property fingerprint)` to a fully assembled page. A miss
//! triggers exactly one render per key; concurrent requests for the same key
//! wait on that render instead of starting their own.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! max_entries = 512   # optional; unbounded when omitted
//! ```
//!
//! Entries are never invalidated while the process runs. A deploy that changes
//! the page shell or the renderer bundle is picked up on restart.

mod config;
mod keys;
mod render_cache;
mod store;

pub use config::CacheConfig;
pub use keys::{FINGERPRINT_LEN, Fingerprint, ViewKey, fingerprint, fingerprint_json};
pub use render_cache::{CacheError, CacheLookup, CacheOutcome, RenderCache};
pub use store::{CacheEntry, ViewStore};
