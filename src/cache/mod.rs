//! # Response Caching Module
//!
//! In-memory read-through caching for idempotent backend reads (user profile,
//! prompt templates, conversation lists). Streamed chat responses are never
//! cached.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TtlCache`] | Key-value cache with per-entry expiry and substring invalidation |
//! | [`CacheKey`] | Key derived from resolved URL plus canonical request options |
//! | [`CacheStats`] | Hit/miss/set/invalidation counters |
//! | [`shared`] | The process-wide cache used by default |
//!
//! ## Example
//!
//! ```rust
//! use chat_stream_client::cache::{CacheKey, TtlCache};
//! use std::time::Duration;
//!
//! let cache: TtlCache<serde_json::Value> = TtlCache::new();
//! let key = CacheKey::for_request("http://localhost:5000/api/user", &());
//! cache.set(key.clone(), serde_json::json!({"id": "u1"}), Duration::from_secs(300));
//! assert!(cache.has(&key));
//!
//! // Bust every cached read of the user resource.
//! cache.invalidate("/api/user");
//! assert!(!cache.has(&key));
//! ```

mod entry;
mod key;
mod ttl;

pub use key::CacheKey;
pub use ttl::{CacheStats, TtlCache};

use serde_json::Value;
use std::sync::Arc;

static SHARED: once_cell::sync::Lazy<Arc<TtlCache<Value>>> =
    once_cell::sync::Lazy::new(|| Arc::new(TtlCache::new()));

/// Returns the process-wide response cache.
pub fn shared() -> Arc<TtlCache<Value>> {
    SHARED.clone()
}
