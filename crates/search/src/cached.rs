//! Caller-owned result caching
//!
//! The engine keeps no hidden state; callers that want caching pass their own
//! [`ResultCache`]. Keys are a SHA-256 digest of the serialised filter.

use crate::engine::SearchEngine;
use crate::filter::SearchFilter;
use pulse_common::cache::{get_json, keys, set_json, ResultCache};
use pulse_common::metrics::record_cache;
use pulse_common::Paper;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Cache key for a filter
pub fn cache_key(filter: &SearchFilter) -> serde_json::Result<String> {
    let serialized = serde_json::to_string(filter)?;
    let digest = Sha256::digest(serialized.as_bytes());
    Ok(keys::search(&hex::encode(digest)))
}

impl SearchEngine {
    /// [`SearchEngine::search`] through `cache`. Cache failures fall back to
    /// the store; empty results are not cached. A filter without a key
    /// bypasses the cache.
    pub async fn search_cached(&self, filter: &SearchFilter, cache: &dyn ResultCache) -> Vec<Paper> {
        let key = match cache_key(filter) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Search filter has no cache key");
                return self.search(filter).await;
            }
        };

        match get_json::<Vec<Paper>>(cache, &key).await {
            Ok(Some(papers)) => {
                record_cache(true, cache.name());
                debug!(key = %key, "Search cache hit");
                return papers;
            }
            Ok(None) => record_cache(false, cache.name()),
            Err(e) => {
                record_cache(false, cache.name());
                warn!(error = %e, cache = cache.name(), "Search cache read failed");
            }
        }

        let papers = self.search(filter).await;
        if !papers.is_empty() {
            if let Err(e) = set_json(cache, &key, &papers).await {
                warn!(error = %e, cache = cache.name(), "Search cache write failed");
            }
        }
        papers
    }
}
