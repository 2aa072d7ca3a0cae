//! Response Cache — short-TTL memoization of orchestration results.
//!
//! Expiry is lazy: an expired entry is removed when it is read, never swept.
//! There is no size bound, so memory grows with the number of distinct keys
//! for the life of the process.
//!
//! Keys are built from request content only. Two users who submit
//! byte-identical text share one entry.

use std::time::Duration;

use moka::sync::Cache as MokaCache;
use serde::Serialize;
use tokio::time::Instant;

use crate::ai_client::Operation;
use crate::models::resume::{InitialResult, RefinementResult};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// A cached orchestration result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CachedResponse {
    Initial(InitialResult),
    Refinement(RefinementResult),
}

/// Cache entry stored in moka
#[derive(Debug, Clone)]
struct CacheEntry {
    data: CachedResponse,
    created_at: Instant,
}

/// Introspection counters for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    /// Rough footprint: key bytes plus serialized payload bytes.
    pub approx_size_bytes: usize,
}

/// Cache seam owned by the orchestration client.
/// Implementations must be safe for concurrent use from many requests.
pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &str) -> Option<CachedResponse>;
    fn set(&self, key: String, data: CachedResponse);
    fn clear(&self);
    fn stats(&self) -> CacheStats;
}

/// Builds the canonical key: operation name, then `name:value` fields sorted by name.
pub fn cache_key(operation: Operation, fields: &[(&str, &str)]) -> String {
    let mut sorted = fields.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut key = operation.as_str().to_string();
    for (name, value) in sorted {
        key.push('|');
        key.push_str(name);
        key.push(':');
        key.push_str(value);
    }
    key
}

/// Process-local cache with a fixed TTL.
///
/// The moka store is built without capacity or time-based eviction; expiry is
/// checked here against `created_at` so it follows the tokio clock.
#[derive(Debug)]
pub struct InMemoryResponseCache {
    entries: MokaCache<String, CacheEntry>,
    ttl: Duration,
}

impl InMemoryResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: MokaCache::builder().build(),
            ttl,
        }
    }

    fn is_valid(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.created_at) < self.ttl
    }
}

impl ResponseCache for InMemoryResponseCache {
    fn get(&self, key: &str) -> Option<CachedResponse> {
        let entry = self.entries.get(key)?;
        if self.is_valid(&entry, Instant::now()) {
            return Some(entry.data);
        }

        // A concurrent `set` between the read and this removal only costs a miss.
        self.entries.invalidate(key);
        None
    }

    fn set(&self, key: String, data: CachedResponse) {
        let entry = CacheEntry {
            data,
            created_at: Instant::now(),
        };
        self.entries.insert(key, entry);
    }

    fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut stats = CacheStats {
            total_entries: 0,
            valid_entries: 0,
            expired_entries: 0,
            approx_size_bytes: 0,
        };

        for (key, entry) in self.entries.iter() {
            stats.total_entries += 1;
            if self.is_valid(&entry, now) {
                stats.valid_entries += 1;
            } else {
                stats.expired_entries += 1;
            }
            stats.approx_size_bytes += key.len()
                + serde_json::to_string(&entry.data)
                    .map(|s| s.len())
                    .unwrap_or(0);
        }

        stats
    }
}
