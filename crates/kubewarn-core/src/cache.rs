//! Time-bounded dedup cache.
//!
//! Maps an [`EventType`] bucket to the last fingerprint seen for it. Entries
//! expire a fixed TTL after insertion regardless of reads; expiry is checked
//! lazily on read and enforced by a periodic background sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use crate::types::EventType;

/// Default entry time-to-live.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Default interval between background expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
struct Entry {
    fingerprint: String,
    inserted_at: Instant,
}

/// Thread-safe fingerprint cache with one slot per event-type bucket.
///
/// Cloning shares the underlying storage, so the decision engine and the
/// sweeper task can hold handles to the same cache. `get`/`set` are
/// individually atomic; the get-then-set pair is not, which is fine as long
/// as a single task makes decisions for any given bucket.
#[derive(Debug)]
pub struct DedupCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<EventType, Entry>>>,
}

impl DedupCache {
    /// Creates a cache whose entries live for `ttl` after insertion.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the configured time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached fingerprint for a bucket, if present and unexpired.
    #[must_use]
    pub fn get(&self, event_type: EventType) -> Option<String> {
        let entries = self.entries.read();
        entries
            .get(&event_type)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| entry.fingerprint.clone())
    }

    /// Stores a fingerprint for a bucket, replacing any previous entry and
    /// restarting its TTL.
    pub fn set(&self, event_type: EventType, fingerprint: impl Into<String>) {
        let mut entries = self.entries.write();
        entries.insert(
            event_type,
            Entry {
                fingerprint: fingerprint.into(),
                inserted_at: Instant::now(),
            },
        );
    }

    /// Removes all entries whose TTL has elapsed.
    ///
    /// Reads already ignore expired entries; this frees their memory.
    pub fn expire_old_entries(&self) {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);

        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "expired cache entries");
        }
    }

    /// Returns the number of entries, including any not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Clone for DedupCache {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            entries: Arc::clone(&self.entries),
        }
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Runs periodic expiry sweeps until the task is cancelled.
pub async fn run_sweeper(cache: DedupCache, sweep_interval: Duration) {
    let mut ticker = tokio::time::interval(sweep_interval);
    // The first tick fires immediately; skip it so a sweep only happens
    // after a full interval has passed.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        cache.expire_old_entries();
    }
}
