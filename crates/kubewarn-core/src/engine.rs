//! The notify-or-suppress decision engine.

use tracing::debug;

use crate::cache::DedupCache;
use crate::fingerprint;
use crate::types::{Action, Decision, EventType, WarningEvent};

/// Decides whether an incoming warning event is novel enough to notify on.
///
/// The engine owns no state of its own; all dedup state lives in the
/// [`DedupCache`] it was constructed with. For a fixed bucket only the most
/// recently seen distinct fingerprint is remembered: two different novel
/// fingerprints arriving close together both notify (the second overwrites
/// the first), while an exact repeat of the cached one is suppressed until
/// the entry's TTL elapses.
///
/// Decisions mutate the cache, so events for a given bucket must be decided
/// from a single task to keep the get-then-set sequence effectively atomic.
#[derive(Debug, Clone)]
pub struct DedupEngine {
    cache: DedupCache,
}

impl Default for DedupEngine {
    /// An engine backed by a cache with the default TTL.
    fn default() -> Self {
        Self::new(DedupCache::default())
    }
}

impl DedupEngine {
    /// Creates an engine backed by the given cache.
    #[must_use]
    pub const fn new(cache: DedupCache) -> Self {
        Self { cache }
    }

    /// Returns a handle to the underlying cache.
    #[must_use]
    pub fn cache(&self) -> DedupCache {
        self.cache.clone()
    }

    /// Classifies and fingerprints the event, then decides notify-or-suppress.
    ///
    /// Cache mutation happens only on notify: a miss creates the bucket
    /// entry, a differing fingerprint overwrites it. Suppression leaves the
    /// cache untouched, so the original entry's TTL keeps running.
    pub fn decide(&self, event: &WarningEvent) -> Decision {
        let fingerprint = fingerprint::build(&event.namespace, &event.name, &event.message);
        let event_type = EventType::classify(&event.message);

        let action = match self.cache.get(event_type) {
            None => {
                debug!(bucket = %event_type, fingerprint = %fingerprint, "no cached fingerprint, notifying");
                self.cache.set(event_type, fingerprint.clone());
                Action::Notify
            }
            Some(cached) if cached != fingerprint => {
                debug!(
                    bucket = %event_type,
                    cached = %cached,
                    fingerprint = %fingerprint,
                    "fingerprint differs from cached, notifying"
                );
                self.cache.set(event_type, fingerprint.clone());
                Action::Notify
            }
            Some(_) => {
                debug!(bucket = %event_type, fingerprint = %fingerprint, "identical fingerprint cached, suppressing");
                Action::Suppress
            }
        };

        Decision {
            action,
            fingerprint,
            event_type,
        }
    }
}
