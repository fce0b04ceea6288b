//! Core event and decision types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A warning-level cluster event, reduced to the fields the dedup engine
/// consumes.
///
/// The upstream event object carries far more; everything beyond these six
/// fields is deliberately not decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningEvent {
    /// Namespace of the involved object.
    pub namespace: String,
    /// Name of the involved object (e.g. a pod name with template suffixes).
    pub name: String,
    /// Kind of the involved object (e.g. `Pod`).
    pub kind: String,
    /// Free-text event message.
    pub message: String,
    /// Machine-readable reason code (e.g. `Unhealthy`, `FailedScheduling`).
    pub reason: String,
    /// When the event was first observed by the cluster.
    pub first_seen: DateTime<Utc>,
}

/// Semantic event-type bucket, used as the dedup cache key.
///
/// Derived from the first word of the event message. The mapping is a
/// heuristic over the known warning message shapes; anything unrecognized
/// lands in [`EventType::Undefined`], which acts as a single shared bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Readiness or liveness probe failures.
    ReadinessLiveness,
    /// Scheduling failures ("No nodes are available ...").
    NoNodesAvailable,
    /// Memory pressure evictions ("wanted to free ...").
    WantedToFreeMemory,
    /// Any message that matches none of the known shapes.
    Undefined,
}

impl EventType {
    /// Classifies a message by its first whitespace-delimited token.
    ///
    /// An empty message classifies as [`EventType::Undefined`].
    #[must_use]
    pub fn classify(message: &str) -> Self {
        match message.split_whitespace().next() {
            Some("Readiness" | "Liveness") => Self::ReadinessLiveness,
            Some("No") => Self::NoNodesAvailable,
            Some("wanted") => Self::WantedToFreeMemory,
            _ => Self::Undefined,
        }
    }

    /// Returns the stable string label for this bucket.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadinessLiveness => "Readiness_Liveness",
            Self::NoNodesAvailable => "No_nodes_available",
            Self::WantedToFreeMemory => "wanted_to_free_memory",
            Self::Undefined => "undefined",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a dedup decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The event is novel enough to deliver.
    Notify,
    /// The event repeats the cached fingerprint for its bucket.
    Suppress,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notify => write!(f, "notify"),
            Self::Suppress => write!(f, "suppress"),
        }
    }
}

/// A dedup decision together with the values it was based on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether to notify or suppress.
    pub action: Action,
    /// The fingerprint computed for the event.
    pub fingerprint: String,
    /// The bucket the event was classified into.
    pub event_type: EventType,
}

impl Decision {
    /// Returns `true` if the decision is to notify.
    #[must_use]
    pub const fn is_notify(&self) -> bool {
        matches!(self.action, Action::Notify)
    }
}
