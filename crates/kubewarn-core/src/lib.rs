//! Event classification and deduplication engine for Kubewarn.
//!
//! `kubewarn-core` decides which cluster warning events are worth relaying
//! to a chat channel. It normalizes a raw event into a comparable
//! fingerprint, assigns it to a semantic event-type bucket, and consults a
//! short-lived cache keyed by bucket to suppress noisy repeats of the same
//! underlying condition (recurring probe failures, repeated scheduling
//! errors) without silently dropping genuinely new failures.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use kubewarn_core::{Action, DedupCache, DedupEngine, WarningEvent};
//!
//! let engine = DedupEngine::new(DedupCache::default());
//!
//! let event = WarningEvent {
//!     namespace: "prod".into(),
//!     name: "api-6c4f9-xk2p1".into(),
//!     kind: "Pod".into(),
//!     message: "Readiness probe failed: Get http://10.1.2.3:8080/healthz".into(),
//!     reason: "Unhealthy".into(),
//!     first_seen: Utc::now(),
//! };
//!
//! assert_eq!(engine.decide(&event).action, Action::Notify);
//! assert_eq!(engine.decide(&event).action, Action::Suppress);
//! ```
//!
//! Dedup state lives only in memory: it does not survive restarts and is not
//! shared between replicas, by design.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cache;
pub mod engine;
pub mod fingerprint;
pub mod types;

// Re-export main types at crate root
pub use cache::{run_sweeper, DedupCache, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};
pub use engine::DedupEngine;
pub use types::{Action, Decision, EventType, WarningEvent};
