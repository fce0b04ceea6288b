//! Warning-event watch stream and relay loop for Kubewarn.
//!
//! This crate connects the cluster API server's events watch endpoint to
//! the dedup engine in `kubewarn-core` and the Slack delivery in
//! `kubewarn-notify`:
//!
//! - [`source`] opens and decodes the newline-delimited watch stream, and
//!   abstracts it behind [`EventSource`] so tests can script streams;
//! - [`event`] decodes individual watch lines into [`ParsedEvent`]s;
//! - [`relay`] runs the watch-decide-enqueue loop and the delivery task,
//!   joined by a bounded queue so a slow webhook never stalls the watch.
//!
//! The relay reconnects forever: every stream end or transport failure is
//! followed by a short delay and a fresh "from now" subscription.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod event;
pub mod relay;
pub mod source;

// Re-export main types at crate root
pub use error::{Result, WatchError};
pub use event::{parse_line, ParsedEvent, WatchAction};
pub use relay::{deliver_loop, Relay, RelayConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_RECONNECT_DELAY};
pub use source::{ApiConfig, ApiEventSource, ApiEventStream, EventSource, EventStream};
