//! Slack webhook delivery for Kubewarn.
//!
//! `kubewarn-notify` turns a [`kubewarn_core::WarningEvent`] into a Slack
//! attachment message with console deep links and POSTs it to a configured
//! incoming-webhook URL. Delivery is fire-and-forget from the relay's point
//! of view: failures are surfaced to the caller for logging and never
//! retried.
//!
//! # Example
//!
//! ```rust,no_run
//! use kubewarn_notify::{ConsoleLinks, SlackConfig, SlackNotifier};
//!
//! let config = SlackConfig::new("https://hooks.slack.com/services/T/B/x")?;
//! let links = ConsoleLinks::new("https://console.example.com");
//! let notifier = SlackNotifier::new(config, links)?;
//! # Ok::<(), kubewarn_notify::NotifyError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod payload;
pub mod slack;

// Re-export main types at crate root
pub use error::{NotifyError, Result};
pub use payload::{ConsoleLinks, SlackAttachment, SlackField, SlackMessage};
pub use slack::{Notifier, SlackConfig, SlackNotifier};
