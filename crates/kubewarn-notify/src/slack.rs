//! Slack webhook notifier.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use kubewarn_core::WarningEvent;

use crate::error::{NotifyError, Result};
use crate::payload::{ConsoleLinks, SlackMessage};

/// A delivery sink for warning events.
///
/// Delivery failures are reported to the caller, which logs them; they are
/// never retried and never fed back into the dedup decision.
pub trait Notifier: Send + Sync {
    /// Delivers one event.
    fn deliver(&self, event: &WarningEvent) -> impl Future<Output = Result<()>> + Send;
}

/// Configuration for the Slack webhook notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackConfig {
    /// The incoming-webhook URL to POST to.
    pub webhook_url: String,
    /// Timeout for webhook requests in seconds.
    pub timeout_secs: u64,
}

impl SlackConfig {
    /// Creates a configuration with the default 10 second timeout.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::InvalidConfig` if the URL is empty.
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let webhook_url = webhook_url.into();
        if webhook_url.is_empty() {
            return Err(NotifyError::InvalidConfig {
                reason: "webhook URL cannot be empty".to_string(),
            });
        }

        Ok(Self {
            webhook_url,
            timeout_secs: 10,
        })
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Sends warning events to a Slack incoming webhook as attachment messages.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    config: SlackConfig,
    links: ConsoleLinks,
}

impl SlackNotifier {
    /// Creates a notifier from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Http` if the HTTP client cannot be built.
    pub fn new(config: SlackConfig, links: ConsoleLinks) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            links,
        })
    }

    /// Returns the configured webhook URL.
    #[must_use]
    pub fn webhook_url(&self) -> &str {
        &self.config.webhook_url
    }
}

impl Notifier for SlackNotifier {
    async fn deliver(&self, event: &WarningEvent) -> Result<()> {
        let message = SlackMessage::for_event(event, &self.links);

        let response = self
            .client
            .post(&self.config.webhook_url)
            .header("Content-Type", "application/json")
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
            });
        }

        debug!(
            namespace = %event.namespace,
            name = %event.name,
            reason = %event.reason,
            "delivered webhook notification"
        );

        Ok(())
    }
}
