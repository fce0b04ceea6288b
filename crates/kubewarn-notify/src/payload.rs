//! Slack attachment payload and console link building.
//!
//! The message format follows the Slack incoming-webhook attachment schema:
//! one warning-colored attachment per event, with the namespace as author,
//! the involved object as title, and Reason/Kind as short fields.

use serde::{Deserialize, Serialize};

use kubewarn_core::WarningEvent;

/// Builds console deep links for an event.
///
/// Links point into the cluster web console: the attachment title links to
/// the involved resource, the author line to the namespace monitoring page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLinks {
    base_url: String,
}

impl ConsoleLinks {
    /// Creates a link builder rooted at the given console base URL.
    ///
    /// A trailing slash on the base URL is ignored.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// URL of the involved object in the console.
    ///
    /// The object kind is lower-cased and pluralized the way the console
    /// routes resources (`Pod` -> `pods`).
    #[must_use]
    pub fn resource_url(&self, event: &WarningEvent) -> String {
        format!(
            "{}/project/{}/browse/{}s/{}",
            self.base_url,
            event.namespace,
            event.kind.to_lowercase(),
            event.name
        )
    }

    /// URL of the namespace monitoring page in the console.
    #[must_use]
    pub fn monitoring_url(&self, event: &WarningEvent) -> String {
        format!("{}/project/{}/monitoring", self.base_url, event.namespace)
    }
}

/// A short key/value field inside an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackField {
    /// Field label.
    pub title: String,
    /// Field value.
    pub value: String,
    /// Whether the field is short enough to render side by side.
    pub short: bool,
}

/// A single Slack message attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackAttachment {
    /// Attachment color ("warning" for everything this service sends).
    pub color: String,
    /// Author line text (the event namespace).
    pub author_name: String,
    /// Author line link (namespace monitoring page).
    pub author_link: String,
    /// Attachment title (the involved object name).
    pub title: String,
    /// Title link (the involved object in the console).
    pub title_link: String,
    /// Attachment body (the raw event message).
    pub text: String,
    /// Reason and Kind fields.
    pub fields: Vec<SlackField>,
}

/// The top-level webhook document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMessage {
    /// The attachments to render; always exactly one per event.
    pub attachments: Vec<SlackAttachment>,
}

impl SlackMessage {
    /// Builds the webhook payload for a warning event.
    #[must_use]
    pub fn for_event(event: &WarningEvent, links: &ConsoleLinks) -> Self {
        Self {
            attachments: vec![SlackAttachment {
                color: "warning".to_string(),
                author_name: event.namespace.clone(),
                author_link: links.monitoring_url(event),
                title: event.name.clone(),
                title_link: links.resource_url(event),
                text: event.message.clone(),
                fields: vec![
                    SlackField {
                        title: "Reason".to_string(),
                        value: event.reason.clone(),
                        short: true,
                    },
                    SlackField {
                        title: "Kind".to_string(),
                        value: event.kind.clone(),
                        short: true,
                    },
                ],
            }],
        }
    }
}
