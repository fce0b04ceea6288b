//! Wire decoding of the Kubernetes events watch stream.
//!
//! The watch endpoint emits newline-delimited JSON objects of the form
//! `{"type": "ADDED", "object": {...Event...}}`. Only the handful of fields
//! the dedup engine consumes are decoded; everything else in the upstream
//! Event schema is ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use kubewarn_core::WarningEvent;

use crate::error::{Result, WatchError};

/// The action field of a watch line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchAction {
    /// A new event object.
    Added,
    /// An updated event object (e.g. bumped count).
    Modified,
    /// The event object was removed.
    Deleted,
    /// The server reported a watch-level error.
    Error,
    /// Bookmarks and anything else we do not act on.
    #[serde(other)]
    Other,
}

/// One decoded line of the watch stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEvent {
    /// What happened to the event object.
    pub action: WatchAction,
    /// The upstream severity (`Warning` or `Normal`).
    pub severity: String,
    /// The fields the dedup engine consumes.
    pub event: WarningEvent,
}

impl ParsedEvent {
    /// Returns `true` for warning-severity events.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.severity == "Warning"
    }
}

#[derive(Debug, Deserialize)]
struct WatchLine {
    #[serde(rename = "type")]
    action: WatchAction,
    #[serde(default)]
    object: ApiEvent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    #[serde(default)]
    involved_object: InvolvedObject,
    #[serde(default)]
    message: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    first_timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    severity: String,
}

#[derive(Debug, Default, Deserialize)]
struct InvolvedObject {
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    kind: String,
}

/// Decodes one watch line.
///
/// Missing fields degrade to empty strings; a missing first-observed
/// timestamp decodes as the Unix epoch, which the relay's start-time filter
/// then drops.
///
/// # Errors
///
/// Returns `WatchError::Parse` if the line is not valid JSON in the watch
/// wire shape.
pub fn parse_line(line: &str) -> Result<ParsedEvent> {
    let decoded: WatchLine = serde_json::from_str(line).map_err(|e| WatchError::Parse {
        reason: e.to_string(),
    })?;

    Ok(ParsedEvent {
        action: decoded.action,
        severity: decoded.object.severity,
        event: WarningEvent {
            namespace: decoded.object.involved_object.namespace,
            name: decoded.object.involved_object.name,
            kind: decoded.object.involved_object.kind,
            message: decoded.object.message,
            reason: decoded.object.reason,
            first_seen: decoded.object.first_timestamp.unwrap_or_default(),
        },
    })
}
