//! Error types for the kubewarn-notify crate.

use thiserror::Error;

/// Errors that can occur while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Invalid notifier configuration.
    #[error("invalid notifier config: {reason}")]
    InvalidConfig {
        /// The reason the configuration is invalid.
        reason: String,
    },

    /// The HTTP request itself failed (connect, timeout, TLS, ...).
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook endpoint answered with a non-success status.
    #[error("webhook returned status {status}")]
    Status {
        /// The HTTP status code returned.
        status: u16,
    },
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_config() {
        let err = NotifyError::InvalidConfig {
            reason: "webhook URL cannot be empty".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid notifier config: webhook URL cannot be empty"
        );
    }

    #[test]
    fn error_display_status() {
        let err = NotifyError::Status { status: 503 };
        assert_eq!(err.to_string(), "webhook returned status 503");
    }
}
