//! Error types for the kubewarn-watch crate.

use thiserror::Error;

/// Errors that can occur while watching the event stream.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The watch request or the underlying transport failed.
    #[error("watch request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API server rejected the watch request.
    #[error("watch request returned status {status}")]
    Status {
        /// The HTTP status code returned.
        status: u16,
    },

    /// A single watch line could not be decoded.
    ///
    /// Recoverable: the relay logs it and keeps consuming the stream.
    #[error("malformed watch line: {reason}")]
    Parse {
        /// Why decoding failed.
        reason: String,
    },

    /// The delivery queue is gone; the process is shutting down.
    #[error("delivery queue closed")]
    QueueClosed,
}

/// Result type for watch operations.
pub type Result<T> = std::result::Result<T, WatchError>;
