//! Event stream sources.
//!
//! [`ApiEventSource`] opens a watch on the cluster API server's core v1
//! events endpoint and yields decoded lines. The [`EventSource`] /
//! [`EventStream`] traits keep the relay loop independent of the transport
//! so it can be driven by scripted sources in tests.

#[cfg(test)]
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tracing::debug;

use crate::error::{Result, WatchError};
use crate::event::{parse_line, ParsedEvent};

/// A subscribable source of watch streams.
///
/// Each call to `subscribe` opens a fresh watch with "from now" semantics;
/// the relay resubscribes after stream termination.
pub trait EventSource: Send + Sync {
    /// The stream type produced by a subscription.
    type Stream: EventStream;

    /// Opens a new watch stream.
    fn subscribe(&self) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// A sequence of decoded watch lines.
pub trait EventStream: Send {
    /// Yields the next line, or `None` when the stream has ended.
    ///
    /// A `WatchError::Parse` item is recoverable; any other error means the
    /// stream is broken and the caller should resubscribe.
    fn next_event(&mut self) -> impl Future<Output = Option<Result<ParsedEvent>>> + Send;
}

/// Connection settings for the cluster API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL of the API server (e.g. `https://10.96.0.1:443`).
    pub base_url: String,
    /// Bearer token, typically the pod's service account token.
    pub token: Option<String>,
    /// Skip TLS verification of the API server certificate.
    ///
    /// Only for clusters whose CA is not in the trust store; the in-cluster
    /// service account CA bundle is the better option when available.
    pub insecure: bool,
}

/// Watches warning events via the Kubernetes API.
#[derive(Debug, Clone)]
pub struct ApiEventSource {
    client: reqwest::Client,
    config: ApiConfig,
}

impl ApiEventSource {
    /// Creates a source for the given API server.
    ///
    /// # Errors
    ///
    /// Returns `WatchError::Http` if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            // Watches are long-lived; only bound the connect phase.
            .connect_timeout(Duration::from_secs(10))
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        Ok(Self { client, config })
    }

    fn watch_url(&self) -> String {
        format!("{}/api/v1/events", self.config.base_url.trim_end_matches('/'))
    }
}

impl EventSource for ApiEventSource {
    type Stream = ApiEventStream;

    async fn subscribe(&self) -> Result<ApiEventStream> {
        let mut request = self
            .client
            .get(self.watch_url())
            .query(&[("watch", "true"), ("fieldSelector", "type=Warning")]);

        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::Status {
                status: status.as_u16(),
            });
        }

        debug!(url = %self.watch_url(), "watch stream opened");

        Ok(ApiEventStream {
            body: Box::pin(response.bytes_stream()),
            buffer: Vec::new(),
            ended: false,
        })
    }
}

/// A live watch stream, decoded line by line.
pub struct ApiEventStream {
    body: Pin<Box<dyn Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>,
    buffer: Vec<u8>,
    ended: bool,
}

impl ApiEventStream {
    /// Pops the next complete line out of the buffer, if any.
    fn take_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop(); // the newline itself
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

impl EventStream for ApiEventStream {
    async fn next_event(&mut self) -> Option<Result<ParsedEvent>> {
        loop {
            if let Some(line) = self.take_line() {
                if line.trim().is_empty() {
                    continue;
                }
                return Some(parse_line(&line));
            }

            if self.ended {
                return None;
            }

            match self.body.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    self.ended = true;
                    return Some(Err(WatchError::Http(e)));
                }
                None => {
                    // Flush a trailing unterminated line before ending.
                    self.ended = true;
                    if !self.buffer.is_empty() {
                        self.buffer.push(b'\n');
                    }
                }
            }
        }
    }
}

/// A scripted event source for tests: each subscription yields the next
/// prepared batch of items.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ScriptedSource {
    batches: parking_lot::Mutex<VecDeque<Vec<Result<ParsedEvent>>>>,
    subscriptions: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl ScriptedSource {
    /// Creates a source that plays back the given batches in order.
    ///
    /// Once the batches run out, subscriptions yield empty streams.
    #[must_use]
    pub(crate) fn new(batches: Vec<Vec<Result<ParsedEvent>>>) -> Self {
        Self {
            batches: parking_lot::Mutex::new(batches.into()),
            subscriptions: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Number of times `subscribe` was called.
    #[must_use]
    pub(crate) fn subscription_count(&self) -> usize {
        self.subscriptions.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl EventSource for ScriptedSource {
    type Stream = ScriptedStream;

    async fn subscribe(&self) -> Result<ScriptedStream> {
        self.subscriptions
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let items = self.batches.lock().pop_front().unwrap_or_default();
        Ok(ScriptedStream {
            items: items.into(),
        })
    }
}

/// The stream type of [`ScriptedSource`].
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ScriptedStream {
    items: VecDeque<Result<ParsedEvent>>,
}

#[cfg(test)]
impl EventStream for ScriptedStream {
    async fn next_event(&mut self) -> Option<Result<ParsedEvent>> {
        self.items.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::WatchAction;
    use chrono::Utc;
    use kubewarn_core::WarningEvent;

    fn parsed(message: &str) -> ParsedEvent {
        ParsedEvent {
            action: WatchAction::Added,
            severity: "Warning".to_string(),
            event: WarningEvent {
                namespace: "prod".to_string(),
                name: "api-1".to_string(),
                kind: "Pod".to_string(),
                message: message.to_string(),
                reason: "Unhealthy".to_string(),
                first_seen: Utc::now(),
            },
        }
    }

    #[test]
    fn watch_url_has_no_double_slash() {
        let source = ApiEventSource::new(ApiConfig {
            base_url: "https://10.96.0.1:443/".to_string(),
            token: None,
            insecure: false,
        })
        .expect("source");

        assert_eq!(source.watch_url(), "https://10.96.0.1:443/api/v1/events");
    }

    #[tokio::test]
    async fn scripted_source_plays_batches_in_order() {
        let source = ScriptedSource::new(vec![
            vec![Ok(parsed("first"))],
            vec![Ok(parsed("second"))],
        ]);

        let mut stream = source.subscribe().await.expect("subscribe");
        let item = stream.next_event().await.expect("item").expect("ok");
        assert_eq!(item.event.message, "first");
        assert!(stream.next_event().await.is_none());

        let mut stream = source.subscribe().await.expect("subscribe");
        let item = stream.next_event().await.expect("item").expect("ok");
        assert_eq!(item.event.message, "second");

        assert_eq!(source.subscription_count(), 2);
    }

    #[tokio::test]
    async fn exhausted_scripted_source_yields_empty_streams() {
        let source = ScriptedSource::new(vec![]);
        let mut stream = source.subscribe().await.expect("subscribe");
        assert!(stream.next_event().await.is_none());
    }
}
