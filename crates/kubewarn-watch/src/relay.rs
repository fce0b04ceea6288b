//! The relay loop: watch, deduplicate, enqueue for delivery.
//!
//! A [`Relay`] owns one [`EventSource`] and the [`DedupEngine`]. It is the
//! only task that calls `decide`, so cache reads and writes stay ordered.
//! Events that warrant a notification are pushed onto a bounded queue and
//! delivered by [`deliver_loop`] on a separate task, keeping slow webhook
//! calls out of the stream consumption path.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use kubewarn_core::{DedupEngine, WarningEvent};
use kubewarn_notify::Notifier;

use crate::error::{Result, WatchError};
use crate::event::WatchAction;
use crate::source::{EventSource, EventStream};

/// Default delay before reopening a broken watch stream.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default capacity of the delivery queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Tuning knobs for the relay loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// How long to wait before resubscribing after the stream ends.
    pub reconnect_delay: Duration,
    /// Capacity of the bounded delivery queue.
    pub queue_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Consumes a watch stream and routes novel warnings to the delivery queue.
pub struct Relay<S: EventSource> {
    source: S,
    engine: DedupEngine,
    config: RelayConfig,
    started_at: DateTime<Utc>,
}

impl<S: EventSource> Relay<S> {
    /// Creates a relay that drops events first observed before now.
    #[must_use]
    pub fn new(source: S, engine: DedupEngine, config: RelayConfig) -> Self {
        Self {
            source,
            engine,
            config,
            started_at: Utc::now(),
        }
    }

    /// Overrides the start-time cutoff for backfill filtering.
    #[must_use]
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Runs the watch loop until the delivery queue closes.
    ///
    /// Every stream termination, transport error, and failed subscription
    /// is logged and followed by a reconnect delay; the watch always
    /// resumes "from now".
    ///
    /// # Errors
    ///
    /// Returns `WatchError::QueueClosed` once the receiving side of the
    /// delivery queue is dropped.
    pub async fn run(&self, tx: mpsc::Sender<WarningEvent>) -> Result<()> {
        loop {
            match self.source.subscribe().await {
                Ok(stream) => match self.consume(stream, &tx).await {
                    Ok(()) => warn!("watch stream ended, reconnecting"),
                    Err(WatchError::QueueClosed) => return Err(WatchError::QueueClosed),
                    Err(e) => warn!(error = %e, "watch stream failed, reconnecting"),
                },
                Err(e) => warn!(error = %e, "watch subscription failed, retrying"),
            }

            tokio::time::sleep(self.config.reconnect_delay).await;
        }
    }

    /// Drains one stream, enqueueing every event the engine decides to
    /// notify on. Returns when the stream ends or breaks.
    async fn consume(
        &self,
        mut stream: S::Stream,
        tx: &mpsc::Sender<WarningEvent>,
    ) -> Result<()> {
        while let Some(item) = stream.next_event().await {
            let parsed = match item {
                Ok(parsed) => parsed,
                Err(WatchError::Parse { reason }) => {
                    warn!(reason, "skipping malformed watch line");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if parsed.action == WatchAction::Error {
                warn!("watch stream reported an error object, resubscribing");
                return Ok(());
            }
            if !parsed.is_warning() {
                continue;
            }
            if parsed.event.first_seen < self.started_at {
                debug!(
                    namespace = %parsed.event.namespace,
                    name = %parsed.event.name,
                    "dropping event first seen before startup"
                );
                continue;
            }

            let decision = self.engine.decide(&parsed.event);
            if decision.is_notify() {
                info!(
                    fingerprint = %decision.fingerprint,
                    event_type = %decision.event_type,
                    namespace = %parsed.event.namespace,
                    reason = %parsed.event.reason,
                    "novel warning, queueing notification"
                );
                tx.send(parsed.event)
                    .await
                    .map_err(|_| WatchError::QueueClosed)?;
            } else {
                debug!(
                    fingerprint = %decision.fingerprint,
                    event_type = %decision.event_type,
                    "suppressing repeated warning"
                );
            }
        }

        Ok(())
    }
}

/// Delivers queued events until the sending side closes.
///
/// Delivery failures are logged and dropped; there is no retry, the next
/// novel occurrence of the same warning will notify again once its cache
/// entry expires.
pub async fn deliver_loop<N: Notifier>(mut rx: mpsc::Receiver<WarningEvent>, notifier: N) {
    while let Some(event) = rx.recv().await {
        match notifier.deliver(&event).await {
            Ok(()) => info!(
                namespace = %event.namespace,
                name = %event.name,
                reason = %event.reason,
                "notification delivered"
            ),
            Err(e) => warn!(
                error = %e,
                namespace = %event.namespace,
                name = %event.name,
                "notification delivery failed"
            ),
        }
    }
}

#[cfg(test)]
mod relay_tests {
    use super::*;
    use crate::event::ParsedEvent;
    use crate::source::ScriptedSource;
    use std::future::Future;

    fn warning(namespace: &str, name: &str, message: &str) -> ParsedEvent {
        ParsedEvent {
            action: WatchAction::Added,
            severity: "Warning".to_string(),
            event: WarningEvent {
                namespace: namespace.to_string(),
                name: name.to_string(),
                kind: "Pod".to_string(),
                message: message.to_string(),
                reason: "Unhealthy".to_string(),
                first_seen: Utc::now(),
            },
        }
    }

    fn relay_for(items: Vec<Result<ParsedEvent>>) -> Relay<ScriptedSource> {
        let source = ScriptedSource::new(vec![items]);
        Relay::new(source, DedupEngine::default(), RelayConfig::default())
            .with_started_at(DateTime::<Utc>::MIN_UTC)
    }

    async fn drain(relay: &Relay<ScriptedSource>) -> Vec<WarningEvent> {
        let (tx, mut rx) = mpsc::channel(16);
        let stream = relay.source.subscribe().await.expect("subscribe");
        relay.consume(stream, &tx).await.expect("consume");
        drop(tx);

        let mut out = Vec::new();
        while let Some(event) = rx.recv().await {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn novel_warning_is_queued() {
        let relay = relay_for(vec![Ok(warning("prod", "api-1", "Back-off restarting"))]);
        let queued = drain(&relay).await;

        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].namespace, "prod");
    }

    #[tokio::test]
    async fn repeated_warning_is_suppressed() {
        let relay = relay_for(vec![
            Ok(warning("prod", "api-1", "Back-off restarting")),
            Ok(warning("prod", "api-1", "Back-off restarting")),
            Ok(warning("prod", "api-1", "Back-off restarting")),
        ]);

        assert_eq!(drain(&relay).await.len(), 1);
    }

    #[tokio::test]
    async fn normal_events_are_ignored() {
        let mut normal = warning("prod", "api-1", "Pulled image");
        normal.severity = "Normal".to_string();
        let relay = relay_for(vec![Ok(normal)]);

        assert!(drain(&relay).await.is_empty());
    }

    #[tokio::test]
    async fn events_before_startup_are_dropped() {
        let old = warning("prod", "api-1", "Back-off restarting");
        let source = ScriptedSource::new(vec![vec![Ok(old)]]);
        let relay = Relay::new(source, DedupEngine::default(), RelayConfig::default())
            .with_started_at(Utc::now() + chrono::Duration::hours(1));

        assert!(drain(&relay).await.is_empty());
    }

    #[tokio::test]
    async fn parse_errors_do_not_stop_the_stream() {
        let relay = relay_for(vec![
            Err(WatchError::Parse {
                reason: "bad json".to_string(),
            }),
            Ok(warning("prod", "api-1", "Back-off restarting")),
        ]);

        assert_eq!(drain(&relay).await.len(), 1);
    }

    #[tokio::test]
    async fn error_action_ends_the_stream_cleanly() {
        let mut error_line = warning("", "", "");
        error_line.action = WatchAction::Error;
        let relay = relay_for(vec![
            Ok(error_line),
            Ok(warning("prod", "api-1", "never consumed")),
        ]);

        // consume returns Ok so run() resubscribes; nothing was queued.
        assert!(drain(&relay).await.is_empty());
    }

    #[tokio::test]
    async fn transport_errors_bubble_up() {
        let source = ScriptedSource::new(vec![vec![Err(WatchError::Status { status: 410 })]]);
        let relay = Relay::new(source, DedupEngine::default(), RelayConfig::default())
            .with_started_at(DateTime::<Utc>::MIN_UTC);

        let (tx, _rx) = mpsc::channel(16);
        let stream = relay.source.subscribe().await.expect("subscribe");
        let result = relay.consume(stream, &tx).await;

        assert!(matches!(result, Err(WatchError::Status { status: 410 })));
    }

    #[tokio::test]
    async fn closed_queue_surfaces_as_queue_closed() {
        let relay = relay_for(vec![Ok(warning("prod", "api-1", "Back-off restarting"))]);

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let stream = relay.source.subscribe().await.expect("subscribe");
        let result = relay.consume(stream, &tx).await;

        assert!(matches!(result, Err(WatchError::QueueClosed)));
    }

    #[tokio::test]
    async fn run_resubscribes_after_stream_end() {
        let source = ScriptedSource::new(vec![
            vec![Ok(warning("prod", "api-1", "Back-off restarting"))],
            vec![Ok(warning("staging", "web-1", "Failed to pull image"))],
        ]);
        let config = RelayConfig {
            reconnect_delay: Duration::from_millis(5),
            ..RelayConfig::default()
        };
        let relay = Relay::new(source, DedupEngine::default(), config)
            .with_started_at(DateTime::<Utc>::MIN_UTC);

        let (tx, mut rx) = mpsc::channel(16);
        let run = tokio::spawn(async move {
            let _ = relay.run(tx).await;
        });

        let first = rx.recv().await.expect("first notification");
        assert_eq!(first.namespace, "prod");
        let second = rx.recv().await.expect("second notification");
        assert_eq!(second.namespace, "staging");

        run.abort();
    }

    struct RecordingNotifier {
        delivered: parking_lot::Mutex<Vec<String>>,
        fail: bool,
    }

    impl Notifier for &RecordingNotifier {
        fn deliver(
            &self,
            event: &WarningEvent,
        ) -> impl Future<Output = kubewarn_notify::Result<()>> + Send {
            let name = event.name.clone();
            async move {
                if self.fail {
                    return Err(kubewarn_notify::NotifyError::Status { status: 500 });
                }
                self.delivered.lock().push(name);
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn deliver_loop_drains_the_queue() {
        let notifier = RecordingNotifier {
            delivered: parking_lot::Mutex::new(Vec::new()),
            fail: false,
        };
        let (tx, rx) = mpsc::channel(16);

        tx.send(warning("prod", "api-1", "msg").event)
            .await
            .expect("send");
        tx.send(warning("prod", "api-2", "msg").event)
            .await
            .expect("send");
        drop(tx);

        deliver_loop(rx, &notifier).await;

        assert_eq!(*notifier.delivered.lock(), vec!["api-1", "api-2"]);
    }

    #[tokio::test]
    async fn deliver_loop_survives_failures() {
        let notifier = RecordingNotifier {
            delivered: parking_lot::Mutex::new(Vec::new()),
            fail: true,
        };
        let (tx, rx) = mpsc::channel(16);

        tx.send(warning("prod", "api-1", "msg").event)
            .await
            .expect("send");
        drop(tx);

        // Returns normally even though every delivery failed.
        deliver_loop(rx, &notifier).await;
        assert!(notifier.delivered.lock().is_empty());
    }
}
