//! Transport-independent event dispatch
//!
//! The adapter receives connection and message events from a transport,
//! runs them through the injected [`MessageHandler`] and forwards any
//! resulting alert batch to the [`AlertSink`]. It never stops on a bad
//! message: decode and publish failures are logged, counted and dropped.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};

use super::handler::MessageHandler;
use super::sink::{AlertSink, Delivery};
use crate::alerts::AlertNotifier;

/// Events delivered by a transport
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Connected,
    Disconnected { reason: String },
    Message { topic: String, payload: Vec<u8> },
}

/// Counters exposed through the health API
#[derive(Debug, Default, Clone, Serialize)]
pub struct AdapterStats {
    pub connected: bool,
    pub connections: u64,
    pub reconnects: u64,
    pub messages_received: u64,
    pub messages_processed: u64,
    pub decode_errors: u64,
    pub alerts_published: u64,
    pub publish_errors: u64,
    pub retries_pending: u64,
    pub retries_dropped: u64,
}

pub type SharedStats = Arc<RwLock<AdapterStats>>;

/// Dispatches channel events to a message handler
pub struct ChannelAdapter {
    handler: Arc<dyn MessageHandler>,
    sink: AlertSink,
    notifier: AlertNotifier,
    stats: SharedStats,
}

impl ChannelAdapter {
    pub fn new(handler: Arc<dyn MessageHandler>, sink: AlertSink) -> Self {
        Self {
            handler,
            sink,
            notifier: AlertNotifier::new(),
            stats: Arc::new(RwLock::new(AdapterStats::default())),
        }
    }

    /// Get current statistics
    pub fn stats(&self) -> AdapterStats {
        self.stats.read().clone()
    }

    /// Shared handle to the live statistics
    pub fn stats_handle(&self) -> SharedStats {
        Arc::clone(&self.stats)
    }

    pub fn sink(&self) -> &AlertSink {
        &self.sink
    }

    /// Process a single event
    pub fn dispatch(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => self.on_connected(),
            ChannelEvent::Disconnected { reason } => self.on_disconnected(&reason),
            ChannelEvent::Message { topic, payload } => self.process_message(&topic, &payload),
        }
    }

    fn on_connected(&self) {
        {
            let mut s = self.stats.write();
            if s.connections > 0 {
                s.reconnects += 1;
            }
            s.connections += 1;
            s.connected = true;
        }

        self.handler.on_connected();
        self.flush_pending();
    }

    fn on_disconnected(&self, reason: &str) {
        let was_connected = {
            let mut s = self.stats.write();
            std::mem::replace(&mut s.connected, false)
        };
        if was_connected {
            tracing::warn!(reason = %reason, "Connection lost, waiting for reconnect");
        }
    }

    /// Decode, evaluate and publish one inbound message
    pub fn process_message(&self, topic: &str, payload: &[u8]) {
        self.stats.write().messages_received += 1;

        let batch = match self.handler.on_message(topic, payload) {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(
                    topic = %topic,
                    payload = %String::from_utf8_lossy(payload),
                    error = %e,
                    "Failed to process message"
                );
                self.stats.write().decode_errors += 1;
                return;
            }
        };

        self.stats.write().messages_processed += 1;

        let Some(batch) = batch else {
            tracing::trace!(topic = %topic, "Reading within range");
            return;
        };

        // Older parked alerts go out first while the link is up
        self.flush_pending();

        match self.sink.send(&batch) {
            Delivery::Published => {
                self.stats.write().alerts_published += 1;
                self.notifier.notify(&batch, self.sink.topic());
            }
            Delivery::Dropped(e) => {
                tracing::error!(
                    topic = %self.sink.topic(),
                    alert_count = batch.violation_count,
                    error = %e,
                    "Failed to publish alert, dropped"
                );
                self.stats.write().publish_errors += 1;
            }
            Delivery::Queued { error, evicted } => {
                tracing::warn!(
                    topic = %self.sink.topic(),
                    alert_count = batch.violation_count,
                    error = %error,
                    "Failed to publish alert, queued for retry"
                );
                let mut s = self.stats.write();
                s.publish_errors += 1;
                s.retries_pending = self.sink.pending() as u64;
                if evicted {
                    tracing::error!("Retry queue full, oldest alert dropped");
                    s.retries_dropped += 1;
                }
            }
            Delivery::Deferred { evicted } => {
                tracing::debug!(
                    topic = %self.sink.topic(),
                    alert_count = batch.violation_count,
                    "Alert queued behind pending retries"
                );
                let mut s = self.stats.write();
                s.retries_pending = self.sink.pending() as u64;
                if evicted {
                    tracing::error!("Retry queue full, oldest alert dropped");
                    s.retries_dropped += 1;
                }
            }
        }
    }

    /// Retry alerts parked by the publish policy
    pub fn flush_pending(&self) {
        if self.sink.pending() == 0 {
            return;
        }

        let report = self.sink.flush();
        if report.published > 0 || report.dropped > 0 {
            tracing::info!(
                published = report.published,
                dropped = report.dropped,
                pending = report.pending,
                "Flushed retry queue"
            );
        }

        let mut s = self.stats.write();
        s.alerts_published += report.published as u64;
        s.retries_dropped += report.dropped as u64;
        s.retries_pending = report.pending as u64;
    }
}

/// Bounded pool of tasks processing inbound messages in parallel.
///
/// Alerts for different readings may be published out of order.
pub struct WorkerPool {
    tx: mpsc::Sender<(String, Vec<u8>)>,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` tasks fed by a queue of `capacity` messages
    pub fn start(adapter: Arc<ChannelAdapter>, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<(String, Vec<u8>)>(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers.max(1))
            .map(|id| {
                let adapter = Arc::clone(&adapter);
                let rx = Arc::clone(&rx);
                tokio::spawn(async move {
                    tracing::debug!(worker = id, "Worker started");
                    loop {
                        let next = rx.lock().await.recv().await;
                        match next {
                            Some((topic, payload)) => adapter.process_message(&topic, &payload),
                            None => break,
                        }
                    }
                    tracing::debug!(worker = id, "Worker stopped");
                })
            })
            .collect();

        Self { tx, handles }
    }

    /// Queue a message, waiting while the queue is full
    pub async fn submit(&self, topic: String, payload: Vec<u8>) -> bool {
        self.tx.send((topic, payload)).await.is_ok()
    }

    /// Stop accepting messages and wait for in-flight work
    pub async fn shutdown(self) {
        drop(self.tx);
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Worker task failed");
            }
        }
    }
}
