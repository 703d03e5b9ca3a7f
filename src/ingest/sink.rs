//! Outbound alert publishing
//!
//! The sink serializes alert batches and hands them to a [`Publisher`].
//! What happens when the publisher refuses a batch is decided by the
//! [`PublishPolicy`]:
//!
//! - `drop`: log and move on; the alert is lost.
//! - `retry`: park the payload in a bounded queue, flushed ahead of every
//!   new send and whenever the connection shows progress. New
//!   batches queue behind parked ones so alerts leave in arrival order.
//!   When the queue is full the oldest entry is evicted, and entries are
//!   dropped after `max_attempts` tries.
//!
//! Environment variables:
//! - `VITALWATCH_PUBLISH_POLICY`: `drop` or `retry` (default: drop)
//! - `VITALWATCH_RETRY_CAPACITY`: Retry queue size (default: 256)
//! - `VITALWATCH_RETRY_MAX_ATTEMPTS`: Attempts per alert, first send included (default: 3)

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::alerts::AlertBatch;

/// Destination for serialized alert batches
pub trait Publisher: Send + Sync {
    /// Hand a payload to the transport without blocking
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;
}

/// What to do with an alert the publisher refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishPolicy {
    Drop,
    Retry { capacity: usize, max_attempts: u32 },
}

impl Default for PublishPolicy {
    fn default() -> Self {
        PublishPolicy::Drop
    }
}

impl PublishPolicy {
    /// Default retry settings
    pub fn retry() -> Self {
        PublishPolicy::Retry {
            capacity: 256,
            max_attempts: 3,
        }
    }

    /// Create policy from environment variables
    pub fn from_env() -> Self {
        let name = std::env::var("VITALWATCH_PUBLISH_POLICY").unwrap_or_else(|_| "drop".to_string());
        let capacity = std::env::var("VITALWATCH_RETRY_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(256);
        let max_attempts = std::env::var("VITALWATCH_RETRY_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        Self::parse(&name, capacity, max_attempts).unwrap_or_else(|| {
            tracing::warn!(policy = %name, "Unknown publish policy, falling back to drop");
            PublishPolicy::Drop
        })
    }

    /// Parse a policy name
    pub fn parse(name: &str, capacity: usize, max_attempts: u32) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "drop" => Some(PublishPolicy::Drop),
            "retry" => Some(PublishPolicy::Retry {
                capacity: capacity.max(1),
                max_attempts: max_attempts.max(1),
            }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PublishPolicy::Drop => "drop",
            PublishPolicy::Retry { .. } => "retry",
        }
    }
}

/// Outcome of sending one batch
#[derive(Debug)]
pub enum Delivery {
    /// Accepted by the publisher
    Published,
    /// Refused and discarded
    Dropped(PublishError),
    /// Refused and parked for a later flush
    Queued { error: PublishError, evicted: bool },
    /// Parked behind older queued alerts without a publish attempt
    Deferred { evicted: bool },
}

/// Result of a retry queue flush
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub published: usize,
    pub dropped: usize,
    pub pending: usize,
}

struct Pending {
    payload: Vec<u8>,
    attempts: u32,
}

/// Publishes alert batches on the outbound topic
pub struct AlertSink {
    publisher: Arc<dyn Publisher>,
    topic: String,
    policy: PublishPolicy,
    queue: Mutex<VecDeque<Pending>>,
}

impl AlertSink {
    pub fn new(publisher: Arc<dyn Publisher>, topic: impl Into<String>, policy: PublishPolicy) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            policy,
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn policy(&self) -> &PublishPolicy {
        &self.policy
    }

    /// Number of alerts waiting in the retry queue
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Serialize and publish a batch
    ///
    /// Under the retry policy a batch never overtakes older queued alerts:
    /// while the queue is non-empty it is appended behind them untried.
    pub fn send(&self, batch: &AlertBatch) -> Delivery {
        let payload = match serde_json::to_vec(batch) {
            Ok(payload) => payload,
            Err(e) => return Delivery::Dropped(PublishError::Encode(e)),
        };

        let retry_capacity = match self.policy {
            PublishPolicy::Retry {
                capacity,
                max_attempts,
            } if max_attempts > 1 => Some(capacity),
            _ => None,
        };

        if let Some(capacity) = retry_capacity {
            let mut queue = self.queue.lock();
            if !queue.is_empty() {
                let evicted = Self::enqueue(&mut queue, capacity, payload, 0);
                return Delivery::Deferred { evicted };
            }
        }

        let error = match self.publisher.publish(&self.topic, payload.clone()) {
            Ok(()) => return Delivery::Published,
            Err(e) => e,
        };

        match retry_capacity {
            Some(capacity) => {
                let evicted = Self::enqueue(&mut self.queue.lock(), capacity, payload, 1);
                Delivery::Queued { error, evicted }
            }
            None => Delivery::Dropped(error),
        }
    }

    /// Append to the queue, evicting the oldest entry when full
    fn enqueue(queue: &mut VecDeque<Pending>, capacity: usize, payload: Vec<u8>, attempts: u32) -> bool {
        let evicted = if queue.len() >= capacity {
            queue.pop_front().is_some()
        } else {
            false
        };
        queue.push_back(Pending { payload, attempts });
        evicted
    }

    /// Retry queued alerts in order, stopping at the first refusal
    pub fn flush(&self) -> FlushReport {
        let max_attempts = match self.policy {
            PublishPolicy::Retry { max_attempts, .. } => max_attempts,
            PublishPolicy::Drop => return FlushReport::default(),
        };

        let mut report = FlushReport::default();
        let mut queue = self.queue.lock();

        while let Some(mut entry) = queue.pop_front() {
            match self.publisher.publish(&self.topic, entry.payload.clone()) {
                Ok(()) => report.published += 1,
                Err(e) => {
                    entry.attempts += 1;
                    if entry.attempts >= max_attempts {
                        tracing::error!(
                            topic = %self.topic,
                            attempts = entry.attempts,
                            error = %e,
                            "Dropping alert after retries"
                        );
                        report.dropped += 1;
                    } else {
                        queue.push_front(entry);
                    }
                    break;
                }
            }
        }

        report.pending = queue.len();
        report
    }
}

/// Publish errors
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Client error: {0}")]
    Client(String),
}
