//! Ingest channel for VitalWatch
//!
//! - `handler`: the message handler interface and the alerting handler
//! - `sink`: outbound publishing and the publish-failure policy
//! - `adapter`: transport-independent dispatch, statistics and worker pool
//! - `mqtt`: the MQTT transport

pub mod adapter;
pub mod handler;
pub mod mqtt;
pub mod sink;

pub use adapter::{AdapterStats, ChannelAdapter, ChannelEvent, SharedStats, WorkerPool};
pub use handler::{AlertHandler, MessageHandler, ProcessError};
pub use mqtt::{ChannelError, MqttChannel, MqttConfig, Session, Subscriber};
pub use sink::{AlertSink, Delivery, FlushReport, PublishError, PublishPolicy, Publisher};
