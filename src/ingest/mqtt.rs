//! MQTT channel for reading ingest and alert publishing
//!
//! Subscribes to the vitals topic, evaluates every reading and publishes
//! alert batches on the alerts topic. The subscription is re-established on
//! every ConnAck, so a broker restart or a network blip only pauses the
//! stream. Failing to reach the broker or to subscribe before the first
//! ConnAck is fatal; after that, a refused subscription is retried while
//! the connection stays up.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `VITALWATCH_MQTT_HOST`: Broker host (default: localhost)
//! - `VITALWATCH_MQTT_PORT`: Broker port (default: 1883)
//! - `VITALWATCH_MQTT_KEEP_ALIVE_SECS`: Keep-alive interval (default: 60)
//! - `VITALWATCH_MQTT_CLIENT_ID`: Client identifier (default: vitalwatch-alerts)
//! - `VITALWATCH_TOPIC_VITALS`: Inbound topic (default: medical/vitals)
//! - `VITALWATCH_TOPIC_ALERTS`: Outbound topic (default: medical/alerts)
//! - `VITALWATCH_RECONNECT_DELAY_MS`: Pause before reconnecting (default: 1000)
//! - `VITALWATCH_MQTT_REQUEST_CAPACITY`: Client request queue size (default: 64)

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};

use super::adapter::{ChannelAdapter, ChannelEvent, WorkerPool};
use super::handler::MessageHandler;
use super::sink::{AlertSink, PublishError, PublishPolicy, Publisher};

/// MQTT connection configuration
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker host
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Client identifier
    pub client_id: String,
    /// Topic carrying readings
    pub vitals_topic: String,
    /// Topic receiving alert batches
    pub alerts_topic: String,
    /// Pause after a connection error before polling again
    pub reconnect_delay: Duration,
    /// Client request queue size
    pub request_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            keep_alive: Duration::from_secs(60),
            client_id: "vitalwatch-alerts".to_string(),
            vitals_topic: "medical/vitals".to_string(),
            alerts_topic: "medical/alerts".to_string(),
            reconnect_delay: Duration::from_millis(1000),
            request_capacity: 64,
        }
    }
}

impl MqttConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("VITALWATCH_MQTT_HOST").unwrap_or(defaults.host),
            port: std::env::var("VITALWATCH_MQTT_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            keep_alive: std::env::var("VITALWATCH_MQTT_KEEP_ALIVE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.keep_alive),
            client_id: std::env::var("VITALWATCH_MQTT_CLIENT_ID").unwrap_or(defaults.client_id),
            vitals_topic: std::env::var("VITALWATCH_TOPIC_VITALS").unwrap_or(defaults.vitals_topic),
            alerts_topic: std::env::var("VITALWATCH_TOPIC_ALERTS").unwrap_or(defaults.alerts_topic),
            reconnect_delay: std::env::var("VITALWATCH_RECONNECT_DELAY_MS")
                .ok()
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_delay),
            request_capacity: std::env::var("VITALWATCH_MQTT_REQUEST_CAPACITY")
                .ok()
                .and_then(|n| n.parse::<usize>().ok())
                .map(|n| n.max(1))
                .unwrap_or(defaults.request_capacity),
        }
    }

    /// Broker address as `host:port`
    pub fn broker_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        // rumqttc panics on keep-alives under one second
        options.set_keep_alive(self.keep_alive.max(Duration::from_secs(1)));
        options.set_clean_session(true);
        options
    }
}

impl Publisher for AsyncClient {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        self.try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| PublishError::Client(e.to_string()))
    }
}

/// Topic subscription seam used on every ConnAck
pub trait Subscriber: Send + Sync {
    /// Queue a subscription request without blocking
    fn subscribe_topic(&self, topic: &str) -> Result<(), ChannelError>;
}

impl Subscriber for AsyncClient {
    fn subscribe_topic(&self, topic: &str) -> Result<(), ChannelError> {
        self.try_subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| ChannelError::Subscribe(e.to_string()))
    }
}

/// Connection state of one channel run
#[derive(Debug)]
pub struct Session {
    topic: String,
    established: bool,
    connected: bool,
    subscribed: bool,
}

impl Session {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            established: false,
            connected: false,
            subscribed: false,
        }
    }

    /// Whether a ConnAck has been seen at least once
    pub fn is_established(&self) -> bool {
        self.established
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Subscribe and announce the connection.
    ///
    /// A refused subscription only fails the first ConnAck; later ones log
    /// it and leave the retry to [`retry_subscribe`](Self::retry_subscribe).
    pub fn on_connack(
        &mut self,
        subscriber: &dyn Subscriber,
        adapter: &ChannelAdapter,
    ) -> Result<(), ChannelError> {
        match subscriber.subscribe_topic(&self.topic) {
            Ok(()) => {
                self.subscribed = true;
                tracing::info!(topic = %self.topic, "Subscribed to vitals topic");
            }
            Err(e) if !self.established => return Err(e),
            Err(e) => {
                self.subscribed = false;
                tracing::warn!(topic = %self.topic, error = %e, "Subscribe refused, will retry");
            }
        }

        self.established = true;
        self.connected = true;
        adapter.dispatch(ChannelEvent::Connected);
        Ok(())
    }

    /// Re-request a refused subscription while connected
    pub fn retry_subscribe(&mut self, subscriber: &dyn Subscriber) {
        if !self.connected || self.subscribed {
            return;
        }
        match subscriber.subscribe_topic(&self.topic) {
            Ok(()) => {
                self.subscribed = true;
                tracing::info!(topic = %self.topic, "Subscribed to vitals topic");
            }
            Err(e) => tracing::debug!(error = %e, "Subscribe still refused"),
        }
    }

    pub fn on_disconnect(&mut self, adapter: &ChannelAdapter, reason: String) {
        self.connected = false;
        self.subscribed = false;
        adapter.dispatch(ChannelEvent::Disconnected { reason });
    }
}

/// MQTT binding for the channel adapter
pub struct MqttChannel {
    config: MqttConfig,
    client: AsyncClient,
    eventloop: EventLoop,
    adapter: Arc<ChannelAdapter>,
    workers: usize,
}

impl MqttChannel {
    /// Create a channel; nothing touches the network until [`run`](Self::run)
    pub fn new(
        config: MqttConfig,
        handler: Arc<dyn MessageHandler>,
        policy: PublishPolicy,
        workers: usize,
    ) -> Self {
        let (client, eventloop) = AsyncClient::new(config.options(), config.request_capacity);
        let sink = AlertSink::new(Arc::new(client.clone()), config.alerts_topic.clone(), policy);
        let adapter = Arc::new(ChannelAdapter::new(handler, sink));

        Self {
            config,
            client,
            eventloop,
            adapter,
            workers,
        }
    }

    pub fn adapter(&self) -> Arc<ChannelAdapter> {
        Arc::clone(&self.adapter)
    }

    /// Drive the connection until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<(), ChannelError>
    where
        F: Future<Output = ()>,
    {
        let MqttChannel {
            config,
            client,
            mut eventloop,
            adapter,
            workers,
        } = self;

        let pool = (workers > 1).then(|| {
            WorkerPool::start(Arc::clone(&adapter), workers, config.request_capacity)
        });

        tracing::info!(broker = %config.broker_addr(), "Connecting to MQTT broker");

        let mut session = Session::new(config.vitals_topic.as_str());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("MQTT channel shutting down");
                    break;
                }
                event = eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            session.on_connack(&client, &adapter)?;
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            let topic = publish.topic;
                            let payload = publish.payload.to_vec();
                            match &pool {
                                Some(pool) => {
                                    if !pool.submit(topic, payload).await {
                                        tracing::error!("Worker pool closed, message dropped");
                                    }
                                }
                                None => adapter.dispatch(ChannelEvent::Message { topic, payload }),
                            }
                        }
                        Ok(Event::Outgoing(_)) => {
                            // The client drained a request, so there is room to retry
                            session.retry_subscribe(&client);
                            adapter.flush_pending();
                        }
                        Ok(_) => session.retry_subscribe(&client),
                        Err(e) => {
                            if !session.is_established() {
                                return Err(ChannelError::Connect {
                                    broker: config.broker_addr(),
                                    source: e,
                                });
                            }
                            session.on_disconnect(&adapter, e.to_string());
                            tokio::time::sleep(config.reconnect_delay).await;
                        }
                    }
                }
            }
        }

        // In-flight messages finish before the connection closes
        if let Some(pool) = pool {
            pool.shutdown().await;
        }
        adapter.flush_pending();

        let pending = adapter.sink().pending();
        if pending > 0 {
            tracing::warn!(pending = pending, "Alerts still queued at shutdown");
        }

        Self::disconnect(&client, &mut eventloop).await;
        Ok(())
    }

    /// Send DISCONNECT and drain queued requests, bounded by a timeout
    async fn disconnect(client: &AsyncClient, eventloop: &mut EventLoop) {
        if let Err(e) = client.try_disconnect() {
            tracing::warn!(error = %e, "Failed to queue disconnect");
            return;
        }

        let drain = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };

        if tokio::time::timeout(Duration::from_secs(2), drain).await.is_err() {
            tracing::warn!("Timed out waiting for broker disconnect");
        }
        tracing::info!("Disconnected from MQTT broker");
    }
}

/// Channel errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to connect to MQTT broker {broker}: {source}")]
    Connect {
        broker: String,
        #[source]
        source: ConnectionError,
    },

    #[error("Failed to subscribe: {0}")]
    Subscribe(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::handler::AlertHandler;
    use crate::ingest::sink::tests::RecordingPublisher;
    use crate::rules::RuleSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_mqtt_config_default() {
        let config = MqttConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1883);
        assert_eq!(config.keep_alive, Duration::from_secs(60));
        assert_eq!(config.vitals_topic, "medical/vitals");
        assert_eq!(config.alerts_topic, "medical/alerts");
        assert_eq!(config.broker_addr(), "localhost:1883");
    }

    #[test]
    fn test_options_clamp_keep_alive() {
        let config = MqttConfig {
            keep_alive: Duration::from_millis(200),
            ..Default::default()
        };
        assert_eq!(config.options().keep_alive(), Duration::from_secs(1));
    }

    #[test]
    fn test_request_capacity_from_env() {
        std::env::set_var("VITALWATCH_MQTT_REQUEST_CAPACITY", "512");
        assert_eq!(MqttConfig::from_env().request_capacity, 512);

        std::env::set_var("VITALWATCH_MQTT_REQUEST_CAPACITY", "0");
        assert_eq!(MqttConfig::from_env().request_capacity, 1);

        std::env::set_var("VITALWATCH_MQTT_REQUEST_CAPACITY", "lots");
        assert_eq!(MqttConfig::from_env().request_capacity, 64);

        std::env::remove_var("VITALWATCH_MQTT_REQUEST_CAPACITY");
        assert_eq!(MqttConfig::from_env().request_capacity, 64);
    }

    /// Records subscription requests; can be switched to refuse them
    #[derive(Default)]
    struct RecordingSubscriber {
        topics: parking_lot::Mutex<Vec<String>>,
        failing: AtomicBool,
    }

    impl RecordingSubscriber {
        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn count(&self) -> usize {
            self.topics.lock().len()
        }
    }

    impl Subscriber for RecordingSubscriber {
        fn subscribe_topic(&self, topic: &str) -> Result<(), ChannelError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(ChannelError::Subscribe("request queue full".to_string()));
            }
            self.topics.lock().push(topic.to_string());
            Ok(())
        }
    }

    fn adapter() -> (ChannelAdapter, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let sink = AlertSink::new(publisher.clone(), "medical/alerts", PublishPolicy::Drop);
        let handler = Arc::new(AlertHandler::new(Arc::new(RuleSet::clinical_defaults())));
        (ChannelAdapter::new(handler, sink), publisher)
    }

    #[test]
    fn test_connack_subscribes() {
        let (adapter, _) = adapter();
        let subscriber = RecordingSubscriber::default();
        let mut session = Session::new("medical/vitals");

        session.on_connack(&subscriber, &adapter).unwrap();

        assert_eq!(*subscriber.topics.lock(), vec!["medical/vitals"]);
        assert!(session.is_established());
        assert!(session.is_subscribed());
        assert!(adapter.stats().connected);
    }

    #[test]
    fn test_resubscribes_on_every_connack() {
        let (adapter, publisher) = adapter();
        let subscriber = RecordingSubscriber::default();
        let mut session = Session::new("medical/vitals");

        session.on_connack(&subscriber, &adapter).unwrap();
        session.on_disconnect(&adapter, "connection reset".to_string());
        assert!(!session.is_subscribed());
        assert!(!adapter.stats().connected);

        session.on_connack(&subscriber, &adapter).unwrap();
        assert_eq!(subscriber.count(), 2);

        let stats = adapter.stats();
        assert!(stats.connected);
        assert_eq!(stats.reconnects, 1);

        // Messages keep flowing after the reconnect
        adapter.dispatch(ChannelEvent::Message {
            topic: "medical/vitals".to_string(),
            payload: br#"{"heart_rate": 135}"#.to_vec(),
        });
        assert_eq!(publisher.sent.lock().len(), 1);
    }

    #[test]
    fn test_first_subscribe_refusal_is_fatal() {
        let (adapter, _) = adapter();
        let subscriber = RecordingSubscriber::default();
        subscriber.set_failing(true);
        let mut session = Session::new("medical/vitals");

        let result = session.on_connack(&subscriber, &adapter);
        assert!(matches!(result, Err(ChannelError::Subscribe(_))));
        assert!(!session.is_established());
        assert!(!adapter.stats().connected);
    }

    #[test]
    fn test_subscribe_refusal_after_reconnect_is_retried() {
        let (adapter, _) = adapter();
        let subscriber = RecordingSubscriber::default();
        let mut session = Session::new("medical/vitals");

        session.on_connack(&subscriber, &adapter).unwrap();
        session.on_disconnect(&adapter, "keep-alive timeout".to_string());

        subscriber.set_failing(true);
        session.on_connack(&subscriber, &adapter).unwrap();
        assert!(!session.is_subscribed());
        assert!(adapter.stats().connected);

        session.retry_subscribe(&subscriber);
        assert!(!session.is_subscribed());

        subscriber.set_failing(false);
        session.retry_subscribe(&subscriber);
        assert!(session.is_subscribed());
        assert_eq!(subscriber.count(), 2);

        // Nothing left to do once subscribed
        session.retry_subscribe(&subscriber);
        assert_eq!(subscriber.count(), 2);
    }

    #[test]
    fn test_no_subscribe_retry_while_disconnected() {
        let (adapter, _) = adapter();
        let subscriber = RecordingSubscriber::default();
        let mut session = Session::new("medical/vitals");

        session.on_connack(&subscriber, &adapter).unwrap();
        session.on_disconnect(&adapter, "connection reset".to_string());
        session.retry_subscribe(&subscriber);

        assert_eq!(subscriber.count(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_broker_is_fatal() {
        let config = MqttConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..Default::default()
        };
        let handler = Arc::new(AlertHandler::new(Arc::new(RuleSet::clinical_defaults())));
        let channel = MqttChannel::new(config, handler, PublishPolicy::Drop, 1);

        let result = channel.run(std::future::pending()).await;
        assert!(matches!(result, Err(ChannelError::Connect { .. })));
    }
}
