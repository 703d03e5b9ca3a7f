//! Service wiring
//!
//! Builds the alert handler, the MQTT channel and the health API from a
//! [`ServiceConfig`] and runs them until Ctrl-C.

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{self, AppState, HttpConfig};
use crate::ingest::{AlertHandler, MqttChannel, MqttConfig, PublishPolicy};
use crate::rules::RuleSet;

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub mqtt: MqttConfig,
    pub policy: PublishPolicy,
    /// Message workers; 1 processes messages in arrival order
    pub workers: usize,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            policy: PublishPolicy::default(),
            workers: 1,
            http: HttpConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            mqtt: MqttConfig::from_env(),
            policy: PublishPolicy::from_env(),
            workers: std::env::var("VITALWATCH_WORKERS")
                .ok()
                .and_then(|w| w.parse().ok())
                .unwrap_or(1),
            http: HttpConfig::from_env(),
        }
    }
}

/// Run the alerting service
pub async fn run_service(config: ServiceConfig, rules: RuleSet) -> Result<(), Box<dyn std::error::Error>> {
    let rules = Arc::new(rules);
    let handler = Arc::new(AlertHandler::new(Arc::clone(&rules)));
    let channel = MqttChannel::new(config.mqtt.clone(), handler, config.policy.clone(), config.workers);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let http_handle = if config.http.enabled {
        let state = Arc::new(AppState {
            stats: channel.adapter().stats_handle(),
            rules: Arc::clone(&rules),
            publish_policy: config.policy.name(),
        });
        let http_config = config.http.clone();
        let shutdown = wait_for_shutdown(shutdown_rx.clone());
        Some(tokio::spawn(async move {
            if let Err(e) = api::serve(http_config, state, shutdown).await {
                tracing::error!(error = %e, "Health API failed");
            }
        }))
    } else {
        None
    };

    let result = channel.run(wait_for_shutdown(shutdown_rx)).await;

    if let Some(handle) = http_handle {
        handle.abort();
    }

    result?;
    tracing::info!("VitalWatch stopped");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");

    tracing::info!("Shutdown signal received, draining in-flight messages...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_config_default() {
        let config = ServiceConfig::default();
        assert_eq!(config.policy, PublishPolicy::Drop);
        assert_eq!(config.workers, 1);
        assert!(config.http.enabled);
        assert_eq!(config.http.port, 3000);
        assert_eq!(config.mqtt.vitals_topic, "medical/vitals");
    }
}
