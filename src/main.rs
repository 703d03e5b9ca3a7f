//! VitalWatch Server
//!
//! Run with: cargo run
//!
//! Environment variables (an optional `.env` file is loaded first):
//! - VITALWATCH_MQTT_HOST / VITALWATCH_MQTT_PORT: Broker address (default: localhost:1883)
//! - VITALWATCH_MQTT_KEEP_ALIVE_SECS: Keep-alive interval (default: 60)
//! - VITALWATCH_TOPIC_VITALS: Topic carrying readings (default: medical/vitals)
//! - VITALWATCH_TOPIC_ALERTS: Topic receiving alerts (default: medical/alerts)
//! - VITALWATCH_MQTT_REQUEST_CAPACITY: Client request queue size (default: 64)
//! - VITALWATCH_PUBLISH_POLICY: drop or retry (default: drop)
//! - VITALWATCH_WORKERS: Message workers, 1 keeps arrival order (default: 1)
//! - VITALWATCH_HTTP_ENABLED / VITALWATCH_HTTP_PORT: Health API (default: true, 3000)
//! - RUST_LOG: Log level (default: info)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitalwatch::rules::RuleSet;
use vitalwatch::service::{run_service, ServiceConfig};
use vitalwatch::PublishPolicy;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitalwatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();
    let rules = RuleSet::clinical_defaults();

    tracing::info!("VitalWatch configuration:");
    tracing::info!("  Broker: {}", config.mqtt.broker_addr());
    tracing::info!("  Keep-alive: {} seconds", config.mqtt.keep_alive.as_secs());
    tracing::info!("  Vitals topic: {}", config.mqtt.vitals_topic);
    tracing::info!("  Alerts topic: {}", config.mqtt.alerts_topic);
    tracing::info!("  Request queue: {}", config.mqtt.request_capacity);
    match &config.policy {
        PublishPolicy::Drop => tracing::info!("  Publish policy: drop"),
        PublishPolicy::Retry {
            capacity,
            max_attempts,
        } => tracing::info!(
            "  Publish policy: retry (queue {}, {} attempts)",
            capacity,
            max_attempts
        ),
    }
    if config.workers > 1 {
        tracing::info!("  Dispatch: {} workers (alert order not guaranteed)", config.workers);
    } else {
        tracing::info!("  Dispatch: sequential");
    }
    if config.http.enabled {
        tracing::info!("  Health API: {}:{}", config.http.host, config.http.port);
    } else {
        tracing::info!("  Health API: DISABLED");
    }

    tracing::info!("Configured thresholds:");
    for (vital, bound) in rules.iter() {
        let min = bound.min.map(|m| m.to_string()).unwrap_or_else(|| "N/A".to_string());
        let max = bound.max.map(|m| m.to_string()).unwrap_or_else(|| "N/A".to_string());
        tracing::info!("  {}: min={} max={} {}", vital, min, max, bound.unit);
    }

    println!(
        r#"
 __     ___ _        ___        __    _       _
 \ \   / (_) |_ __ _| \ \      / /_ _| |_ ___| |__
  \ \ / /| | __/ _` | |\ \ /\ / / _` | __/ __| '_ \
   \ V / | | || (_| | | \ V  V / (_| | || (__| | | |
    \_/  |_|\__\__,_|_|  \_/\_/ \__,_|\__\___|_| |_|

 Vital-Sign Threshold Alerting
 Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );

    run_service(config, rules).await
}
