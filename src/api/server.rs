use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{get_rule, health_check, list_rules, stats, AppState};

/// HTTP configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl HttpConfig {
    /// Create config from environment variables
    /// VITALWATCH_HTTP_ENABLED=true
    /// VITALWATCH_HTTP_HOST=0.0.0.0
    /// VITALWATCH_HTTP_PORT=3000
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("VITALWATCH_HTTP_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.enabled),
            host: std::env::var("VITALWATCH_HTTP_HOST").unwrap_or(defaults.host),
            port: std::env::var("VITALWATCH_HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        }
    }
}

/// `true`/`1` in any case; everything else is off
fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(stats))
        .route("/rules", get(list_rules))
        .route("/rules/:vital", get(get_rule))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the health API until `shutdown` resolves
pub async fn serve<F>(
    config: HttpConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting health API on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Health API stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::AdapterStats;
    use crate::rules::RuleSet;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use parking_lot::RwLock;
    use tower::util::ServiceExt;

    #[test]
    fn test_enabled_flag_ignores_case() {
        for value in ["true", "TRUE", "True", " true ", "1"] {
            assert!(parse_flag(value), "{value:?} should enable");
        }
        for value in ["false", "FALSE", "0", "yes", ""] {
            assert!(!parse_flag(value), "{value:?} should disable");
        }
    }

    #[test]
    fn test_http_enabled_from_env() {
        std::env::set_var("VITALWATCH_HTTP_ENABLED", "TRUE");
        assert!(HttpConfig::from_env().enabled);

        std::env::set_var("VITALWATCH_HTTP_ENABLED", "False");
        assert!(!HttpConfig::from_env().enabled);

        std::env::remove_var("VITALWATCH_HTTP_ENABLED");
        assert!(HttpConfig::from_env().enabled);
    }

    fn create_test_app(connected: bool) -> Router {
        let stats = AdapterStats {
            connected,
            messages_received: 3,
            alerts_published: 1,
            ..Default::default()
        };
        let state = Arc::new(AppState {
            stats: Arc::new(RwLock::new(stats)),
            rules: Arc::new(RuleSet::clinical_defaults()),
            publish_policy: "drop",
        });
        build_router(state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = get_json(create_test_app(true), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert_eq!(body["mqtt_connected"], true);
        assert!(body["timestamp"].is_string());

        let (_, body) = get_json(create_test_app(false), "/health").await;
        assert_eq!(body["status"], "DEGRADED");
        assert_eq!(body["mqtt_connected"], false);
    }

    #[tokio::test]
    async fn test_stats() {
        let (status, body) = get_json(create_test_app(true), "/stats").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["publish_policy"], "drop");
        assert_eq!(body["messages_received"], 3);
        assert_eq!(body["alerts_published"], 1);
    }

    #[tokio::test]
    async fn test_list_rules() {
        let (status, body) = get_json(create_test_app(true), "/rules").await;

        assert_eq!(status, StatusCode::OK);
        let rules = body.as_array().unwrap();
        assert_eq!(rules.len(), 5);
        assert_eq!(rules[0]["vital"], "heart_rate");
        assert_eq!(rules[0]["min"], 50);
        assert_eq!(rules[0]["max"], 120);
        assert_eq!(rules[4]["unit"], "°C");
    }

    #[tokio::test]
    async fn test_get_rule() {
        let (status, body) = get_json(create_test_app(true), "/rules/oxygen_sat").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["min"], 92);
        assert_eq!(body["unit"], "%");

        let (status, body) = get_json(create_test_app(true), "/rules/pulse").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }
}
