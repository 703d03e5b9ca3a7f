use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::data::Measure;
use crate::ingest::{AdapterStats, SharedStats};
use crate::rules::{Bound, RuleSet, VitalName};

/// Application state shared across handlers
pub struct AppState {
    pub stats: SharedStats,
    pub rules: Arc<RuleSet>,
    pub publish_policy: &'static str,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub mqtt_connected: bool,
    pub timestamp: String,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let connected = state.stats.read().connected;
    Json(HealthResponse {
        status: if connected { "OK" } else { "DEGRADED" },
        version: env!("CARGO_PKG_VERSION"),
        mqtt_connected: connected,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// ============================================================================
// Stats
// ============================================================================

#[derive(Serialize)]
pub struct StatsResponse {
    pub publish_policy: &'static str,
    #[serde(flatten)]
    pub adapter: AdapterStats,
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let adapter = state.stats.read().clone();
    Json(StatsResponse {
        publish_policy: state.publish_policy,
        adapter,
    })
}

// ============================================================================
// Rules
// ============================================================================

#[derive(Serialize)]
pub struct RuleResponse {
    pub vital: VitalName,
    pub min: Option<Measure>,
    pub max: Option<Measure>,
    pub unit: String,
}

impl RuleResponse {
    fn new(vital: VitalName, bound: &Bound) -> Self {
        Self {
            vital,
            min: bound.min,
            max: bound.max,
            unit: bound.unit.clone(),
        }
    }
}

pub async fn list_rules(State(state): State<Arc<AppState>>) -> Json<Vec<RuleResponse>> {
    Json(
        state
            .rules
            .iter()
            .map(|(vital, bound)| RuleResponse::new(vital, bound))
            .collect(),
    )
}

pub async fn get_rule(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<RuleResponse>, ApiError> {
    let vital: VitalName = name
        .parse()
        .map_err(|e: crate::rules::UnknownVital| ApiError::NotFound(e.to_string()))?;

    let bound = state
        .rules
        .bound(vital)
        .ok_or_else(|| ApiError::NotFound(format!("No rule for {}", vital)))?;

    Ok(Json(RuleResponse::new(vital, bound)))
}

// ============================================================================
// Error Handling
// ============================================================================

pub enum ApiError {
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
