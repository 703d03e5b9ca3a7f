//! Inbound vital-sign readings
//!
//! ## Message Format
//!
//! Readings arrive as flat JSON objects:
//! ```json
//! {"timestamp": "02:04:44", "heart_rate": 75, "systolic_bp": 120,
//!  "diastolic_bp": 80, "oxygen_sat": 98, "temperature": 36.8}
//! ```
//!
//! Every key is optional and unknown keys are ignored. A `null` vital counts
//! as absent.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::value::Measure;
use crate::rules::VitalName;

/// One timestamped set of vital observations
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reading {
    timestamp: Option<String>,
    values: BTreeMap<VitalName, Measure>,
}

#[derive(Deserialize)]
struct ReadingPayload {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    heart_rate: Option<Measure>,
    #[serde(default)]
    systolic_bp: Option<Measure>,
    #[serde(default)]
    diastolic_bp: Option<Measure>,
    #[serde(default)]
    oxygen_sat: Option<Measure>,
    #[serde(default)]
    temperature: Option<Measure>,
}

impl From<ReadingPayload> for Reading {
    fn from(payload: ReadingPayload) -> Self {
        let values = [
            (VitalName::HeartRate, payload.heart_rate),
            (VitalName::SystolicBp, payload.systolic_bp),
            (VitalName::DiastolicBp, payload.diastolic_bp),
            (VitalName::OxygenSat, payload.oxygen_sat),
            (VitalName::Temperature, payload.temperature),
        ]
        .into_iter()
        .filter_map(|(vital, value)| value.map(|v| (vital, v)))
        .collect();

        Self {
            timestamp: payload.timestamp,
            values,
        }
    }
}

impl Reading {
    /// Create an empty reading
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reading timestamp
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Set one vital value
    pub fn with_value(mut self, vital: VitalName, value: impl Into<Measure>) -> Self {
        self.values.insert(vital, value.into());
        self
    }

    /// Decode a raw message payload
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let value: serde_json::Value = serde_json::from_slice(payload).map_err(DecodeError::Syntax)?;

        if !value.is_object() {
            return Err(DecodeError::NotAnObject(json_kind(&value)));
        }

        let payload: ReadingPayload = serde_json::from_value(value).map_err(DecodeError::Field)?;
        Ok(payload.into())
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// Observed value for a vital, if present
    pub fn value(&self, vital: VitalName) -> Option<Measure> {
        self.values.get(&vital).copied()
    }

    /// Present vitals in canonical order
    pub fn values(&self) -> impl Iterator<Item = (VitalName, Measure)> + '_ {
        self.values.iter().map(|(vital, value)| (*vital, *value))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Payload decode errors
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    #[error("Expected JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Invalid field: {0}")]
    Field(#[source] serde_json::Error),
}
