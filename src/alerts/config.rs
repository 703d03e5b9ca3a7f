//! Alert types

use serde::{Deserialize, Serialize};

use crate::data::Measure;
use crate::rules::VitalName;

/// Severity attached to a violation.
///
/// Only `Critical` is emitted by the threshold rules; the other levels keep
/// the wire taxonomy consumers already know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    #[serde(rename = "CRITIQUE")]
    Critical,
    #[serde(rename = "AVERTISSEMENT")]
    Warning,
    #[serde(rename = "INFO")]
    Info,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "CRITIQUE",
            AlertLevel::Warning => "AVERTISSEMENT",
            AlertLevel::Info => "INFO",
        }
    }
}

/// Which side of the bound was crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundKind {
    #[serde(rename = "min")]
    BelowMin,
    #[serde(rename = "max")]
    AboveMax,
}

/// One out-of-range observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub level: AlertLevel,
    pub vital: VitalName,
    /// Observed value
    #[serde(rename = "value")]
    pub observed: Measure,
    /// The limit that was crossed
    #[serde(rename = "threshold")]
    pub bound_value: Measure,
    #[serde(rename = "type")]
    pub bound_kind: BoundKind,
    pub unit: String,
    pub message: String,
}

impl Violation {
    /// Build a violation with the standard message text
    pub fn new(
        vital: VitalName,
        observed: Measure,
        bound_kind: BoundKind,
        bound_value: Measure,
        unit: impl Into<String>,
    ) -> Self {
        let unit = unit.into();
        let message = match bound_kind {
            BoundKind::BelowMin => format!(
                "{} too low: {} {} (min: {})",
                vital.title(),
                observed,
                unit,
                bound_value
            ),
            BoundKind::AboveMax => format!(
                "{} too high: {} {} (max: {})",
                vital.title(),
                observed,
                unit,
                bound_value
            ),
        };

        Self {
            level: AlertLevel::Critical,
            vital,
            observed,
            bound_value,
            bound_kind,
            unit,
            message,
        }
    }
}

/// Values of every tracked vital at the time of the reading
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VitalSnapshot {
    pub heart_rate: Option<Measure>,
    pub systolic_bp: Option<Measure>,
    pub diastolic_bp: Option<Measure>,
    pub oxygen_sat: Option<Measure>,
    pub temperature: Option<Measure>,
}

impl VitalSnapshot {
    pub fn get(&self, vital: VitalName) -> Option<Measure> {
        match vital {
            VitalName::HeartRate => self.heart_rate,
            VitalName::SystolicBp => self.systolic_bp,
            VitalName::DiastolicBp => self.diastolic_bp,
            VitalName::OxygenSat => self.oxygen_sat,
            VitalName::Temperature => self.temperature,
        }
    }
}

/// Outbound alert document for a single reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertBatch {
    pub timestamp: String,
    #[serde(rename = "patient_data")]
    pub snapshot: VitalSnapshot,
    #[serde(rename = "alerts")]
    pub violations: Vec<Violation>,
    #[serde(rename = "alert_count")]
    pub violation_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_messages() {
        let high = Violation::new(
            VitalName::HeartRate,
            Measure::Int(135),
            BoundKind::AboveMax,
            Measure::Int(120),
            "BPM",
        );
        assert_eq!(high.message, "Heart Rate too high: 135 BPM (max: 120)");
        assert_eq!(high.level, AlertLevel::Critical);

        let low = Violation::new(
            VitalName::Temperature,
            Measure::Float(35.5),
            BoundKind::BelowMin,
            Measure::Float(36.0),
            "°C",
        );
        assert_eq!(low.message, "Temperature too low: 35.5 °C (min: 36.0)");
    }

    #[test]
    fn test_violation_wire_shape() {
        let violation = Violation::new(
            VitalName::SystolicBp,
            Measure::Int(85),
            BoundKind::BelowMin,
            Measure::Int(90),
            "mmHg",
        );
        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "level": "CRITIQUE",
                "vital": "systolic_bp",
                "value": 85,
                "threshold": 90,
                "type": "min",
                "unit": "mmHg",
                "message": "Systolic Bp too low: 85 mmHg (min: 90)"
            })
        );
    }

    #[test]
    fn test_snapshot_serializes_nulls() {
        let snapshot = VitalSnapshot {
            heart_rate: Some(Measure::Int(75)),
            ..Default::default()
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["heart_rate"], 75);
        assert!(json["temperature"].is_null());
        assert_eq!(json.as_object().unwrap().len(), 5);
    }
}
