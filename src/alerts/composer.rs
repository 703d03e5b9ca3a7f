//! Alert batch assembly

use chrono::{DateTime, SecondsFormat, Utc};

use super::config::{AlertBatch, Violation, VitalSnapshot};
use crate::data::Reading;
use crate::rules::VitalName;

/// Builds outbound alert documents
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertComposer;

impl AlertComposer {
    pub fn new() -> Self {
        Self
    }

    /// Compose a batch for a reading with at least one violation
    pub fn compose(&self, reading: &Reading, violations: Vec<Violation>) -> AlertBatch {
        self.compose_at(reading, violations, Utc::now())
    }

    /// Compose a batch, using `now` when the reading carries no timestamp
    pub fn compose_at(
        &self,
        reading: &Reading,
        violations: Vec<Violation>,
        now: DateTime<Utc>,
    ) -> AlertBatch {
        debug_assert!(!violations.is_empty(), "alert batch without violations");

        let timestamp = match reading.timestamp() {
            Some(ts) if !ts.is_empty() => ts.to_string(),
            _ => now.to_rfc3339_opts(SecondsFormat::Micros, true),
        };

        let snapshot = VitalSnapshot {
            heart_rate: reading.value(VitalName::HeartRate),
            systolic_bp: reading.value(VitalName::SystolicBp),
            diastolic_bp: reading.value(VitalName::DiastolicBp),
            oxygen_sat: reading.value(VitalName::OxygenSat),
            temperature: reading.value(VitalName::Temperature),
        };

        AlertBatch {
            timestamp,
            snapshot,
            violation_count: violations.len(),
            violations,
        }
    }
}
