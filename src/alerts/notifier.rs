//! Log output for published alerts

use super::config::AlertBatch;

/// Writes published alert batches to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertNotifier;

impl AlertNotifier {
    pub fn new() -> Self {
        Self
    }

    /// Log a batch that was handed to the outbound topic
    pub fn notify(&self, batch: &AlertBatch, topic: &str) {
        tracing::warn!(
            timestamp = %batch.timestamp,
            alert_count = batch.violation_count,
            "Alert detected"
        );

        for violation in &batch.violations {
            tracing::warn!(
                severity = violation.level.as_str(),
                vital = %violation.vital,
                "{}",
                violation.message
            );
        }

        tracing::info!(topic = %topic, "Alert published");
    }
}
