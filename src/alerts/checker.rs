//! Threshold evaluation

use std::sync::Arc;

use super::config::{BoundKind, Violation};
use crate::data::Reading;
use crate::rules::{RuleSet, VitalName};

/// Checks readings against a rule set
#[derive(Debug, Clone)]
pub struct ThresholdEvaluator {
    rules: Arc<RuleSet>,
}

impl ThresholdEvaluator {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Evaluate a reading, returning violations in canonical vital order.
    ///
    /// Absent vitals and vitals without a bound are skipped. Limits are
    /// inclusive: a value equal to `min` or `max` is safe.
    pub fn evaluate(&self, reading: &Reading) -> Vec<Violation> {
        let mut violations = Vec::new();

        for vital in VitalName::ALL {
            let Some(value) = reading.value(vital) else {
                continue;
            };
            let Some(bound) = self.rules.bound(vital) else {
                continue;
            };

            // Both sides are checked independently
            if let Some(min) = bound.min {
                if value < min {
                    violations.push(Violation::new(
                        vital,
                        value,
                        BoundKind::BelowMin,
                        min,
                        bound.unit.as_str(),
                    ));
                }
            }

            if let Some(max) = bound.max {
                if value > max {
                    violations.push(Violation::new(
                        vital,
                        value,
                        BoundKind::AboveMax,
                        max,
                        bound.unit.as_str(),
                    ));
                }
            }
        }

        violations
    }
}
