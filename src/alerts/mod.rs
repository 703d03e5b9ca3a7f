//! Threshold alerting
//!
//! Evaluates readings against the rule set and turns violations into
//! outbound alert batches.

pub mod checker;
pub mod composer;
pub mod config;
pub mod notifier;

pub use checker::ThresholdEvaluator;
pub use composer::AlertComposer;
pub use config::{AlertBatch, AlertLevel, BoundKind, Violation, VitalSnapshot};
pub use notifier::AlertNotifier;
