//! VitalWatch: Vital-Sign Threshold Alerting
//!
//! Consumes vital-sign readings from an MQTT topic, checks each one against
//! a fixed table of clinical ranges and publishes an alert batch whenever a
//! vital falls outside its range. Every message is evaluated on its own; no
//! history is kept between readings.
//!
//! # Features
//!
//! - **Rule Table**: Per-vital min/max bounds with units, immutable at runtime
//! - **Deterministic Evaluation**: Violations reported in canonical vital order
//! - **Verbatim Echo**: Observed values and thresholds keep their JSON shape
//! - **Resilient Channel**: Bad payloads are dropped, subscriptions survive reconnects
//! - **Publish Policy**: Drop failed alerts or park them in a bounded retry queue
//! - **Health API**: Connection status, counters and the active rule table
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vitalwatch::alerts::ThresholdEvaluator;
//! use vitalwatch::data::Reading;
//! use vitalwatch::rules::RuleSet;
//!
//! let evaluator = ThresholdEvaluator::new(Arc::new(RuleSet::clinical_defaults()));
//!
//! let reading = Reading::decode(br#"{"heart_rate": 135, "oxygen_sat": 98}"#).unwrap();
//! let violations = evaluator.evaluate(&reading);
//!
//! assert_eq!(violations.len(), 1);
//! assert_eq!(violations[0].message, "Heart Rate too high: 135 BPM (max: 120)");
//! ```

pub mod alerts;
pub mod api;
pub mod data;
pub mod ingest;
pub mod rules;
pub mod service;

// Re-export commonly used types
pub use alerts::{AlertBatch, AlertComposer, ThresholdEvaluator, Violation};
pub use data::{Measure, Reading};
pub use ingest::{MqttChannel, MqttConfig, PublishPolicy};
pub use rules::{Bound, RuleSet, VitalName};
