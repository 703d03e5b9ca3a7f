//! Clinical range rules
//!
//! A fixed table of per-vital bounds, built once at startup and shared
//! read-only by every evaluation.

pub mod config;
pub mod vital;

pub use config::{Bound, RuleError, RuleSet};
pub use vital::{UnknownVital, VitalName};
