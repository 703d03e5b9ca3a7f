//! Rule table types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::vital::VitalName;
use crate::data::Measure;

/// Safe range for one vital
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    /// Lowest safe value (inclusive)
    pub min: Option<Measure>,
    /// Highest safe value (inclusive)
    pub max: Option<Measure>,
    /// Display unit
    pub unit: String,
}

impl Bound {
    /// Create a bound with both limits
    pub fn range(min: impl Into<Measure>, max: impl Into<Measure>, unit: impl Into<String>) -> Self {
        Self {
            min: Some(min.into()),
            max: Some(max.into()),
            unit: unit.into(),
        }
    }

    /// Create a bound with only a lower limit
    pub fn at_least(min: impl Into<Measure>, unit: impl Into<String>) -> Self {
        Self {
            min: Some(min.into()),
            max: None,
            unit: unit.into(),
        }
    }

    /// Create a bound with only an upper limit
    pub fn at_most(max: impl Into<Measure>, unit: impl Into<String>) -> Self {
        Self {
            min: None,
            max: Some(max.into()),
            unit: unit.into(),
        }
    }

    fn validate(&self, vital: VitalName) -> Result<(), RuleError> {
        if self.unit.trim().is_empty() {
            return Err(RuleError::MissingUnit(vital));
        }
        match (&self.min, &self.max) {
            (None, None) => Err(RuleError::Unbounded(vital)),
            (Some(min), Some(max)) if min.as_f64() >= max.as_f64() => Err(RuleError::InvertedRange {
                vital,
                min: *min,
                max: *max,
            }),
            _ => Ok(()),
        }
    }
}

/// Immutable per-vital bounds, shared read-only by every evaluation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleSet {
    bounds: BTreeMap<VitalName, Bound>,
}

impl RuleSet {
    /// Rule set with no bounds; every reading passes
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a rule set from an alternate table, validating every entry
    pub fn new(bounds: impl IntoIterator<Item = (VitalName, Bound)>) -> Result<Self, RuleError> {
        bounds
            .into_iter()
            .try_fold(Self::empty(), |rules, (vital, bound)| rules.with_bound(vital, bound))
    }

    /// The clinical defaults the service ships with
    pub fn clinical_defaults() -> Self {
        let bounds = [
            (VitalName::HeartRate, Bound::range(50, 120, "BPM")),
            (VitalName::SystolicBp, Bound::range(90, 140, "mmHg")),
            (VitalName::DiastolicBp, Bound::range(60, 90, "mmHg")),
            (VitalName::OxygenSat, Bound::range(92, 100, "%")),
            (VitalName::Temperature, Bound::range(36.0, 38.0, "°C")),
        ];
        Self {
            bounds: bounds.into_iter().collect(),
        }
    }

    /// Add or replace the bound for a vital
    pub fn with_bound(mut self, vital: VitalName, bound: Bound) -> Result<Self, RuleError> {
        bound.validate(vital)?;
        self.bounds.insert(vital, bound);
        Ok(self)
    }

    /// Bound configured for a vital, if any
    pub fn bound(&self, vital: VitalName) -> Option<&Bound> {
        self.bounds.get(&vital)
    }

    /// Bounds in canonical vital order
    pub fn iter(&self) -> impl Iterator<Item = (VitalName, &Bound)> {
        self.bounds.iter().map(|(vital, bound)| (*vital, bound))
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

/// Invalid rule table entries
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Bound for {0} has an empty unit")]
    MissingUnit(VitalName),

    #[error("Bound for {0} has neither min nor max")]
    Unbounded(VitalName),

    #[error("Bound for {vital} has min {min} not below max {max}")]
    InvertedRange {
        vital: VitalName,
        min: Measure,
        max: Measure,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clinical_defaults() {
        let rules = RuleSet::clinical_defaults();
        assert_eq!(rules.len(), 5);

        let hr = rules.bound(VitalName::HeartRate).unwrap();
        assert_eq!(hr.min, Some(Measure::Int(50)));
        assert_eq!(hr.max, Some(Measure::Int(120)));
        assert_eq!(hr.unit, "BPM");

        let temp = rules.bound(VitalName::Temperature).unwrap();
        assert_eq!(temp.min.unwrap().to_string(), "36.0");
        assert_eq!(temp.unit, "°C");
    }

    #[test]
    fn test_defaults_satisfy_invariants() {
        let rules = RuleSet::clinical_defaults();
        for (vital, bound) in rules.iter() {
            assert!(bound.validate(vital).is_ok(), "{} is invalid", vital);
        }
    }

    #[test]
    fn test_iter_is_canonical() {
        let order: Vec<VitalName> = RuleSet::clinical_defaults().iter().map(|(v, _)| v).collect();
        assert_eq!(order, VitalName::ALL.to_vec());
    }

    #[test]
    fn test_rejects_invalid_bounds() {
        let err = RuleSet::empty()
            .with_bound(VitalName::HeartRate, Bound::range(120, 50, "BPM"))
            .unwrap_err();
        assert!(matches!(err, RuleError::InvertedRange { .. }));

        let err = RuleSet::empty()
            .with_bound(VitalName::HeartRate, Bound::range(50, 50, "BPM"))
            .unwrap_err();
        assert!(matches!(err, RuleError::InvertedRange { .. }));

        let err = RuleSet::empty()
            .with_bound(VitalName::OxygenSat, Bound::at_least(92, ""))
            .unwrap_err();
        assert!(matches!(err, RuleError::MissingUnit(VitalName::OxygenSat)));

        let unbounded = Bound {
            min: None,
            max: None,
            unit: "BPM".to_string(),
        };
        let err = RuleSet::new([(VitalName::HeartRate, unbounded)]).unwrap_err();
        assert!(matches!(err, RuleError::Unbounded(VitalName::HeartRate)));
    }

    #[test]
    fn test_alternate_table() {
        let rules = RuleSet::new([
            (VitalName::HeartRate, Bound::at_most(100, "BPM")),
            (VitalName::OxygenSat, Bound::at_least(95, "%")),
        ])
        .unwrap();

        assert_eq!(rules.len(), 2);
        assert!(rules.bound(VitalName::Temperature).is_none());
        assert!(rules.bound(VitalName::HeartRate).unwrap().min.is_none());
    }
}
