use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Numeric observation or threshold, kept in the shape it arrived in.
///
/// JSON integers stay integers and decimals stay decimals, so a reading of
/// `75` is echoed back as `75` and a bound of `36.0` prints as `36.0`.
/// Comparisons go through `f64`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measure {
    Int(i64),
    Float(f64),
}

impl Measure {
    pub fn as_f64(&self) -> f64 {
        match self {
            Measure::Int(v) => *v as f64,
            Measure::Float(v) => *v,
        }
    }
}

impl From<i64> for Measure {
    fn from(v: i64) -> Self {
        Measure::Int(v)
    }
}

impl From<i32> for Measure {
    fn from(v: i32) -> Self {
        Measure::Int(v as i64)
    }
}

impl From<f64> for Measure {
    fn from(v: f64) -> Self {
        Measure::Float(v)
    }
}

impl PartialEq for Measure {
    fn eq(&self, other: &Self) -> bool {
        self.as_f64() == other.as_f64()
    }
}

impl PartialOrd for Measure {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.as_f64().partial_cmp(&other.as_f64())
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Int(v) => write!(f, "{}", v),
            // Debug keeps the trailing ".0" on whole floats
            Measure::Float(v) => write!(f, "{:?}", v),
        }
    }
}
