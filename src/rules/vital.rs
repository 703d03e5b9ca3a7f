use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tracked vital-sign channels, declared in canonical evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalName {
    HeartRate,
    SystolicBp,
    DiastolicBp,
    OxygenSat,
    Temperature,
}

impl VitalName {
    /// Every vital, in the order evaluation walks them
    pub const ALL: [VitalName; 5] = [
        VitalName::HeartRate,
        VitalName::SystolicBp,
        VitalName::DiastolicBp,
        VitalName::OxygenSat,
        VitalName::Temperature,
    ];

    /// Key used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            VitalName::HeartRate => "heart_rate",
            VitalName::SystolicBp => "systolic_bp",
            VitalName::DiastolicBp => "diastolic_bp",
            VitalName::OxygenSat => "oxygen_sat",
            VitalName::Temperature => "temperature",
        }
    }

    /// Human label used in alert messages
    pub fn title(&self) -> &'static str {
        match self {
            VitalName::HeartRate => "Heart Rate",
            VitalName::SystolicBp => "Systolic Bp",
            VitalName::DiastolicBp => "Diastolic Bp",
            VitalName::OxygenSat => "Oxygen Sat",
            VitalName::Temperature => "Temperature",
        }
    }
}

impl fmt::Display for VitalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VitalName {
    type Err = UnknownVital;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VitalName::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVital(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown vital: {0}")]
pub struct UnknownVital(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_matches_ord() {
        let mut sorted = VitalName::ALL;
        sorted.sort();
        assert_eq!(sorted, VitalName::ALL);
    }

    #[test]
    fn test_round_trip_names() {
        for vital in VitalName::ALL {
            assert_eq!(vital.as_str().parse::<VitalName>().unwrap(), vital);
            assert_eq!(
                serde_json::to_string(&vital).unwrap(),
                format!("\"{}\"", vital.as_str())
            );
        }
        assert!("pulse".parse::<VitalName>().is_err());
    }

    #[test]
    fn test_titles() {
        assert_eq!(VitalName::HeartRate.title(), "Heart Rate");
        assert_eq!(VitalName::OxygenSat.title(), "Oxygen Sat");
    }
}
