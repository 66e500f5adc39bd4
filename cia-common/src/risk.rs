//! Risk score and risk level classification for impact cards
//!
//! Scores live on a 0-100 scale. Levels are derived from the score:
//!
//! | Score   | Level    |
//! |---------|----------|
//! | 0-29    | low      |
//! | 30-59   | medium   |
//! | 60-79   | high     |
//! | 80-100  | critical |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Upper bound of the risk scale
pub const MAX_RISK_SCORE: i64 = 100;

/// Risk level of an impact card
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// All levels in ascending severity
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn from_score(score: RiskScore) -> Self {
        match score.value() {
            0..=29 => RiskLevel::Low,
            30..=59 => RiskLevel::Medium,
            60..=79 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(Error::InvalidInput(format!("Unknown risk level: {}", other))),
        }
    }
}

/// A risk score guaranteed to be within 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct RiskScore(i64);

impl RiskScore {
    pub fn new(value: i64) -> Result<Self, Error> {
        if (0..=MAX_RISK_SCORE).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidInput(format!(
                "Risk score {} outside 0..={}",
                value, MAX_RISK_SCORE
            )))
        }
    }

    /// Round and clamp an arbitrary computed value onto the scale. NaN maps to 0.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self(0);
        }
        Self(value.round().clamp(0.0, MAX_RISK_SCORE as f64) as i64)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn level(&self) -> RiskLevel {
        RiskLevel::from_score(*self)
    }
}

impl TryFrom<i64> for RiskScore {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        RiskScore::new(value)
    }
}

impl From<RiskScore> for i64 {
    fn from(score: RiskScore) -> Self {
        score.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(score: i64) -> RiskLevel {
        RiskScore::new(score).unwrap().level()
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level(0), RiskLevel::Low);
        assert_eq!(level(29), RiskLevel::Low);
        assert_eq!(level(30), RiskLevel::Medium);
        assert_eq!(level(59), RiskLevel::Medium);
        assert_eq!(level(60), RiskLevel::High);
        assert_eq!(level(79), RiskLevel::High);
        assert_eq!(level(80), RiskLevel::Critical);
        assert_eq!(level(100), RiskLevel::Critical);
    }

    #[test]
    fn test_score_rejects_out_of_range() {
        assert!(RiskScore::new(-1).is_err());
        assert!(RiskScore::new(101).is_err());
    }

    #[test]
    fn test_clamped() {
        assert_eq!(RiskScore::clamped(-12.0).value(), 0);
        assert_eq!(RiskScore::clamped(42.6).value(), 43);
        assert_eq!(RiskScore::clamped(250.0).value(), 100);
        assert_eq!(RiskScore::clamped(f64::NAN).value(), 0);
    }

    #[test]
    fn test_level_parse_and_display() {
        assert_eq!("HIGH".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert_eq!(RiskLevel::Critical.to_string(), "critical");
        assert!("severe".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_serde_rejects_invalid_score() {
        assert!(serde_json::from_str::<RiskScore>("150").is_err());
        let score: RiskScore = serde_json::from_str("75").unwrap();
        assert_eq!(score.level(), RiskLevel::High);
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"medium\"");
    }
}
