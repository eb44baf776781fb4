//! Closed sets of mode, intensity and safety-level values.
//!
//! Each parses case-insensitively from its wire name and serializes back to
//! the same lowercase name, so persisted snapshots and CLI arguments share
//! one vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    /// No bulk change; datasets are toggled individually.
    Custom,
}

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::Beginner,
        Mode::Intermediate,
        Mode::Advanced,
        Mode::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Beginner => "beginner",
            Mode::Intermediate => "intermediate",
            Mode::Advanced => "advanced",
            Mode::Custom => "custom",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::InvalidMode(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Gentle,
    #[default]
    Moderate,
    Deep,
    Advanced,
}

impl Intensity {
    pub const ALL: [Intensity; 4] = [
        Intensity::Gentle,
        Intensity::Moderate,
        Intensity::Deep,
        Intensity::Advanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Intensity::Gentle => "gentle",
            Intensity::Moderate => "moderate",
            Intensity::Deep => "deep",
            Intensity::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intensity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Intensity::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::InvalidIntensity(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    Maximum,
    #[default]
    Standard,
    AdvancedPractitioner,
}

impl SafetyLevel {
    pub const ALL: [SafetyLevel; 3] = [
        SafetyLevel::Maximum,
        SafetyLevel::Standard,
        SafetyLevel::AdvancedPractitioner,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SafetyLevel::Maximum => "maximum",
            SafetyLevel::Standard => "standard",
            SafetyLevel::AdvancedPractitioner => "advanced_practitioner",
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafetyLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SafetyLevel::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::InvalidSafetyLevel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Beginner".parse::<Mode>().unwrap(), Mode::Beginner);
        assert_eq!(" deep ".parse::<Intensity>().unwrap(), Intensity::Deep);
        assert_eq!(
            "ADVANCED_PRACTITIONER".parse::<SafetyLevel>().unwrap(),
            SafetyLevel::AdvancedPractitioner
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(
            "expert".parse::<Mode>(),
            Err(CoreError::InvalidMode("expert".to_string()))
        );
        assert!("extreme".parse::<Intensity>().is_err());
        assert!("none".parse::<SafetyLevel>().is_err());
    }

    #[test]
    fn test_serde_matches_display() {
        for level in SafetyLevel::ALL {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{level}\""));
        }
        for mode in Mode::ALL {
            let back: Mode = serde_json::from_str(&format!("\"{mode}\"")).unwrap();
            assert_eq!(back, mode);
        }
    }
}
