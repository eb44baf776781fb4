use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::Catalog;
use crate::levels::Mode;

/// Caller profile carried in the settings snapshot. Unrecognized fields are
/// kept in `extra` so a profile written by another consumer survives a
/// save/restore cycle untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub experience_level: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub completed_integrations: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn with_level(experience_level: u8) -> Self {
        Self {
            experience_level,
            ..Self::default()
        }
    }
}

/// Decides whether the caller may switch on an experience-gated dataset.
pub trait ExperienceProvider {
    fn qualifies(&self, dataset: &str) -> bool;
}

impl<F> ExperienceProvider for F
where
    F: Fn(&str) -> bool,
{
    fn qualifies(&self, dataset: &str) -> bool {
        self(dataset)
    }
}

/// Default experience rule.
///
/// Names without a threshold always qualify. Without a profile the caller
/// qualifies whenever the mode is not `beginner`; with one, the profile's
/// level must reach the dataset's threshold.
pub struct Experience<'a> {
    catalog: &'a Catalog,
    profile: Option<&'a UserProfile>,
    mode: Mode,
}

impl<'a> Experience<'a> {
    pub fn new(catalog: &'a Catalog, profile: Option<&'a UserProfile>, mode: Mode) -> Self {
        Self {
            catalog,
            profile,
            mode,
        }
    }
}

impl ExperienceProvider for Experience<'_> {
    fn qualifies(&self, dataset: &str) -> bool {
        let Some(required) = self.catalog.required_level(dataset) else {
            return true;
        };
        match self.profile {
            Some(profile) => profile.experience_level >= required,
            None => self.mode != Mode::Beginner,
        }
    }
}
