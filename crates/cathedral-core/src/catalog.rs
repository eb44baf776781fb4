//! Static correspondence tables driving the controller.
//!
//! The built-in tables below are plain data. A deployment can replace them
//! wholesale with a TOML document via [`Catalog::from_toml_str`]; control
//! flow never branches on individual dataset names.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{CoreError, Result};
use crate::levels::{Intensity, Mode, SafetyLevel};
use crate::toggle::Category;

/// (name, category, default active, experience threshold)
const TOGGLE_TABLE: &[(&str, Category, bool, Option<u8>)] = &[
    (CODEX_NODES, Category::Standard, true, None),
    (ALCHEMY_OPERATIONS, Category::Standard, true, None),
    (CRYSTAL_FREQUENCIES, Category::Standard, true, None),
    (CHAKRA_SYSTEM, Category::Standard, true, None),
    (ANGELS_72, Category::Standard, true, None),
    (TARA_OVERLAYS, Category::Standard, true, None),
    (REIKI_SYMBOLS, Category::Standard, true, None),
    (MYSTERY_HOUSE, Category::Standard, true, None),
    (PORTAL_NETWORK, Category::Standard, true, None),
    (SACRED_GEOMETRY, Category::Standard, true, None),
    (TAROT_INTEGRATION, Category::Standard, true, None),
    (DAEMON_GUARDIANS, Category::ExperienceGated, false, Some(3)),
    (SHADOW_WORK_ELEMENTS, Category::ExperienceGated, false, Some(3)),
    (ADVANCED_ALCHEMY, Category::ExperienceGated, false, Some(4)),
    (TRAUMA_SAFEGUARDS, Category::Safety, true, None),
    (GROUNDING_TECHNIQUES, Category::Safety, true, None),
    (EMERGENCY_EXITS, Category::Safety, true, None),
];

const BEGINNER_DATASETS: &[&str] = &[CODEX_NODES, ANGELS_72, CRYSTAL_FREQUENCIES, MYSTERY_HOUSE];

const INTERMEDIATE_DATASETS: &[&str] = &[
    CODEX_NODES,
    ANGELS_72,
    ALCHEMY_OPERATIONS,
    CRYSTAL_FREQUENCIES,
    CHAKRA_SYSTEM,
    MYSTERY_HOUSE,
    PORTAL_NETWORK,
    SACRED_GEOMETRY,
];

/// Datasets `gentle` intensity always switches off.
const GENTLE_BLOCKED: &[&str] = &[DAEMON_GUARDIANS, SHADOW_WORK_ELEMENTS];

const EMERGENCY_DEACTIVATE: &[&str] = &[DAEMON_GUARDIANS, SHADOW_WORK_ELEMENTS, ADVANCED_ALCHEMY];
const EMERGENCY_ACTIVATE: &[&str] = &[ANGELS_72, CRYSTAL_FREQUENCIES, REIKI_SYMBOLS];

/// (keyword, element, frequency, angels, crystals, alchemy process)
const NEED_TABLE: &[(&str, &str, &str, &[&str], &[&str], &str)] = &[
    (
        "anxiety",
        "Air",
        "528Hz",
        &["Iezalel", "Hariel", "Caliel"],
        &["Amethyst", "Lepidolite", "Blue Lace Agate"],
        "separation",
    ),
    (
        "depression",
        "Water",
        "639Hz",
        &["Leuviah", "Pahaliah", "Nelchael"],
        &["Rose Quartz", "Sunstone", "Citrine"],
        "fermentation",
    ),
    (
        "trauma",
        "Earth",
        "396Hz",
        &["Achaiah", "Cahetel", "Haziel"],
        &["Black Tourmaline", "Smoky Quartz", "Hematite"],
        "calcination",
    ),
];

const SOURCE_TABLE: &[(&str, &str)] = &[
    (CODEX_NODES, "codex-sample-nodes.json"),
    (ANGELS_72, "angels-72-complete.json"),
    (ALCHEMY_OPERATIONS, "alchemy-complete.json"),
    (MYSTERY_HOUSE, "magical-mystery-house.json"),
    (PORTAL_NETWORK, "omniversal-respawn-gates.json"),
];

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleSpec {
    pub name: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default = "default_true")]
    pub default_active: bool,
    /// Only meaningful for `ExperienceGated` names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_level: Option<u8>,
}

/// Datasets a preset switches on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSelection {
    /// Every dataset the caller is experience-qualified for.
    All,
    /// Exactly these names (plus safety datasets).
    Only(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub mode: Mode,
    pub datasets: DatasetSelection,
    pub intensity: Intensity,
    pub safety_level: SafetyLevel,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyPlan {
    #[serde(default)]
    pub deactivate: Vec<String>,
    #[serde(default)]
    pub activate: Vec<String>,
}

/// Criteria a healing-need keyword expands to during search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingNeedEntry {
    pub keyword: String,
    pub element: String,
    pub frequency: String,
    #[serde(default)]
    pub angels: Vec<String>,
    #[serde(default)]
    pub crystals: Vec<String>,
    pub alchemy: String,
}

/// Where an externally loaded dataset comes from, relative to the source root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    pub location: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub toggles: Vec<ToggleSpec>,
    pub presets: Vec<Preset>,
    #[serde(default)]
    pub gentle_blocked: Vec<String>,
    #[serde(default)]
    pub emergency: EmergencyPlan,
    #[serde(default)]
    pub needs: Vec<HealingNeedEntry>,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for Catalog {
    fn default() -> Self {
        let toggles = TOGGLE_TABLE
            .iter()
            .map(|&(name, category, default_active, required_level)| ToggleSpec {
                name: name.to_string(),
                category,
                default_active,
                required_level,
            })
            .collect();

        let presets = vec![
            Preset {
                mode: Mode::Beginner,
                datasets: DatasetSelection::Only(owned(BEGINNER_DATASETS)),
                intensity: Intensity::Gentle,
                safety_level: SafetyLevel::Maximum,
            },
            Preset {
                mode: Mode::Intermediate,
                datasets: DatasetSelection::Only(owned(INTERMEDIATE_DATASETS)),
                intensity: Intensity::Moderate,
                safety_level: SafetyLevel::Standard,
            },
            Preset {
                mode: Mode::Advanced,
                datasets: DatasetSelection::All,
                intensity: Intensity::Deep,
                safety_level: SafetyLevel::Standard,
            },
        ];

        let needs = NEED_TABLE
            .iter()
            .map(
                |&(keyword, element, frequency, angels, crystals, alchemy)| HealingNeedEntry {
                    keyword: keyword.to_string(),
                    element: element.to_string(),
                    frequency: frequency.to_string(),
                    angels: owned(angels),
                    crystals: owned(crystals),
                    alchemy: alchemy.to_string(),
                },
            )
            .collect();

        let sources = SOURCE_TABLE
            .iter()
            .map(|&(name, location)| SourceSpec {
                name: name.to_string(),
                location: location.to_string(),
            })
            .collect();

        Self {
            toggles,
            presets,
            gentle_blocked: owned(GENTLE_BLOCKED),
            emergency: EmergencyPlan {
                deactivate: owned(EMERGENCY_DEACTIVATE),
                activate: owned(EMERGENCY_ACTIVATE),
            },
            needs,
            sources,
        }
    }
}

impl Catalog {
    /// Parse and validate a TOML catalog.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let catalog: Catalog =
            toml::from_str(content).map_err(|e| CoreError::Catalog(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Catalog(e.to_string()))
    }

    /// Check cross-table consistency.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for spec in &self.toggles {
            if !seen.insert(spec.name.as_str()) {
                return Err(CoreError::Catalog(format!(
                    "toggle '{}' listed twice",
                    spec.name
                )));
            }
            if spec.required_level.is_some() && spec.category != Category::ExperienceGated {
                return Err(CoreError::Catalog(format!(
                    "toggle '{}' has a threshold but is not experience-gated",
                    spec.name
                )));
            }
        }

        for mode in Mode::ALL {
            let count = self.presets.iter().filter(|p| p.mode == mode).count();
            let expected = usize::from(mode != Mode::Custom);
            if count != expected {
                return Err(CoreError::Catalog(format!(
                    "mode '{mode}' needs {expected} preset(s), found {count}"
                )));
            }
        }

        let referenced = self
            .gentle_blocked
            .iter()
            .chain(&self.emergency.deactivate)
            .chain(&self.emergency.activate);
        for name in referenced {
            if !seen.contains(name.as_str()) {
                return Err(CoreError::Catalog(format!(
                    "'{name}' is referenced but has no toggle entry"
                )));
            }
        }

        let mut keywords = HashSet::new();
        for need in &self.needs {
            if !keywords.insert(need.keyword.to_lowercase()) {
                return Err(CoreError::Catalog(format!(
                    "healing need '{}' listed twice",
                    need.keyword
                )));
            }
        }

        Ok(())
    }

    pub fn toggle(&self, name: &str) -> Option<&ToggleSpec> {
        self.toggles.iter().find(|t| t.name == name)
    }

    /// Category for a name; names outside the table are `Standard`.
    pub fn category(&self, name: &str) -> Category {
        self.toggle(name).map(|t| t.category).unwrap_or_default()
    }

    /// Threshold for experience-gated names, `None` for everything else.
    /// A gated name without an explicit threshold requires level 1.
    pub fn required_level(&self, name: &str) -> Option<u8> {
        self.toggle(name)
            .filter(|t| t.category == Category::ExperienceGated)
            .map(|t| t.required_level.unwrap_or(1))
    }

    pub fn preset(&self, mode: Mode) -> Option<&Preset> {
        self.presets.iter().find(|p| p.mode == mode)
    }

    /// Case-insensitive keyword lookup.
    pub fn need(&self, term: &str) -> Option<&HealingNeedEntry> {
        let term = term.trim();
        self.needs
            .iter()
            .find(|n| n.keyword.eq_ignore_ascii_case(term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        Catalog::default().validate().unwrap();
    }

    #[test]
    fn test_builtin_categories() {
        let catalog = Catalog::default();
        assert_eq!(catalog.category(TRAUMA_SAFEGUARDS), Category::Safety);
        assert_eq!(catalog.category(DAEMON_GUARDIANS), Category::ExperienceGated);
        assert_eq!(catalog.category(ANGELS_72), Category::Standard);
        assert_eq!(catalog.category("unlisted"), Category::Standard);
        assert_eq!(catalog.required_level(ANGELS_72), None);
        assert_eq!(catalog.required_level(ADVANCED_ALCHEMY), Some(4));
    }

    #[test]
    fn test_need_lookup_case_insensitive() {
        let catalog = Catalog::default();
        assert_eq!(catalog.need("ANXIETY").unwrap().element, "Air");
        assert_eq!(catalog.need(" trauma ").unwrap().frequency, "396Hz");
        assert!(catalog.need("boredom").is_none());
    }

    #[test]
    fn test_toml_roundtrip() {
        let catalog = Catalog::default();
        let text = catalog.to_toml_string().unwrap();
        let parsed = Catalog::from_toml_str(&text).unwrap();
        assert_eq!(parsed, catalog);
    }

    #[test]
    fn test_toml_minimal_catalog() {
        let text = r#"
            gentle_blocked = ["shadow"]

            [[toggles]]
            name = "notes"

            [[toggles]]
            name = "shadow"
            category = "experience_gated"
            default_active = false
            required_level = 2

            [[toggles]]
            name = "exits"
            category = "safety"

            [[presets]]
            mode = "beginner"
            datasets = { only = ["notes"] }
            intensity = "gentle"
            safety_level = "maximum"

            [[presets]]
            mode = "intermediate"
            datasets = { only = ["notes", "shadow"] }
            intensity = "moderate"
            safety_level = "standard"

            [[presets]]
            mode = "advanced"
            datasets = "all"
            intensity = "deep"
            safety_level = "advanced_practitioner"
        "#;
        let catalog = Catalog::from_toml_str(text).unwrap();
        assert_eq!(catalog.toggles.len(), 3);
        assert!(catalog.toggle("notes").unwrap().default_active);
        assert_eq!(catalog.required_level("shadow"), Some(2));
        assert_eq!(
            catalog.preset(Mode::Advanced).unwrap().datasets,
            DatasetSelection::All
        );
        assert!(catalog.needs.is_empty());
    }

    #[test]
    fn test_validate_rejects_missing_preset() {
        let mut catalog = Catalog::default();
        catalog.presets.retain(|p| p.mode != Mode::Advanced);
        assert!(matches!(catalog.validate(), Err(CoreError::Catalog(_))));
    }

    #[test]
    fn test_validate_rejects_custom_preset() {
        let mut catalog = Catalog::default();
        catalog.presets.push(Preset {
            mode: Mode::Custom,
            datasets: DatasetSelection::All,
            intensity: Intensity::Deep,
            safety_level: SafetyLevel::Standard,
        });
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_threshold_on_standard() {
        let mut catalog = Catalog::default();
        catalog.toggles[0].required_level = Some(2);
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_reference() {
        let mut catalog = Catalog::default();
        catalog.gentle_blocked.push("nonexistent".to_string());
        assert!(catalog.validate().is_err());
    }
}
