use std::collections::BTreeSet;

use crate::catalog::{Catalog, DatasetSelection, Preset};
use crate::dataset::DatasetRegistry;
use crate::levels::{Intensity, SafetyLevel};
use crate::profile::ExperienceProvider;
use crate::toggle::{Category, ToggleMap};

/// Complete state a preset produces. Built off to the side and committed
/// in one assignment, so readers never see a half-applied mode.
#[derive(Clone, Debug, PartialEq)]
pub struct PresetOutcome {
    pub toggles: ToggleMap,
    pub intensity: Intensity,
    pub safety_level: SafetyLevel,
}

/// Derive the toggle map, intensity and safety level for `preset`.
///
/// `All` sets every registered or tabled name to its eligibility (gated
/// names only when `experience` allows). `Only` switches every non-safety
/// name off and then the listed names on. Gentle intensity then forces the
/// catalog's blocked datasets off regardless of the list.
pub fn resolve_preset(
    current: &ToggleMap,
    registry: &DatasetRegistry,
    catalog: &Catalog,
    preset: &Preset,
    experience: &dyn ExperienceProvider,
) -> PresetOutcome {
    let mut toggles = current.clone();

    match &preset.datasets {
        DatasetSelection::All => {
            let names: BTreeSet<String> = registry
                .names()
                .into_iter()
                .chain(current.names())
                .map(str::to_string)
                .collect();
            for name in &names {
                let eligible = match toggles.category(name) {
                    Some(Category::ExperienceGated) => experience.qualifies(name),
                    _ => true,
                };
                toggles.force(name, eligible);
            }
        }
        DatasetSelection::Only(list) => {
            toggles.deactivate_all();
            for name in list {
                if !toggles.force(name, true) {
                    tracing::debug!("preset names '{name}' which has no toggle entry");
                }
            }
        }
    }

    apply_intensity(&mut toggles, catalog, preset.intensity);
    toggles.enforce_safety();

    PresetOutcome {
        toggles,
        intensity: preset.intensity,
        safety_level: preset.safety_level,
    }
}

/// Toggle side effects of an intensity change.
pub fn apply_intensity(toggles: &mut ToggleMap, catalog: &Catalog, intensity: Intensity) {
    if intensity == Intensity::Gentle {
        for name in &catalog.gentle_blocked {
            toggles.force(name, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::levels::Mode;

    fn fixture() -> (Catalog, DatasetRegistry, ToggleMap) {
        let catalog = Catalog::default();
        let mut registry = DatasetRegistry::new();
        for (name, value) in crate::generated::synthesized() {
            registry.load(name, value);
        }
        let mut toggles = ToggleMap::new();
        for spec in &catalog.toggles {
            toggles.register(&spec.name, spec.category, spec.default_active);
        }
        (catalog, registry, toggles)
    }

    #[test]
    fn test_only_list_is_exact_plus_safety() {
        let (catalog, registry, toggles) = fixture();
        let preset = catalog.preset(Mode::Beginner).unwrap();
        let out = resolve_preset(&toggles, &registry, &catalog, preset, &|_: &str| true);

        let active: Vec<&str> = out.toggles.active_names().collect();
        let mut expected = vec![
            ANGELS_72,
            CODEX_NODES,
            CRYSTAL_FREQUENCIES,
            EMERGENCY_EXITS,
            GROUNDING_TECHNIQUES,
            MYSTERY_HOUSE,
            TRAUMA_SAFEGUARDS,
        ];
        expected.sort_unstable();
        assert_eq!(active, expected);
        assert_eq!(out.intensity, Intensity::Gentle);
        assert_eq!(out.safety_level, SafetyLevel::Maximum);
    }

    #[test]
    fn test_all_respects_experience() {
        let (catalog, registry, mut toggles) = fixture();
        toggles.force(DAEMON_GUARDIANS, true);
        let preset = catalog.preset(Mode::Advanced).unwrap();

        let out = resolve_preset(&toggles, &registry, &catalog, preset, &|_: &str| false);
        assert!(!out.toggles.is_active(DAEMON_GUARDIANS));
        assert!(!out.toggles.is_active(ADVANCED_ALCHEMY));
        assert!(out.toggles.is_active(TAROT_INTEGRATION));
        assert!(out.toggles.is_active(TRAUMA_SAFEGUARDS));

        let out = resolve_preset(&toggles, &registry, &catalog, preset, &|_: &str| true);
        assert_eq!(out.toggles.active_names().count(), out.toggles.len());
    }

    #[test]
    fn test_gentle_overrides_list() {
        let (mut catalog, registry, toggles) = fixture();
        let mut preset = catalog.preset(Mode::Intermediate).unwrap().clone();
        preset.datasets = DatasetSelection::Only(vec![DAEMON_GUARDIANS.to_string()]);
        preset.intensity = Intensity::Gentle;
        catalog.presets.clear();

        let out = resolve_preset(&toggles, &registry, &catalog, &preset, &|_: &str| true);
        assert!(!out.toggles.is_active(DAEMON_GUARDIANS));
    }

    #[test]
    fn test_input_map_untouched() {
        let (catalog, registry, toggles) = fixture();
        let before = toggles.clone();
        let preset = catalog.preset(Mode::Beginner).unwrap();
        let _ = resolve_preset(&toggles, &registry, &catalog, preset, &|_: &str| true);
        assert_eq!(toggles, before);
    }
}
