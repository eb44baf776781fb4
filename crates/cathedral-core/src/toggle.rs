use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::profile::ExperienceProvider;

/// Fixed classification of a toggle name. Assigned from the catalog at
/// startup and never changed afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Standard,
    /// Always on. Any attempt to switch it off is refused.
    Safety,
    /// Can only be switched on once the caller meets the name's threshold.
    ExperienceGated,
}

/// Requested value for a toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Desired {
    On,
    Off,
    Flip,
}

impl Desired {
    fn resolve(self, current: bool) -> bool {
        match self {
            Desired::On => true,
            Desired::Off => false,
            Desired::Flip => !current,
        }
    }
}

impl From<bool> for Desired {
    fn from(active: bool) -> Self {
        if active { Desired::On } else { Desired::Off }
    }
}

impl From<Option<bool>> for Desired {
    fn from(active: Option<bool>) -> Self {
        active.map_or(Desired::Flip, Desired::from)
    }
}

/// Why a toggle request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    UnknownDataset,
    SafetyProtected,
    ExperienceRequired,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Rejection::UnknownDataset => "unknown dataset",
            Rejection::SafetyProtected => "safety datasets cannot be deactivated",
            Rejection::ExperienceRequired => "more experience required",
        };
        f.write_str(reason)
    }
}

/// Outcome of a toggle request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Applied { active: bool },
    Rejected(Rejection),
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToggleEntry {
    pub name: String,
    pub active: bool,
    pub category: Category,
}

/// Name → toggle state. Entries are private so every write goes through a
/// method that keeps `Safety` entries switched on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToggleMap {
    entries: BTreeMap<String, ToggleEntry>,
}

impl ToggleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry if the name is not present yet. Safety entries are
    /// always created active. Returns whether an entry was inserted.
    pub fn register(&mut self, name: &str, category: Category, active: bool) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        let active = active || category == Category::Safety;
        self.entries.insert(
            name.to_string(),
            ToggleEntry {
                name: name.to_string(),
                active,
                category,
            },
        );
        true
    }

    /// `false` for unknown names.
    pub fn is_active(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.active)
    }

    pub fn category(&self, name: &str) -> Option<Category> {
        self.entries.get(name).map(|e| e.category)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn active_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .values()
            .filter(|e| e.active)
            .map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = &ToggleEntry> {
        self.entries.values()
    }

    /// User-facing transition: honors both the safety lock and the
    /// experience gate.
    pub fn set_active(
        &mut self,
        name: &str,
        desired: Desired,
        experience: &dyn ExperienceProvider,
    ) -> Transition {
        let Some(entry) = self.entries.get_mut(name) else {
            return Transition::Rejected(Rejection::UnknownDataset);
        };
        let active = desired.resolve(entry.active);

        match entry.category {
            Category::Safety if !active => Transition::Rejected(Rejection::SafetyProtected),
            Category::ExperienceGated if active && !experience.qualifies(name) => {
                Transition::Rejected(Rejection::ExperienceRequired)
            }
            _ => {
                entry.active = active;
                Transition::Applied { active }
            }
        }
    }

    /// Preset-level write: bypasses the experience gate but never turns a
    /// safety entry off. Unknown names are ignored. Returns whether the
    /// stored value now equals `active`.
    pub fn force(&mut self, name: &str, active: bool) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) if entry.category == Category::Safety => active,
            Some(entry) => {
                entry.active = active;
                true
            }
            None => false,
        }
    }

    /// Switch every non-safety entry off.
    pub fn deactivate_all(&mut self) {
        for entry in self.entries.values_mut() {
            if entry.category != Category::Safety {
                entry.active = false;
            }
        }
    }

    /// Re-assert the safety invariant.
    pub fn enforce_safety(&mut self) {
        for entry in self.entries.values_mut() {
            if entry.category == Category::Safety {
                entry.active = true;
            }
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, bool> {
        self.entries
            .values()
            .map(|e| (e.name.clone(), e.active))
            .collect()
    }

    /// Overlay saved values onto known names. Unknown names are skipped and
    /// safety entries stay on. Returns the number of names applied.
    pub fn restore(&mut self, saved: &BTreeMap<String, bool>) -> usize {
        let mut applied = 0;
        for (name, &active) in saved {
            if !self.contains(name) {
                tracing::debug!("ignoring saved toggle for unknown dataset '{name}'");
                continue;
            }
            self.force(name, active);
            applied += 1;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qualified(_: &str) -> bool {
        true
    }

    fn unqualified(_: &str) -> bool {
        false
    }

    fn make_map() -> ToggleMap {
        let mut map = ToggleMap::new();
        map.register("crystals", Category::Standard, true);
        map.register("safeguards", Category::Safety, true);
        map.register("shadow", Category::ExperienceGated, false);
        map
    }

    #[test]
    fn test_unknown_name_is_inactive() {
        let map = make_map();
        assert!(!map.is_active("nope"));
        assert_eq!(map.category("nope"), None);
    }

    #[test]
    fn test_standard_toggle_is_reversible() {
        let mut map = make_map();
        assert!(map.set_active("crystals", Desired::Off, &qualified).is_applied());
        assert!(!map.is_active("crystals"));
        assert!(map.set_active("crystals", Desired::On, &qualified).is_applied());
        assert!(map.set_active("crystals", Desired::On, &qualified).is_applied());
        assert!(map.is_active("crystals"));
    }

    #[test]
    fn test_flip_negates_current() {
        let mut map = make_map();
        assert_eq!(
            map.set_active("crystals", Desired::Flip, &qualified),
            Transition::Applied { active: false }
        );
        assert_eq!(
            map.set_active("crystals", Desired::Flip, &qualified),
            Transition::Applied { active: true }
        );
    }

    #[test]
    fn test_safety_cannot_be_disabled() {
        let mut map = make_map();
        assert_eq!(
            map.set_active("safeguards", Desired::Off, &qualified),
            Transition::Rejected(Rejection::SafetyProtected)
        );
        assert_eq!(
            map.set_active("safeguards", Desired::Flip, &qualified),
            Transition::Rejected(Rejection::SafetyProtected)
        );
        assert!(!map.force("safeguards", false));
        map.deactivate_all();
        assert!(map.is_active("safeguards"));
    }

    #[test]
    fn test_gated_requires_experience() {
        let mut map = make_map();
        assert_eq!(
            map.set_active("shadow", Desired::On, &unqualified),
            Transition::Rejected(Rejection::ExperienceRequired)
        );
        assert!(!map.is_active("shadow"));
        assert!(map.set_active("shadow", Desired::On, &qualified).is_applied());
        // switching off never needs experience
        assert!(map.set_active("shadow", Desired::Off, &unqualified).is_applied());
    }

    #[test]
    fn test_unknown_name_rejected() {
        let mut map = make_map();
        assert_eq!(
            map.set_active("nope", Desired::On, &qualified),
            Transition::Rejected(Rejection::UnknownDataset)
        );
        assert!(!map.contains("nope"));
    }

    #[test]
    fn test_register_safety_forces_active() {
        let mut map = ToggleMap::new();
        map.register("exits", Category::Safety, false);
        assert!(map.is_active("exits"));
        assert!(!map.register("exits", Category::Standard, false));
    }

    #[test]
    fn test_restore_skips_unknown_and_keeps_safety() {
        let mut map = make_map();
        let saved = BTreeMap::from([
            ("crystals".to_string(), false),
            ("safeguards".to_string(), false),
            ("ghost".to_string(), true),
        ]);
        let applied = map.restore(&saved);
        assert_eq!(applied, 2);
        assert!(!map.is_active("crystals"));
        assert!(map.is_active("safeguards"));
        assert!(!map.contains("ghost"));
    }
}
