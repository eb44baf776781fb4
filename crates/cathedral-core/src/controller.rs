//! The dataset access controller: one explicitly constructed context object
//! owning the registry, the toggle map, the session scalars and the
//! settings store.
//!
//! Every mutating method is synchronous and completes before returning.
//! Hosts that share a controller across tasks wrap it in a single
//! exclusive lock; bulk changes are planned on a copy of the toggle map and
//! committed in one assignment, so a reader holding the lock never sees a
//! half-applied preset.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::catalog::Catalog;
use crate::constants::*;
use crate::correlation::{CorrelationEngine, NeedSearch};
use crate::dataset::{DatasetRegistry, DatasetSource, LoadReport};
use crate::error::Result;
use crate::generated::synthesized;
use crate::levels::{Intensity, Mode, SafetyLevel};
use crate::preset::{PresetOutcome, apply_intensity, resolve_preset};
use crate::profile::{Experience, ExperienceProvider, UserProfile};
use crate::snapshot::{PersistedSnapshot, SettingsStore};
use crate::time::now_unix_millis;
use crate::toggle::{Category, Desired, ToggleEntry, ToggleMap, Transition};

/// Offered whenever emergency gentle mode engages.
pub const GROUNDING_PRACTICES: &[&str] = &[
    "5-4-3-2-1 sensory grounding",
    "Deep belly breathing with your guardian angel",
    "Hold a grounding crystal (virtually or physically)",
    "Listen to 396Hz grounding frequency",
    "Visualize roots growing from your feet into the earth",
];

/// Node and angel to dwell on for a given day of the year.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyFocus {
    pub day_of_year: u32,
    pub node_id: u32,
    pub primary_node: Option<Value>,
    pub supporting_angel: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ControllerStatus {
    pub mode: Mode,
    pub intensity: Intensity,
    pub safety_level: SafetyLevel,
    pub profile: Option<UserProfile>,
    pub toggles: Vec<ToggleEntry>,
    pub registered: Vec<String>,
    pub failed_loads: Vec<String>,
}

pub struct Controller {
    catalog: Catalog,
    registry: DatasetRegistry,
    toggles: ToggleMap,
    mode: Mode,
    intensity: Intensity,
    safety_level: SafetyLevel,
    profile: Option<UserProfile>,
    store: Option<Box<dyn SettingsStore>>,
}

impl Controller {
    /// Controller with the catalog's toggle defaults and the synthesized
    /// datasets registered. Sourced datasets arrive via [`Self::load_datasets`].
    pub fn new(catalog: Catalog) -> Self {
        let mut toggles = ToggleMap::new();
        for spec in &catalog.toggles {
            toggles.register(&spec.name, spec.category, spec.default_active);
        }
        // Sourced names need an entry before a saved snapshot is restored,
        // even when they have not been fetched yet.
        for source in &catalog.sources {
            toggles.register(&source.name, catalog.category(&source.name), false);
        }

        let mut registry = DatasetRegistry::new();
        for (name, dataset) in synthesized() {
            registry.load(name, dataset);
        }

        let mut controller = Self {
            catalog,
            registry,
            toggles,
            mode: Mode::default(),
            intensity: Intensity::default(),
            safety_level: SafetyLevel::default(),
            profile: None,
            store: None,
        };
        controller.register_untabled();
        controller
    }

    pub fn with_store(mut self, store: impl SettingsStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Fetch every catalog source. Failures are recorded and skipped; when
    /// at least half of the sources fail the controller drops into
    /// emergency gentle mode.
    pub fn load_datasets(&mut self, source: &dyn DatasetSource) -> LoadReport {
        let mut report = LoadReport::default();
        let sources = self.catalog.sources.clone();

        for spec in &sources {
            match self.registry.load_from(spec, source) {
                Ok(()) => {
                    tracing::debug!("loaded dataset '{}' from {}", spec.name, spec.location);
                    report.loaded.push(spec.name.clone());
                }
                Err(e) => {
                    tracing::warn!("{e}");
                    report.failed.push(e);
                }
            }
        }
        self.register_untabled();

        if report.attempted() > 0 && report.failure_ratio() >= EMERGENCY_FAILURE_RATIO {
            tracing::warn!(
                "{} of {} datasets failed to load, falling back to emergency gentle mode",
                report.failed.len(),
                report.attempted()
            );
            self.activate_emergency_gentle_mode();
        } else {
            tracing::info!(
                "loaded {} datasets ({} failed)",
                report.loaded.len(),
                report.failed.len()
            );
        }
        report
    }

    /// Registered names without a catalog entry get a Standard toggle, off.
    fn register_untabled(&mut self) {
        for name in self.registry.names() {
            if self.toggles.register(name, Category::Standard, false) {
                tracing::debug!("dataset '{name}' has no catalog entry, registered inactive");
            }
        }
    }

    // --- toggles ---

    pub fn is_active(&self, name: &str) -> bool {
        self.toggles.is_active(name)
    }

    /// Gated transition for one dataset. A successful change is persisted.
    pub fn toggle(&mut self, name: &str, desired: Desired) -> Transition {
        let experience = Experience::new(&self.catalog, self.profile.as_ref(), self.mode);
        let transition = self.toggles.set_active(name, desired, &experience);

        match transition {
            Transition::Applied { active } => {
                tracing::info!("dataset '{name}' {}", if active { "activated" } else { "deactivated" });
                self.persist();
            }
            Transition::Rejected(reason) => {
                tracing::warn!("toggle of '{name}' rejected: {reason}");
            }
        }
        transition
    }

    /// `None` flips the current value.
    pub fn toggle_dataset(&mut self, name: &str, desired: Option<bool>) -> bool {
        self.toggle(name, desired.into()).is_applied()
    }

    // --- mode, intensity, safety ---

    pub fn set_mode(&mut self, mode: &str) -> bool {
        match mode.parse::<Mode>() {
            Ok(mode) => self.apply_mode(mode),
            Err(e) => {
                tracing::warn!("{e}");
                false
            }
        }
    }

    /// Apply a preset using the controller's own experience rule, evaluated
    /// against the mode being applied.
    pub fn apply_mode(&mut self, mode: Mode) -> bool {
        if mode == Mode::Custom {
            return self.enter_custom();
        }
        let experience = Experience::new(&self.catalog, self.profile.as_ref(), mode);
        let outcome = self.plan_mode(mode, &experience);
        self.commit_mode(mode, outcome)
    }

    pub fn apply_mode_with(&mut self, mode: Mode, experience: &dyn ExperienceProvider) -> bool {
        if mode == Mode::Custom {
            return self.enter_custom();
        }
        let outcome = self.plan_mode(mode, experience);
        self.commit_mode(mode, outcome)
    }

    /// Custom carries no preset; toggles and scalars stay as they are.
    fn enter_custom(&mut self) -> bool {
        self.mode = Mode::Custom;
        tracing::info!("mode set to custom");
        true
    }

    fn plan_mode(&self, mode: Mode, experience: &dyn ExperienceProvider) -> Option<PresetOutcome> {
        let Some(preset) = self.catalog.preset(mode) else {
            tracing::warn!("catalog has no preset for mode '{mode}'");
            return None;
        };
        Some(resolve_preset(
            &self.toggles,
            &self.registry,
            &self.catalog,
            preset,
            experience,
        ))
    }

    fn commit_mode(&mut self, mode: Mode, outcome: Option<PresetOutcome>) -> bool {
        let Some(outcome) = outcome else {
            return false;
        };
        self.toggles = outcome.toggles;
        self.intensity = outcome.intensity;
        self.safety_level = outcome.safety_level;
        self.mode = mode;
        tracing::info!(
            "mode set to {mode} ({} datasets active, intensity {}, safety {})",
            self.toggles.active_names().count(),
            self.intensity,
            self.safety_level
        );
        true
    }

    pub fn set_intensity(&mut self, level: &str) -> bool {
        match level.parse::<Intensity>() {
            Ok(level) => {
                self.apply_intensity(level);
                true
            }
            Err(e) => {
                tracing::warn!("{e}");
                false
            }
        }
    }

    /// Gentle switches the blocked datasets off. Leaving gentle does not
    /// switch them back on.
    pub fn apply_intensity(&mut self, level: Intensity) {
        apply_intensity(&mut self.toggles, &self.catalog, level);
        self.intensity = level;
        tracing::info!("intensity set to {level}");
    }

    pub fn set_safety_level(&mut self, level: &str) -> bool {
        match level.parse::<SafetyLevel>() {
            Ok(level) => {
                self.apply_safety_level(level);
                true
            }
            Err(e) => {
                tracing::warn!("{e}");
                false
            }
        }
    }

    pub fn apply_safety_level(&mut self, level: SafetyLevel) {
        self.safety_level = level;
        self.toggles.enforce_safety();
        tracing::info!("safety level set to {level}");
    }

    /// Switch challenge datasets off and supportive ones on, then force
    /// gentle intensity and maximum safety. Returns the grounding practices
    /// to offer.
    pub fn activate_emergency_gentle_mode(&mut self) -> &'static [&'static str] {
        tracing::warn!("emergency gentle mode activated");
        let mut toggles = self.toggles.clone();
        for name in &self.catalog.emergency.deactivate {
            toggles.force(name, false);
        }
        for name in &self.catalog.emergency.activate {
            toggles.force(name, true);
        }
        apply_intensity(&mut toggles, &self.catalog, Intensity::Gentle);
        toggles.enforce_safety();

        self.toggles = toggles;
        self.intensity = Intensity::Gentle;
        self.safety_level = SafetyLevel::Maximum;
        GROUNDING_PRACTICES
    }

    pub fn grounding_techniques(&self) -> &'static [&'static str] {
        GROUNDING_PRACTICES
    }

    // --- queries ---

    pub fn correlation(&self) -> CorrelationEngine<'_> {
        CorrelationEngine::new(&self.registry, &self.toggles, &self.catalog)
    }

    pub fn get_node(&self, id: u32, include_connections: bool) -> Option<Value> {
        self.correlation().resolve_entity(id, include_connections)
    }

    /// `None` correlates against every active dataset.
    pub fn get_correlations(&self, id: u32, types: Option<&[&str]>) -> BTreeMap<String, Vec<Value>> {
        let engine = self.correlation();
        match types {
            Some(types) if !types.is_empty() => engine.correlate(id, types),
            _ => engine.correlate_active(id),
        }
    }

    pub fn search_by_healing(&self, term: &str) -> NeedSearch {
        self.correlation().search_by_need(term)
    }

    pub fn active_dataset(&self, name: &str) -> Option<&Value> {
        self.correlation().active_dataset(name)
    }

    pub fn active_datasets(&self) -> BTreeMap<&str, &Value> {
        self.toggles
            .active_names()
            .filter_map(|name| self.registry.get(name).map(|d| (name, d)))
            .collect()
    }

    /// Day 1 maps to node 2; the codex wraps every 144 days.
    pub fn daily_focus(&self, day_of_year: u32) -> DailyFocus {
        let node_id = (day_of_year % CODEX_CYCLE) + 1;
        let primary_node = self.get_node(node_id, true);
        let supporting_angel = if self.is_active(ANGELS_72) {
            self.correlation()
                .correlate(node_id, &[ANGELS_72])
                .remove(ANGELS_72)
                .and_then(|angels| angels.into_iter().next())
        } else {
            None
        };

        DailyFocus {
            day_of_year,
            node_id,
            primary_node,
            supporting_angel,
        }
    }

    // --- persistence ---

    pub fn snapshot(&self) -> PersistedSnapshot {
        PersistedSnapshot {
            toggles: self.toggles.to_map(),
            mode: self.mode,
            intensity: self.intensity,
            safety_level: self.safety_level,
            profile_ref: self.profile.clone(),
            timestamp: now_unix_millis(),
        }
    }

    /// Write the current snapshot. Without a store this is a no-op.
    pub fn save(&mut self) -> Result<()> {
        let blob = self.snapshot().to_json()?;
        match self.store.as_mut() {
            Some(store) => store.save(&blob),
            None => {
                tracing::debug!("no settings store attached, skipping save");
                Ok(())
            }
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            tracing::warn!("failed to persist settings: {e}");
        }
    }

    /// Reload the last saved snapshot. A missing, unreadable or corrupt
    /// snapshot leaves the in-memory state untouched and returns `false`.
    pub fn restore(&mut self) -> bool {
        let Some(store) = self.store.as_ref() else {
            return false;
        };
        let blob = match store.load() {
            Ok(Some(blob)) => blob,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!("failed to read settings: {e}");
                return false;
            }
        };
        match PersistedSnapshot::from_json(&blob) {
            Ok(snapshot) => {
                self.apply_snapshot(snapshot);
                tracing::info!("settings loaded from previous session");
                true
            }
            Err(e) => {
                tracing::warn!("discarding saved settings: {e}");
                false
            }
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: PersistedSnapshot) {
        let mut toggles = self.toggles.clone();
        toggles.restore(&snapshot.toggles);
        toggles.enforce_safety();

        self.toggles = toggles;
        self.mode = snapshot.mode;
        self.intensity = snapshot.intensity;
        self.safety_level = snapshot.safety_level;
        self.profile = snapshot.profile_ref;
    }

    // --- profile and status ---

    pub fn set_profile(&mut self, profile: Option<UserProfile>) {
        match &profile {
            Some(p) => tracing::info!("profile set (experience level {})", p.experience_level),
            None => tracing::info!("profile cleared"),
        }
        self.profile = profile;
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn intensity(&self) -> Intensity {
        self.intensity
    }

    pub fn safety_level(&self) -> SafetyLevel {
        self.safety_level
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    pub fn toggles(&self) -> &ToggleMap {
        &self.toggles
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            mode: self.mode,
            intensity: self.intensity,
            safety_level: self.safety_level,
            profile: self.profile.clone(),
            toggles: self.toggles.entries().cloned().collect(),
            registered: self.registry.names().into_iter().map(str::to_string).collect(),
            failed_loads: self
                .registry
                .failures()
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(Catalog::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::StaticSource;
    use crate::snapshot::MemoryStore;
    use crate::toggle::Rejection;

    #[test]
    fn test_defaults() {
        let c = Controller::default();
        assert_eq!(c.mode(), Mode::Intermediate);
        assert_eq!(c.intensity(), Intensity::Moderate);
        assert_eq!(c.safety_level(), SafetyLevel::Standard);
        assert!(c.is_active(TRAUMA_SAFEGUARDS));
        assert!(c.is_active(CRYSTAL_FREQUENCIES));
        assert!(!c.is_active(DAEMON_GUARDIANS));
        assert!(!c.is_active("not_a_dataset"));
        assert!(c.registry().contains(SACRED_GEOMETRY));
    }

    #[test]
    fn test_invalid_scalars_leave_state() {
        let mut c = Controller::default();
        let before = c.status();
        assert!(!c.set_mode("expert"));
        assert!(!c.set_intensity("extreme"));
        assert!(!c.set_safety_level("none"));
        assert_eq!(c.status(), before);
    }

    #[test]
    fn test_toggle_persists_on_success_only() {
        let store = MemoryStore::new();
        let mut c = Controller::default().with_store(store.clone());

        assert!(!c.toggle_dataset(EMERGENCY_EXITS, Some(false)));
        assert!(store.blob().is_none());

        assert!(c.toggle_dataset(CRYSTAL_FREQUENCIES, Some(false)));
        let saved = PersistedSnapshot::from_json(&store.blob().unwrap()).unwrap();
        assert_eq!(saved.toggles.get(CRYSTAL_FREQUENCIES), Some(&false));
    }

    #[test]
    fn test_beginner_without_profile_rejects_gated() {
        let mut c = Controller::default();
        assert!(c.set_mode("beginner"));
        assert_eq!(
            c.toggle(DAEMON_GUARDIANS, Desired::On),
            Transition::Rejected(Rejection::ExperienceRequired)
        );

        assert!(c.set_mode("intermediate"));
        assert!(c.toggle_dataset(DAEMON_GUARDIANS, Some(true)));
    }

    #[test]
    fn test_custom_mode_keeps_toggles() {
        let mut c = Controller::default();
        c.toggle_dataset(MYSTERY_HOUSE, Some(false));
        let toggles = c.toggles().clone();
        assert!(c.set_mode("custom"));
        assert_eq!(c.mode(), Mode::Custom);
        assert_eq!(c.toggles(), &toggles);
    }

    #[test]
    fn test_emergency_mode() {
        let mut c = Controller::default();
        assert!(c.set_mode("intermediate"));
        c.toggle_dataset(DAEMON_GUARDIANS, Some(true));

        let practices = c.activate_emergency_gentle_mode();
        assert_eq!(practices.len(), 5);
        assert_eq!(practices, c.grounding_techniques());
        assert_eq!(c.intensity(), Intensity::Gentle);
        assert_eq!(c.safety_level(), SafetyLevel::Maximum);
        assert!(!c.is_active(DAEMON_GUARDIANS));
        assert!(!c.is_active(ADVANCED_ALCHEMY));
        assert!(c.is_active(REIKI_SYMBOLS));
        assert!(c.is_active(GROUNDING_TECHNIQUES));
    }

    #[test]
    fn test_widespread_load_failure_triggers_emergency() {
        let mut c = Controller::default();
        let report = c.load_datasets(&StaticSource::new());
        assert_eq!(report.loaded.len(), 0);
        assert_eq!(report.failed.len(), c.catalog().sources.len());
        assert_eq!(c.intensity(), Intensity::Gentle);
        assert_eq!(c.safety_level(), SafetyLevel::Maximum);
        assert_eq!(c.status().failed_loads.len(), report.failed.len());
    }

    #[test]
    fn test_partial_load_keeps_going() {
        let mut c = Controller::default();
        let source = StaticSource::new()
            .with(CODEX_NODES, serde_json::json!({"nodes": [{"node_id": 1}]}))
            .with(ANGELS_72, serde_json::json!({"angels": []}))
            .with(ALCHEMY_OPERATIONS, serde_json::json!({"operations": []}));
        let report = c.load_datasets(&source);
        assert_eq!(report.loaded.len(), 3);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(c.intensity(), Intensity::Moderate);
        assert!(c.get_node(1, false).is_some());
    }

    #[test]
    fn test_untabled_dataset_registered_inactive() {
        let mut catalog = Catalog::default();
        catalog.sources.push(crate::catalog::SourceSpec {
            name: "lunar_calendar".into(),
            location: "lunar.json".into(),
        });
        let mut c = Controller::new(catalog);
        let source = StaticSource::new().with("lunar_calendar", serde_json::json!([]));
        c.load_datasets(&source);

        assert!(c.toggles().contains("lunar_calendar"));
        assert!(!c.is_active("lunar_calendar"));
        assert!(c.toggle_dataset("lunar_calendar", None));
        assert!(c.is_active("lunar_calendar"));
    }

    #[test]
    fn test_restore_corrupt_is_discarded() {
        let store = MemoryStore::with_blob("{not json");
        let mut c = Controller::default().with_store(store);
        let before = c.status();
        assert!(!c.restore());
        assert_eq!(c.status(), before);
    }

    #[test]
    fn test_restore_reasserts_safety() {
        let blob = r#"{"toggles":{"trauma_safeguards":false,"crystal_frequencies":false,"ghost":true},
                      "mode":"advanced","intensity":"deep","safetyLevel":"maximum","profileRef":null,"timestamp":1}"#;
        let mut c = Controller::default().with_store(MemoryStore::with_blob(blob));
        assert!(c.restore());
        assert!(c.is_active(TRAUMA_SAFEGUARDS));
        assert!(!c.is_active(CRYSTAL_FREQUENCIES));
        assert!(!c.toggles().contains("ghost"));
        assert_eq!(c.mode(), Mode::Advanced);
        assert_eq!(c.safety_level(), SafetyLevel::Maximum);
    }

    #[test]
    fn test_active_datasets_only_lists_active() {
        let mut c = Controller::default();
        assert!(c.active_datasets().contains_key(SACRED_GEOMETRY));
        c.toggle_dataset(SACRED_GEOMETRY, Some(false));
        assert!(!c.active_datasets().contains_key(SACRED_GEOMETRY));
        assert!(c.active_dataset(SACRED_GEOMETRY).is_none());
    }
}
