//! Cathedral dataset access and correlation controller.
//!
//! Decides which named datasets are active for a session, enforces the
//! safety and experience gates on toggles, applies mode presets as one
//! transaction, and answers cross-dataset correlation and healing-need
//! queries over whatever is currently active.
//!
//! Zero I/O: datasets arrive through [`DatasetSource`], settings leave
//! through [`SettingsStore`].

pub mod catalog;
pub mod constants;
pub mod controller;
pub mod correlation;
pub mod dataset;
pub mod error;
pub mod generated;
pub mod levels;
pub mod preset;
pub mod profile;
pub mod snapshot;
pub mod time;
pub mod toggle;

pub use catalog::{
    Catalog, DatasetSelection, EmergencyPlan, HealingNeedEntry, Preset, SourceSpec, ToggleSpec,
};
pub use constants::{CODEX_CYCLE, PRIMARY_DATASET, SETTINGS_KEY};
pub use controller::{Controller, ControllerStatus, DailyFocus, GROUNDING_PRACTICES};
pub use correlation::{CorrelationEngine, NeedSearch};
pub use dataset::{Dataset, DatasetRegistry, DatasetSource, LoadReport, StaticSource};
pub use error::{CoreError, Result};
pub use levels::{Intensity, Mode, SafetyLevel};
pub use preset::{PresetOutcome, resolve_preset};
pub use profile::{Experience, ExperienceProvider, UserProfile};
pub use snapshot::{MemoryStore, PersistedSnapshot, SettingsStore};
pub use time::{day_of_year, millis_to_iso8601, now_unix_millis, today};
pub use toggle::{Category, Desired, Rejection, ToggleEntry, ToggleMap, Transition};
