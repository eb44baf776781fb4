//! Persisted session settings and the key-value capability they travel
//! through.
//!
//! The wire shape is camelCase JSON:
//! `{ toggles, mode, intensity, safetyLevel, profileRef, timestamp }`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::levels::{Intensity, Mode, SafetyLevel};
use crate::profile::UserProfile;

/// Minimal blob store the controller persists into. Implementations may be
/// a database row, a file, or the in-memory [`MemoryStore`].
pub trait SettingsStore: Send {
    fn save(&mut self, blob: &str) -> Result<()>;
    fn load(&self) -> Result<Option<String>>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub toggles: BTreeMap<String, bool>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub intensity: Intensity,
    #[serde(default, alias = "safety")]
    pub safety_level: SafetyLevel,
    #[serde(default, alias = "userProfile")]
    pub profile_ref: Option<UserProfile>,
    /// Unix milliseconds.
    #[serde(default)]
    pub timestamp: u64,
}

impl PersistedSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::Persist(e.to_string()))
    }

    /// Missing scalars fall back to defaults; anything unreadable is
    /// reported as `CorruptSnapshot`.
    pub fn from_json(blob: &str) -> Result<Self> {
        serde_json::from_str(blob).map_err(|e| CoreError::CorruptSnapshot(e.to_string()))
    }
}

/// Shared in-memory blob slot. Clones observe the same slot, so a test can
/// keep a handle after moving one into the controller.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(blob.to_string()))),
        }
    }

    pub fn blob(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl SettingsStore for MemoryStore {
    fn save(&mut self, blob: &str) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| CoreError::Persist("memory store lock poisoned".to_string()))?;
        *slot = Some(blob.to_string());
        Ok(())
    }

    fn load(&self) -> Result<Option<String>> {
        self.slot
            .lock()
            .map(|slot| slot.clone())
            .map_err(|_| CoreError::Persist("memory store lock poisoned".to_string()))
    }
}
