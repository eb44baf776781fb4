use std::path::Path;

use rusqlite::{Connection, params};

use cathedral_core::{CoreError, SETTINGS_KEY, SettingsStore, millis_to_iso8601, now_unix_millis};

use crate::error::Result;
use crate::schema;

/// SQLite-backed settings store. Each key holds one opaque blob; the
/// controller's snapshot lives under [`SETTINGS_KEY`].
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let result = stmt.query_row([key], |row| row.get(0)).ok();
        Ok(result)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Settings blobs ---

    pub fn save_blob(&self, key: &str, blob: &str) -> Result<()> {
        let saved_at = millis_to_iso8601(now_unix_millis());
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, blob, saved_at) VALUES (?1, ?2, ?3)",
            params![key, blob, saved_at],
        )?;
        tracing::debug!("saved settings '{key}' ({} bytes)", blob.len());
        Ok(())
    }

    pub fn load_blob(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT blob FROM settings WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// ISO-8601 time of the last save under `key`.
    pub fn saved_at(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT saved_at FROM settings WHERE key = ?1")?;
        let result = stmt.query_row([key], |row| row.get(0)).ok();
        Ok(result)
    }

    /// Returns whether a row was removed.
    pub fn delete_blob(&self, key: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(removed > 0)
    }
}

impl SettingsStore for Store {
    fn save(&mut self, blob: &str) -> cathedral_core::Result<()> {
        self.save_blob(SETTINGS_KEY, blob)
            .map_err(|e| CoreError::Persist(e.to_string()))
    }

    fn load(&self) -> cathedral_core::Result<Option<String>> {
        self.load_blob(SETTINGS_KEY)
            .map_err(|e| CoreError::Persist(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cathedral_core::constants::CRYSTAL_FREQUENCIES;
    use cathedral_core::{Controller, Mode, SafetyLevel};

    #[test]
    fn test_metadata() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.get_metadata("profile").unwrap(), None);
        store.set_metadata("profile", "default").unwrap();
        assert_eq!(
            store.get_metadata("profile").unwrap(),
            Some("default".to_string())
        );
    }

    #[test]
    fn test_blob_overwrite() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.load_blob("k").unwrap(), None);

        store.save_blob("k", "first").unwrap();
        store.save_blob("k", "second").unwrap();
        assert_eq!(store.load_blob("k").unwrap(), Some("second".to_string()));
        assert!(store.saved_at("k").unwrap().unwrap().ends_with('Z'));

        assert!(store.delete_blob("k").unwrap());
        assert!(!store.delete_blob("k").unwrap());
        assert_eq!(store.load_blob("k").unwrap(), None);
    }

    #[test]
    fn test_settings_store_uses_settings_key() {
        let mut store = Store::open_in_memory().unwrap();
        SettingsStore::save(&mut store, "{}").unwrap();
        assert_eq!(store.load_blob(SETTINGS_KEY).unwrap(), Some("{}".to_string()));
        assert_eq!(SettingsStore::load(&store).unwrap(), Some("{}".to_string()));
    }

    #[test]
    fn test_controller_roundtrip_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.db");

        {
            let mut controller = Controller::default().with_store(Store::open(&path).unwrap());
            assert!(controller.set_mode("beginner"));
            assert!(controller.toggle_dataset(CRYSTAL_FREQUENCIES, Some(false)));
        }

        let mut controller = Controller::default().with_store(Store::open(&path).unwrap());
        assert!(controller.restore());
        assert_eq!(controller.mode(), Mode::Beginner);
        assert_eq!(controller.safety_level(), SafetyLevel::Maximum);
        assert!(!controller.is_active(CRYSTAL_FREQUENCIES));
    }
}
