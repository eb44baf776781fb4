use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::error::Result;
use crate::store::Store;

/// Default base directory for all cathedral settings.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".cathedral")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Sanitize a profile name for use as a directory name.
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Per-profile settings location.
///
/// Layout:
/// ```text
/// ~/.cathedral/
/// └── profiles/
///     ├── default/settings.db
///     └── <profile>/settings.db
/// ```
pub struct SettingsHome {
    profile: String,
    dir: PathBuf,
}

impl SettingsHome {
    /// Resolve the profile directory, creating it as needed.
    /// `base_dir` overrides [`default_base_dir`] (tests, `CATHEDRAL_DATA_DIR`).
    pub fn open(profile: Option<&str>, base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        let profile = profile
            .map(sanitize_name)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "default".to_string());
        let dir = base.join("profiles").join(&profile);
        fs::create_dir_all(&dir)?;

        tracing::debug!("settings home: {}", dir.display());
        Ok(Self { profile, dir })
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.join("settings.db")
    }

    pub fn open_store(&self) -> Result<Store> {
        let store = Store::open(&self.db_path())?;
        store.set_metadata("profile", &self.profile)?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("my profile"), "my_profile");
        assert_eq!(sanitize_name("../etc"), "___etc");
        assert_eq!(sanitize_name("seeker-01"), "seeker-01");
    }

    #[test]
    fn test_default_profile_layout() {
        let dir = TempDir::new().unwrap();
        let home = SettingsHome::open(None, Some(dir.path())).unwrap();
        assert_eq!(home.profile(), "default");
        assert_eq!(
            home.db_path(),
            dir.path().join("profiles").join("default").join("settings.db")
        );
        assert!(home.dir().is_dir());
    }

    #[test]
    fn test_blank_profile_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let home = SettingsHome::open(Some("   "), Some(dir.path())).unwrap();
        assert_eq!(home.profile(), "default");
    }

    #[test]
    fn test_profiles_are_isolated() {
        let dir = TempDir::new().unwrap();
        let a = SettingsHome::open(Some("alice"), Some(dir.path())).unwrap();
        let b = SettingsHome::open(Some("bob"), Some(dir.path())).unwrap();

        a.open_store().unwrap().save_blob("k", "a").unwrap();
        assert_eq!(b.open_store().unwrap().load_blob("k").unwrap(), None);
        let store = a.open_store().unwrap();
        assert_eq!(store.load_blob("k").unwrap(), Some("a".to_string()));
        assert_eq!(store.get_metadata("profile").unwrap(), Some("alice".to_string()));
    }
}
