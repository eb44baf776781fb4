use std::fs;
use std::path::{Component, Path, PathBuf};

use cathedral_core::{CoreError, Dataset, DatasetSource};

/// Reads dataset bodies as JSON files under a root directory.
#[derive(Clone, Debug)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `location` joined onto the root. Absolute paths and `..` are refused
    /// so a catalog cannot point outside the dataset directory.
    fn resolve(&self, location: &str) -> Option<PathBuf> {
        let relative = Path::new(location);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        contained.then(|| self.root.join(relative))
    }
}

impl DatasetSource for DirSource {
    fn fetch(&self, name: &str, location: &str) -> cathedral_core::Result<Dataset> {
        let load_error = |reason: String| CoreError::Load {
            dataset: name.to_string(),
            reason,
        };

        let path = self
            .resolve(location)
            .ok_or_else(|| load_error(format!("location escapes dataset root: {location}")))?;
        let content = fs::read_to_string(&path)
            .map_err(|e| load_error(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&content).map_err(|e| load_error(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reads_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("angels.json"), r#"{"angels": [{"number": 1}]}"#).unwrap();

        let source = DirSource::new(dir.path());
        assert_eq!(source.root(), dir.path());
        let body = source.fetch("angels_72", "angels.json").unwrap();
        assert_eq!(body["angels"][0]["number"], 1);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = TempDir::new().unwrap();
        let err = DirSource::new(dir.path())
            .fetch("codex_nodes", "nope.json")
            .unwrap_err();
        assert!(matches!(err, CoreError::Load { ref dataset, .. } if dataset == "codex_nodes"));
    }

    #[test]
    fn test_malformed_json_is_load_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.json"), "{ nodes: ").unwrap();
        let err = DirSource::new(dir.path()).fetch("codex_nodes", "bad.json").unwrap_err();
        assert!(matches!(err, CoreError::Load { .. }));
    }

    #[test]
    fn test_refuses_escape() {
        let dir = TempDir::new().unwrap();
        let source = DirSource::new(dir.path().join("data"));
        assert!(source.fetch("x", "../secret.json").is_err());
        assert!(source.fetch("x", "/etc/passwd").is_err());
        assert!(source.resolve("nested/./file.json").is_some());
    }
}
