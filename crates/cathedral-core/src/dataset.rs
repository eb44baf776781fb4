use std::collections::HashMap;

use serde_json::Value;

use crate::catalog::SourceSpec;
use crate::error::{CoreError, Result};

/// Opaque dataset body. Shape is dataset-specific.
pub type Dataset = Value;

/// Fetches the body of an externally sourced dataset.
pub trait DatasetSource {
    fn fetch(&self, name: &str, location: &str) -> Result<Dataset>;
}

/// Holds every dataset by name. The only way dataset content enters the
/// controller.
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    datasets: HashMap<String, Dataset>,
    failures: Vec<CoreError>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a dataset, replacing any previous body. Returns the replaced value.
    pub fn load(&mut self, name: &str, dataset: Dataset) -> Option<Dataset> {
        self.datasets.insert(name.to_string(), dataset)
    }

    /// Fetch `spec` from `source` and register it. A failure is recorded and
    /// handed back for logging; nothing else is affected. Only the latest
    /// attempt per dataset is kept in [`Self::failures`].
    pub fn load_from(&mut self, spec: &SourceSpec, source: &dyn DatasetSource) -> Result<()> {
        self.failures.retain(|f| {
            !matches!(f, CoreError::Load { dataset, .. } if *dataset == spec.name)
        });
        match source.fetch(&spec.name, &spec.location) {
            Ok(dataset) => {
                self.load(&spec.name, dataset);
                Ok(())
            }
            Err(e) => {
                let failure = match e {
                    CoreError::Load { .. } => e,
                    other => CoreError::Load {
                        dataset: spec.name.clone(),
                        reason: other.to_string(),
                    },
                };
                self.failures.push(failure.clone());
                Err(failure)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.datasets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn failures(&self) -> &[CoreError] {
        &self.failures
    }
}

/// Outcome of loading every sourced dataset.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<CoreError>,
}

impl LoadReport {
    pub fn attempted(&self) -> usize {
        self.loaded.len() + self.failed.len()
    }

    /// Share of attempted loads that failed; 0 when nothing was attempted.
    pub fn failure_ratio(&self) -> f64 {
        match self.attempted() {
            0 => 0.0,
            n => self.failed.len() as f64 / n as f64,
        }
    }
}

/// Source backed by an in-memory map. Used for prefetched remote bodies
/// and as a fixture in tests.
#[derive(Debug, Default)]
pub struct StaticSource {
    bodies: HashMap<String, std::result::Result<Dataset, String>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, dataset: Dataset) -> Self {
        self.insert(name, Ok(dataset));
        self
    }

    pub fn insert(&mut self, name: &str, body: std::result::Result<Dataset, String>) {
        self.bodies.insert(name.to_string(), body);
    }
}

impl DatasetSource for StaticSource {
    fn fetch(&self, name: &str, _location: &str) -> Result<Dataset> {
        match self.bodies.get(name) {
            Some(Ok(dataset)) => Ok(dataset.clone()),
            Some(Err(reason)) => Err(CoreError::Load {
                dataset: name.to_string(),
                reason: reason.clone(),
            }),
            None => Err(CoreError::Load {
                dataset: name.to_string(),
                reason: "not available".to_string(),
            }),
        }
    }
}
