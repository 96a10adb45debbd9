//! Measure persistence

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::{Measure, Metric};

#[derive(Error, Debug)]
pub enum MeasureStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid measure store: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where measures are read from and written to.
pub trait MeasureStore {
    /// Measure recorded for `resource` by a previous run
    fn previous(&self, resource: &str, metric: Metric) -> Option<Measure>;

    /// Record a measure for `resource` in the current run
    fn save(&mut self, resource: &str, measure: Measure);
}

type ResourceMeasures = BTreeMap<String, BTreeMap<String, Measure>>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    resources: ResourceMeasures,
}

/// JSON file store keeping the previous run's measures next to the current run's.
///
/// Resources touched in the current run replace their previous entry on
/// [`persist`](Self::persist); untouched resources are kept as they were.
#[derive(Debug)]
pub struct JsonMeasureStore {
    path: PathBuf,
    previous: ResourceMeasures,
    current: ResourceMeasures,
}

impl JsonMeasureStore {
    /// Open a store. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self, MeasureStoreError> {
        let previous = if path.exists() {
            let data = fs::read_to_string(path)?;
            serde_json::from_str::<StoreFile>(&data)?.resources
        } else {
            ResourceMeasures::new()
        };
        debug!("Loaded measures for {} resources from {}", previous.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            previous,
            current: ResourceMeasures::new(),
        })
    }

    /// Measures recorded so far in the current run
    pub fn current(&self, resource: &str) -> Option<&BTreeMap<String, Measure>> {
        self.current.get(resource)
    }

    /// Write previous and current measures back to disk.
    pub fn persist(&self) -> Result<(), MeasureStoreError> {
        let mut resources = self.previous.clone();
        for (resource, measures) in &self.current {
            resources.insert(resource.clone(), measures.clone());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&StoreFile { resources })?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

impl MeasureStore for JsonMeasureStore {
    fn previous(&self, resource: &str, metric: Metric) -> Option<Measure> {
        self.previous
            .get(resource)
            .and_then(|measures| measures.get(metric.key))
            .cloned()
    }

    fn save(&mut self, resource: &str, measure: Measure) {
        self.current
            .entry(resource.to_string())
            .or_default()
            .insert(measure.metric.clone(), measure);
    }
}
