use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::model::Observation;

/// External collaborator that returns the raw dated observations of a
/// series. Resampling to month-end happens after the fetch.
pub trait SignalSource {
    fn fetch(&self, series_id: &str) -> Result<Vec<Observation>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySignalSource {
    series: HashMap<String, Vec<Observation>>,
}

impl InMemorySignalSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series_id: impl Into<String>, observations: Vec<Observation>) {
        self.series.insert(series_id.into(), observations);
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl SignalSource for InMemorySignalSource {
    fn fetch(&self, series_id: &str) -> Result<Vec<Observation>> {
        self.series
            .get(series_id)
            .cloned()
            .ok_or_else(|| anyhow!("series '{}' not available", series_id))
    }
}

/// Reads `{ "<id>": [{"date": "YYYY-MM-DD", "value": 1.0}, ...], ... }`.
#[derive(Debug, Clone)]
pub struct JsonFileSignalSource {
    inner: InMemorySignalSource,
}

impl JsonFileSignalSource {
    pub fn open(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let series: HashMap<String, Vec<Observation>> = serde_json::from_str(raw)?;
        Ok(Self {
            inner: InMemorySignalSource { series },
        })
    }

    pub fn series_count(&self) -> usize {
        self.inner.len()
    }
}

impl SignalSource for JsonFileSignalSource {
    fn fetch(&self, series_id: &str) -> Result<Vec<Observation>> {
        self.inner.fetch(series_id)
    }
}
