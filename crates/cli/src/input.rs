//! JSON input files

use anyhow::{Context, Result};
use forecast_lib::PerformanceRecord;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Historical records: a JSON array of objects
pub fn load_history(path: &Path) -> Result<Vec<PerformanceRecord>> {
    read_json(path)
}

/// The driver's current record: a single JSON object
pub fn load_record(path: &Path) -> Result<PerformanceRecord> {
    read_json(path)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
