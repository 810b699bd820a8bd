//! JSON data artifacts
//!
//! The extraction step writes each record set as a pretty-printed JSON array;
//! the dashboards load them at startup.
//!
//! File layout (paths from `Config`):
//! - `data/ktlo-data.json`: `TaskRecord[]`
//! - `data/aurora-data.json`: `DbInstanceRecord[]`

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::OpsError;

/// Check if a data artifact has been generated
pub fn has_artifact(path: &Path) -> bool {
    path.is_file()
}

/// Write records as a JSON array, creating parent directories as needed.
///
/// Written to a sibling temp file first, then renamed into place, so a
/// dashboard never sees a half-written artifact.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<(), OpsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(records)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;

    log::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Load a record array.
///
/// A missing file is `MissingArtifact`; a file that is not a JSON array of
/// the expected shape is `InvalidArtifact`.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, OpsError> {
    if !has_artifact(path) {
        return Err(OpsError::MissingArtifact(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| OpsError::InvalidArtifact {
        path: path.to_path_buf(),
        reason: format!("Failed to read: {}", e),
    })?;

    serde_json::from_str(&content).map_err(|e| OpsError::InvalidArtifact {
        path: path.to_path_buf(),
        reason: format!("Failed to parse: {}", e),
    })
}
