//! Error types for extraction and artifact loading
//!
//! Errors are classified by how far they propagate:
//! - Fatal: the workbook cannot be opened, config is invalid, output cannot be written
//! - Absorbed: a single malformed row (dropped and counted)
//! - Presented: the data artifact is missing or invalid (dashboard shows a "no data" state)

use std::path::PathBuf;
use thiserror::Error;

/// Error types for the extraction pipeline and dashboard data loading
#[derive(Debug, Error)]
pub enum OpsError {
    // Fatal to the extraction step
    #[error("Cannot read workbook {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Failed to serialize records: {0}")]
    SerializeError(String),

    // Row-level, never fatal
    #[error("Malformed row {row} in sheet '{sheet}': {reason}")]
    MalformedRow {
        sheet: String,
        row: usize,
        reason: String,
    },

    // Dashboard load
    #[error("Data file not found: {0}")]
    MissingArtifact(PathBuf),

    #[error("Invalid data file {path}: {reason}")]
    InvalidArtifact { path: PathBuf, reason: String },
}

impl OpsError {
    /// Returns true if this error must abort the extraction step
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OpsError::SourceUnreadable { .. }
                | OpsError::ConfigurationError(_)
                | OpsError::IoError(_)
                | OpsError::SerializeError(_)
        )
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            OpsError::SourceUnreadable { .. } => {
                "Check the workbook path and that the file is a valid .xlsx/.xls export."
            }
            OpsError::ConfigurationError(_) => {
                "Check your configuration in ~/.opsboard/config.json"
            }
            OpsError::IoError(_) => "Check file permissions and disk space.",
            OpsError::SerializeError(_) => "Re-run the extraction; the record set could not be encoded.",
            OpsError::MalformedRow { .. } => "The row was skipped. Fix the source sheet if it should be included.",
            OpsError::MissingArtifact(_) => {
                "Run `opsboard-extract <tasks|databases> <workbook>` to generate the data file, then reload."
            }
            OpsError::InvalidArtifact { .. } => {
                "Re-run `opsboard-extract` to regenerate the data file, then reload."
            }
        }
    }
}

impl From<std::io::Error> for OpsError {
    fn from(err: std::io::Error) -> Self {
        OpsError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for OpsError {
    fn from(err: serde_json::Error) -> Self {
        OpsError::SerializeError(err.to_string())
    }
}
