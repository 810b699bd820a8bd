// Dashboard services: artifact loading plus the two derived views.

pub mod aggregate;
pub mod databases;
pub mod tasks;

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::json_loader::load_records;

/// Result type for dashboard data loading
#[derive(Debug, serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DashboardResult<T> {
    Success { data: T },
    Empty { message: String, remediation: String },
}

impl<T> DashboardResult<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, DashboardResult::Empty { .. })
    }
}

/// Load the record artifact at `path` and build a view from it.
///
/// A missing or unreadable artifact, or one with no records, is an `Empty`
/// result rather than an error: the dashboard renders its "no data" state.
pub fn load_dashboard<R, T, F>(path: &Path, build: F) -> DashboardResult<T>
where
    R: DeserializeOwned,
    F: FnOnce(&[R]) -> T,
{
    let records: Vec<R> = match load_records(path) {
        Ok(records) => records,
        Err(e) => {
            log::warn!("Dashboard data unavailable: {}", e);
            return DashboardResult::Empty {
                message: e.to_string(),
                remediation: e.recovery_suggestion().to_string(),
            };
        }
    };

    if records.is_empty() {
        log::info!("{} contains no records", path.display());
        return DashboardResult::Empty {
            message: format!("No records in {}", path.display()),
            remediation: "Check that the source workbook has data rows, then re-run `opsboard-extract`."
                .to_string(),
        };
    }

    log::debug!("Loaded {} records from {}", records.len(), path.display());
    DashboardResult::Success {
        data: build(&records),
    }
}
