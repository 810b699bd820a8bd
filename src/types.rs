use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// KTLO tracker
// =============================================================================

/// Workflow status of a KTLO task.
///
/// Serialized with the tracker's own labels. Anything the tracker writes that
/// is not one of these labels is read as `NotStarted`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Completed,
        TaskStatus::InProgress,
        TaskStatus::NotStarted,
    ];

    pub fn from_source(value: &str) -> Self {
        match value.trim() {
            "Completed" => TaskStatus::Completed,
            "In Progress" => TaskStatus::InProgress,
            _ => TaskStatus::NotStarted,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

/// A due date cell: a spreadsheet serial, or text the tracker already formatted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DueDate {
    Serial(f64),
    Text(String),
}

impl DueDate {
    pub fn serial(&self) -> Option<f64> {
        match self {
            DueDate::Serial(s) => Some(*s),
            DueDate::Text(_) => None,
        }
    }
}

pub const UNASSIGNED: &str = "Unassigned";

/// One row of the KTLO tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub item: String,
    #[serde(default)]
    pub received_on: Option<f64>,
    #[serde(default)]
    pub triaged: bool,
    #[serde(default)]
    pub ccs_action_needed: bool,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

impl TaskRecord {
    /// Assignee label used for grouping and display.
    pub fn assignee_label(&self) -> &str {
        match self.assignee.as_deref().map(str::trim) {
            Some(a) if !a.is_empty() => a,
            _ => UNASSIGNED,
        }
    }

    pub fn due_serial(&self) -> Option<f64> {
        self.due_date.as_ref().and_then(DueDate::serial)
    }
}

// =============================================================================
// Aurora inventory
// =============================================================================

pub const UNKNOWN: &str = "Unknown";

/// End of standard support for an engine version.
///
/// Serialized as `YYYY-MM-DD`, or the literal `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EolDate {
    Known(NaiveDate),
    #[default]
    Unknown,
}

impl From<String> for EolDate {
    fn from(value: String) -> Self {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map(EolDate::Known)
            .unwrap_or(EolDate::Unknown)
    }
}

impl From<EolDate> for String {
    fn from(value: EolDate) -> Self {
        match value {
            EolDate::Known(d) => d.format("%Y-%m-%d").to_string(),
            EolDate::Unknown => UNKNOWN.to_string(),
        }
    }
}

/// One Aurora PostgreSQL instance from the inventory report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbInstanceRecord {
    pub environment: String,
    #[serde(default)]
    pub auto_minor_version_upgrade: bool,
    #[serde(alias = "dbInstanceIdentifier")]
    pub instance_id: String,
    pub engine_version: String,
    #[serde(default = "unknown_owner")]
    pub owner: String,
    #[serde(default)]
    pub end_of_standard_support: EolDate,
}

fn unknown_owner() -> String {
    UNKNOWN.to_string()
}
