//! Classification rules for tasks and database instances.
//!
//! Every function here is a pure function of its arguments. "Now" is always
//! passed in, so a dashboard pass classifies every record against the same
//! instant.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::OpsError;
use crate::types::{EolDate, TaskRecord, TaskStatus};
use crate::util;

// ---------------------------------------------------------------------------
// PostgreSQL version support
// ---------------------------------------------------------------------------

struct VersionSupport {
    major: &'static str,
    supported: bool,
    /// End of standard support as (year, month, day).
    eol: (i32, u32, u32),
    label: &'static str,
}

const VERSION_SUPPORT: &[VersionSupport] = &[
    VersionSupport { major: "17", supported: true, eol: (2029, 11, 9), label: "v17 (Current)" },
    VersionSupport { major: "16", supported: true, eol: (2028, 11, 9), label: "v16 (Supported)" },
    VersionSupport { major: "15", supported: true, eol: (2027, 11, 11), label: "v15 (Supported)" },
    VersionSupport { major: "14", supported: true, eol: (2026, 11, 12), label: "v14 (Older)" },
    VersionSupport { major: "13", supported: false, eol: (2025, 11, 13), label: "v13 (EOL Soon)" },
    VersionSupport { major: "12", supported: false, eol: (2024, 11, 14), label: "v12 (EOL)" },
    VersionSupport { major: "11", supported: false, eol: (2023, 11, 9), label: "v11" },
];

fn support_entry(major: &str) -> Option<&'static VersionSupport> {
    VERSION_SUPPORT.iter().find(|v| v.major == major)
}

/// Everything before the first `.` of a dotted version.
pub fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Whether the engine version is on a supported major. Unknown majors are not.
pub fn is_compliant(version: &str) -> bool {
    support_entry(major_version(version))
        .map(|v| v.supported)
        .unwrap_or(false)
}

/// Static end-of-standard-support date for a major version.
pub fn lookup_eol(major: &str) -> EolDate {
    support_entry(major)
        .and_then(|v| NaiveDate::from_ymd_opt(v.eol.0, v.eol.1, v.eol.2))
        .map(EolDate::Known)
        .unwrap_or(EolDate::Unknown)
}

/// Chart label for a major version, e.g. "v15 (Supported)" or "v9".
pub fn version_label(major: &str) -> String {
    match support_entry(major) {
        Some(v) => v.label.to_string(),
        None => format!("v{}", major),
    }
}

// ---------------------------------------------------------------------------
// End-of-life urgency
// ---------------------------------------------------------------------------

/// Days reported for an unknown EOL date.
pub const UNKNOWN_EOL_DAYS: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EolUrgency {
    Critical,
    Warning,
    Safe,
}

impl EolUrgency {
    pub fn label(&self) -> &'static str {
        match self {
            EolUrgency::Critical => "critical",
            EolUrgency::Warning => "warning",
            EolUrgency::Safe => "safe",
        }
    }
}

/// Days until end of standard support, rounded up; `-1` when unknown.
pub fn days_until_eol(eol: EolDate, now: DateTime<Utc>) -> i64 {
    match eol {
        EolDate::Known(date) => util::days_until(util::start_of_day(date), now),
        EolDate::Unknown => UNKNOWN_EOL_DAYS,
    }
}

/// Bucket for days-until-EOL. The unknown sentinel lands in `Critical`.
pub fn eol_urgency(days: i64) -> EolUrgency {
    if days < 365 {
        EolUrgency::Critical
    } else if days < 730 {
        EolUrgency::Warning
    } else {
        EolUrgency::Safe
    }
}

// ---------------------------------------------------------------------------
// Task urgency
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskUrgency {
    Overdue,
    Urgent,
    Soon,
    Normal,
}

impl TaskUrgency {
    pub fn label(&self) -> &'static str {
        match self {
            TaskUrgency::Overdue => "overdue",
            TaskUrgency::Urgent => "urgent",
            TaskUrgency::Soon => "soon",
            TaskUrgency::Normal => "normal",
        }
    }
}

/// Due instant of an open task with a serial due date.
fn open_due(task: &TaskRecord) -> Option<DateTime<Utc>> {
    if task.status == TaskStatus::Completed {
        return None;
    }
    task.due_serial().and_then(util::serial_to_datetime)
}

pub fn task_urgency(task: &TaskRecord, now: DateTime<Utc>) -> TaskUrgency {
    let Some(due) = open_due(task) else {
        return TaskUrgency::Normal;
    };
    let days = util::days_until(due, now);
    if days < 0 {
        TaskUrgency::Overdue
    } else if days <= 7 {
        TaskUrgency::Urgent
    } else if days <= 30 {
        TaskUrgency::Soon
    } else {
        TaskUrgency::Normal
    }
}

/// Timeline windows shown as the dashboard's due-date cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DueWindow {
    Overdue,
    Within7,
    Within30,
    Within90,
}

/// Which timeline card an open task falls in, if any.
///
/// `Overdue` compares instants (anything past due, even by an hour); the
/// other windows use whole days rounded up.
pub fn due_window(task: &TaskRecord, now: DateTime<Utc>) -> Option<DueWindow> {
    let due = open_due(task)?;
    if due < now {
        return Some(DueWindow::Overdue);
    }
    match util::days_until(due, now) {
        0..=7 => Some(DueWindow::Within7),
        8..=30 => Some(DueWindow::Within30),
        31..=90 => Some(DueWindow::Within90),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Fiscal year
// ---------------------------------------------------------------------------

/// Fiscal years start August 1 and are named for the calendar year they end in.
///
/// Example: 2024-08-01 → "FY25", 2024-07-31 → "FY24"
pub fn fiscal_year(date: NaiveDate) -> String {
    let year = if date.month0() >= 7 {
        date.year() + 1
    } else {
        date.year()
    };
    format!("FY{:02}", year.rem_euclid(100))
}

/// Fiscal year of a task's received-on serial.
pub fn task_fiscal_year(task: &TaskRecord) -> Option<String> {
    task.received_on
        .and_then(util::serial_to_date)
        .map(fiscal_year)
}

// ---------------------------------------------------------------------------
// Ticket references
// ---------------------------------------------------------------------------

/// Finds the first ticket reference (e.g. `GWCP-12345`) in free text.
#[derive(Debug, Clone)]
pub struct TicketMatcher {
    pattern: Regex,
}

impl TicketMatcher {
    pub fn new<S: AsRef<str>>(prefixes: &[S]) -> Result<Self, OpsError> {
        if prefixes.is_empty() {
            return Err(OpsError::ConfigurationError(
                "at least one ticket prefix is required".into(),
            ));
        }
        let alternatives = prefixes
            .iter()
            .map(|p| regex::escape(p.as_ref().trim()))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)(?:{})-\d+", alternatives))
            .map_err(|e| OpsError::ConfigurationError(format!("ticket pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    /// First match, with the casing it has in `comments`.
    pub fn extract<'a>(&self, comments: Option<&'a str>) -> Option<&'a str> {
        self.pattern.find(comments?).map(|m| m.as_str())
    }
}

/// Link to a ticket in the tracker.
pub fn ticket_url(base_url: &str, ticket_id: &str) -> String {
    format!("{}{}", base_url, ticket_id)
}
