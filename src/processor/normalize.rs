//! Row → record normalization.
//!
//! Each function maps one located row to one typed record, applying the
//! fallback rules for missing fields. A row that cannot become a record is
//! reported as `OpsError::MalformedRow` for the caller to count and drop.

use calamine::Data;

use crate::classify;
use crate::config::TaskColumns;
use crate::error::OpsError;
use crate::types::{DbInstanceRecord, DueDate, EolDate, TaskRecord, TaskStatus, UNKNOWN};
use crate::util;

use super::extract::{cell_serial, cell_text, InstanceRow, TaskRow};

/// Minimum pipe-delimited fields of an inventory line.
const MIN_PIPE_FIELDS: usize = 3;

/// The three fields of an inventory line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeFields {
    pub auto_minor_version_upgrade: bool,
    pub instance_id: String,
    pub engine_version: String,
}

/// Split on `|`, trim, drop empty parts. Needs at least three parts.
///
/// Example: "True | db-prod-1 | 15.4" → (true, "db-prod-1", "15.4")
pub fn decode_pipe_cell(cell: &str) -> Option<PipeFields> {
    let parts: Vec<&str> = cell
        .split('|')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if parts.len() < MIN_PIPE_FIELDS {
        return None;
    }

    Some(PipeFields {
        auto_minor_version_upgrade: parts[0] == "True",
        instance_id: parts[1].to_string(),
        engine_version: parts[2].to_string(),
    })
}

/// Owner: explicit column → instance id prefix before the first `-` → "Unknown".
///
/// Example: (blank, "finance-db-2") → "finance"
pub fn resolve_owner(explicit: Option<&Data>, instance_id: &str) -> String {
    if let Some(owner) = explicit.and_then(cell_text) {
        return owner;
    }
    match instance_id.split('-').next().map(str::trim) {
        Some(prefix) if !prefix.is_empty() => prefix.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// End of standard support: numeric explicit column → static table → Unknown.
pub fn resolve_eol(explicit: Option<&Data>, engine_version: &str) -> EolDate {
    if let Some(date) = explicit.and_then(cell_serial).and_then(util::serial_to_date) {
        return EolDate::Known(date);
    }
    classify::lookup_eol(classify::major_version(engine_version))
}

pub fn normalize_instance(row: &InstanceRow) -> Result<DbInstanceRecord, OpsError> {
    let fields = decode_pipe_cell(&row.pipe_cell).ok_or_else(|| OpsError::MalformedRow {
        sheet: row.sheet.clone(),
        row: row.row_number,
        reason: format!("fewer than {} pipe-delimited fields", MIN_PIPE_FIELDS),
    })?;

    let owner = resolve_owner(row.owner.as_ref(), &fields.instance_id);
    let end_of_standard_support = resolve_eol(row.eol.as_ref(), &fields.engine_version);

    Ok(DbInstanceRecord {
        environment: row.environment.clone(),
        auto_minor_version_upgrade: fields.auto_minor_version_upgrade,
        instance_id: fields.instance_id,
        engine_version: fields.engine_version,
        owner,
        end_of_standard_support,
    })
}

fn is_yes(cell: Option<&Data>) -> bool {
    match cell {
        Some(Data::Bool(b)) => *b,
        Some(other) => cell_text(other).as_deref() == Some("Yes"),
        None => false,
    }
}

fn due_date(cell: Option<&Data>) -> Option<DueDate> {
    let cell = cell?;
    if let Some(serial) = cell_serial(cell) {
        return Some(DueDate::Serial(serial));
    }
    cell_text(cell).map(DueDate::Text)
}

pub fn normalize_task(row: &TaskRow, columns: &TaskColumns) -> Result<TaskRecord, OpsError> {
    let item = row
        .get(&columns.item)
        .and_then(cell_text)
        .ok_or_else(|| OpsError::MalformedRow {
            sheet: row.sheet.clone(),
            row: row.row_number,
            reason: format!("missing '{}'", columns.item),
        })?;

    let status = row
        .get(&columns.status)
        .and_then(cell_text)
        .map(|s| TaskStatus::from_source(&s))
        .unwrap_or_default();

    Ok(TaskRecord {
        item,
        received_on: row.get(&columns.received_on).and_then(cell_serial),
        triaged: is_yes(row.get(&columns.triaged)),
        ccs_action_needed: is_yes(row.get(&columns.ccs_action)),
        status,
        comments: row.get(&columns.comments).and_then(cell_text),
        due_date: due_date(row.get(&columns.due_date)),
        assignee: row.get(&columns.assignee).and_then(cell_text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    fn instance_row(pipe: &str, owner: Option<Data>, eol: Option<Data>) -> InstanceRow {
        InstanceRow {
            sheet: "gwre-ccs-prod".to_string(),
            row_number: 2,
            environment: "prod".to_string(),
            pipe_cell: pipe.to_string(),
            owner,
            eol,
        }
    }

    fn task_row(cells: &[(&str, Data)]) -> TaskRow {
        TaskRow {
            sheet: "KTLO".to_string(),
            row_number: 2,
            cells: cells
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_decode_pipe_cell() {
        let fields = decode_pipe_cell("True | db-prod-1 | 15.4").unwrap();
        assert!(fields.auto_minor_version_upgrade);
        assert_eq!(fields.instance_id, "db-prod-1");
        assert_eq!(fields.engine_version, "15.4");
        assert_eq!(classify::major_version(&fields.engine_version), "15");

        let bordered = decode_pipe_cell("|  False |  search-1  |  13.9  |  extra |").unwrap();
        assert!(!bordered.auto_minor_version_upgrade);
        assert_eq!(bordered.instance_id, "search-1");

        assert!(!decode_pipe_cell("true | x | 1").unwrap().auto_minor_version_upgrade);
        assert!(decode_pipe_cell("True | only-two").is_none());
        assert!(decode_pipe_cell("| | |").is_none());
    }

    #[test]
    fn test_owner_resolution_order() {
        assert_eq!(resolve_owner(Some(&s(" payments ")), "finance-db-2"), "payments");
        assert_eq!(resolve_owner(Some(&s("  ")), "finance-db-2"), "finance");
        assert_eq!(resolve_owner(None, "finance-db-2"), "finance");
        assert_eq!(resolve_owner(None, "standalone"), "standalone");
        assert_eq!(resolve_owner(None, "-orphan"), UNKNOWN);
    }

    #[test]
    fn test_eol_resolution_order() {
        // 47000 → 2028-09-04
        assert_eq!(
            resolve_eol(Some(&Data::Float(47000.0)), "13.4"),
            EolDate::Known(NaiveDate::from_ymd_opt(2028, 9, 4).unwrap())
        );
        assert_eq!(
            resolve_eol(Some(&s("2030-01-01")), "15.4"),
            EolDate::Known(NaiveDate::from_ymd_opt(2027, 11, 11).unwrap())
        );
        assert_eq!(
            resolve_eol(None, "16.2"),
            EolDate::Known(NaiveDate::from_ymd_opt(2028, 11, 9).unwrap())
        );
        assert_eq!(resolve_eol(None, "9.6"), EolDate::Unknown);
    }

    #[test]
    fn test_normalize_instance() {
        let record = normalize_instance(&instance_row("True | db-prod-1 | 15.4", None, None)).unwrap();
        assert_eq!(record.environment, "prod");
        assert!(record.auto_minor_version_upgrade);
        assert_eq!(record.instance_id, "db-prod-1");
        assert_eq!(record.engine_version, "15.4");
        assert_eq!(record.owner, "db");

        let err = normalize_instance(&instance_row("stray note", None, None)).unwrap_err();
        assert!(matches!(err, OpsError::MalformedRow { row: 2, .. }));
    }

    #[test]
    fn test_normalize_task_full_row() {
        let columns = TaskColumns::default();
        let row = task_row(&[
            ("KTLO Item", s("Test Task 1")),
            ("Received On", Data::Float(45292.0)),
            ("Triaged", s("Yes")),
            ("Action Needed from CCS", s("No")),
            ("Status", s("Completed")),
            ("PgM Assigned", s("John Doe")),
            ("Due Date", Data::Float(45350.0)),
            ("Comments", s("Test comment GWCP-123")),
        ]);

        let task = normalize_task(&row, &columns).unwrap();
        assert_eq!(task.item, "Test Task 1");
        assert_eq!(task.received_on, Some(45292.0));
        assert!(task.triaged);
        assert!(!task.ccs_action_needed);
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.assignee.as_deref(), Some("John Doe"));
        assert_eq!(task.due_date, Some(DueDate::Serial(45350.0)));
        assert_eq!(task.comments.as_deref(), Some("Test comment GWCP-123"));
    }

    #[test]
    fn test_normalize_task_defaults() {
        let columns = TaskColumns::default();
        let row = task_row(&[
            ("KTLO Item", s("Renew TLS")),
            ("Received On", s("last week")),
            ("Status", s("Waiting")),
            ("Due Date", s("Q3")),
        ]);

        let task = normalize_task(&row, &columns).unwrap();
        assert_eq!(task.received_on, None);
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(task.due_date, Some(DueDate::Text("Q3".to_string())));
        assert_eq!(task.assignee, None);
        assert_eq!(task.assignee_label(), "Unassigned");
        assert!(!task.triaged);
    }

    #[test]
    fn test_normalize_task_requires_item() {
        let columns = TaskColumns::default();
        let row = task_row(&[("KTLO Item", s("   ")), ("Status", s("Completed"))]);
        assert!(matches!(
            normalize_task(&row, &columns),
            Err(OpsError::MalformedRow { .. })
        ));
    }
}
