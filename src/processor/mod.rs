//! Spreadsheet extraction pipeline.
//!
//! Orchestrates: read workbook → locate rows → normalize → report.
//!
//! Malformed rows never fail a run. They are dropped, logged at debug, and
//! counted in the `ExtractionReport`.

pub mod extract;
pub mod normalize;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::classify;
use crate::config::Config;
use crate::error::OpsError;
use crate::types::{DbInstanceRecord, TaskRecord};
use extract::{inventory_rows, read_workbook, task_rows, InstanceRow, InventoryLayout, SheetData};
use normalize::{decode_pipe_cell, normalize_instance, normalize_task};

/// Counts from one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub sheets: usize,
    pub candidate_rows: usize,
    pub records: usize,
    pub dropped_rows: usize,
}

/// Records produced by a run, with its report.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<T> {
    pub records: Vec<T>,
    pub report: ExtractionReport,
}

fn collect<R, T, F>(sheets: usize, rows: Vec<R>, normalize: F) -> Extraction<T>
where
    F: Fn(&R) -> Result<T, OpsError>,
{
    let mut records = Vec::with_capacity(rows.len());
    let mut dropped_rows = 0;

    for row in &rows {
        match normalize(row) {
            Ok(record) => records.push(record),
            Err(e) => {
                log::debug!("Dropping row: {}", e);
                dropped_rows += 1;
            }
        }
    }

    Extraction {
        report: ExtractionReport {
            sheets,
            candidate_rows: rows.len(),
            records: records.len(),
            dropped_rows,
        },
        records,
    }
}

/// Tracker records from already-read sheets. Only the first sheet is used.
pub fn tasks_from_sheets(sheets: &[SheetData], config: &Config) -> Extraction<TaskRecord> {
    let rows = task_rows(sheets);
    collect(sheets.len().min(1), rows, |row| {
        normalize_task(row, &config.task_columns)
    })
}

/// Inventory records from already-read sheets, all sheets in order.
pub fn instances_from_sheets(
    sheets: &[SheetData],
    config: &Config,
) -> Result<Extraction<DbInstanceRecord>, OpsError> {
    let layout = InventoryLayout::from_config(config)?;
    let rows = inventory_rows(sheets, &layout);
    for (sheet, instance_id) in duplicate_instance_ids(&rows) {
        log::warn!("Instance '{}' appears more than once in sheet '{}'", instance_id, sheet);
    }
    Ok(collect(sheets.len(), rows, normalize_instance))
}

/// (sheet, instance id) for every repeat of an id within the same sheet.
///
/// Ids are expected to be unique per sheet. Repeats are reported, not removed.
pub fn duplicate_instance_ids(rows: &[InstanceRow]) -> Vec<(String, String)> {
    let mut seen: HashSet<(&str, String)> = HashSet::new();
    let mut duplicates = Vec::new();
    for row in rows {
        let Some(fields) = decode_pipe_cell(&row.pipe_cell) else {
            continue;
        };
        if !seen.insert((row.sheet.as_str(), fields.instance_id.clone())) {
            duplicates.push((row.sheet.clone(), fields.instance_id));
        }
    }
    duplicates
}

/// Read the KTLO tracker workbook at `path`.
pub fn extract_tasks(path: &Path, config: &Config) -> Result<Extraction<TaskRecord>, OpsError> {
    let sheets = read_workbook(path)?;
    let extraction = tasks_from_sheets(&sheets, config);
    log::info!(
        "Extracted {} tasks from {} ({} rows dropped)",
        extraction.report.records,
        path.display(),
        extraction.report.dropped_rows
    );
    Ok(extraction)
}

/// Read the Aurora inventory workbook at `path`.
pub fn extract_instances(
    path: &Path,
    config: &Config,
) -> Result<Extraction<DbInstanceRecord>, OpsError> {
    let sheets = read_workbook(path)?;
    let extraction = instances_from_sheets(&sheets, config)?;
    log::info!(
        "Extracted {} DB instances across {} sheets from {} ({} rows dropped)",
        extraction.report.records,
        extraction.report.sheets,
        path.display(),
        extraction.report.dropped_rows
    );
    log_inventory_summary(&extraction.records);
    Ok(extraction)
}

/// Engine-version distribution of an inventory, keyed by full version.
pub fn version_counts(records: &[DbInstanceRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for db in records {
        *counts.entry(db.engine_version.clone()).or_insert(0) += 1;
    }
    counts
}

fn log_inventory_summary(records: &[DbInstanceRecord]) {
    for (version, count) in version_counts(records) {
        log::info!("  engine {}: {} instance(s)", version, count);
    }
    let auto_upgrade = records
        .iter()
        .filter(|db| db.auto_minor_version_upgrade)
        .count();
    let non_compliant = records
        .iter()
        .filter(|db| !classify::is_compliant(&db.engine_version))
        .count();
    log::info!(
        "Auto minor upgrade: {}/{} enabled, {} non-compliant",
        auto_upgrade,
        records.len(),
        non_compliant
    );
}
