//! Workbook reading and row location.
//!
//! Turns a workbook into per-sheet cell grids, then picks out the rows each
//! report kind cares about:
//! - KTLO tracker: first sheet, header-labeled table, one map per row
//! - Aurora inventory: every sheet, rows whose first cell is a pipe-delimited
//!   line from the exported CLI table

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use calamine::{open_workbook_auto, Data, Reader};
use regex::Regex;

use crate::config::Config;
use crate::error::OpsError;

/// One worksheet as a grid of cells, in workbook order.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    pub name: String,
    pub rows: Vec<Vec<Data>>,
}

impl SheetData {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Data>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// Read every sheet of a workbook (.xlsx, .xlsm, .xls, .ods).
///
/// A sheet that fails to decode is logged and skipped; only failing to open
/// the workbook itself is an error.
pub fn read_workbook(path: &Path) -> Result<Vec<SheetData>, OpsError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| OpsError::SourceUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut sheets = Vec::new();
    for sheet_name in workbook.sheet_names().to_vec() {
        match workbook.worksheet_range(&sheet_name) {
            Ok(range) => {
                let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
                log::debug!("Sheet '{}': {} rows", sheet_name, rows.len());
                sheets.push(SheetData::new(sheet_name, rows));
            }
            Err(e) => log::warn!("Skipping unreadable sheet '{}': {}", sheet_name, e),
        }
    }

    Ok(sheets)
}

/// Text content of a cell, trimmed. `None` for empty cells and blank strings.
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => format!("{}", f),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR({:?})", e),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Numeric value of a cell, if it holds one (including typed dates).
pub fn cell_serial(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) if f.is_finite() => Some(*f),
        Data::Int(n) => Some(*n as f64),
        Data::DateTime(dt) => Some(dt.as_f64()),
        _ => None,
    }
}

fn is_blank_row(row: &[Data]) -> bool {
    row.iter().all(|c| cell_text(c).is_none())
}

// ---------------------------------------------------------------------------
// KTLO tracker
// ---------------------------------------------------------------------------

/// A tracker row keyed by header text. Empty cells are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub sheet: String,
    /// 1-based row number within the sheet's used range.
    pub row_number: usize,
    pub cells: HashMap<String, Data>,
}

impl TaskRow {
    pub fn get(&self, header: &str) -> Option<&Data> {
        self.cells.get(header)
    }
}

/// Header-labeled rows of the first sheet.
pub fn task_rows(sheets: &[SheetData]) -> Vec<TaskRow> {
    let Some(sheet) = sheets.first() else {
        return Vec::new();
    };

    let mut rows = sheet
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !is_blank_row(row));

    let headers: Vec<Option<String>> = match rows.next() {
        Some((_, header)) => header.iter().map(cell_text).collect(),
        None => return Vec::new(),
    };

    rows.map(|(idx, row)| {
        let cells = headers
            .iter()
            .zip(row.iter())
            .filter_map(|(header, cell)| {
                let header = header.as_ref()?;
                if matches!(cell, Data::Empty) {
                    return None;
                }
                Some((header.clone(), cell.clone()))
            })
            .collect();
        TaskRow {
            sheet: sheet.name.clone(),
            row_number: idx + 1,
            cells,
        }
    })
    .collect()
}

// ---------------------------------------------------------------------------
// Aurora inventory
// ---------------------------------------------------------------------------

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\s|\-]+$").unwrap())
}

/// How inventory sheets are laid out.
#[derive(Debug, Clone)]
pub struct InventoryLayout {
    header_marker: String,
    owner_header: String,
    eol_header: String,
    environment_re: Regex,
}

impl InventoryLayout {
    pub fn from_config(config: &Config) -> Result<Self, OpsError> {
        let environment_re = Regex::new(&format!(
            r"{}-(\w+)",
            regex::escape(config.environment_prefix.trim())
        ))
        .map_err(|e| OpsError::ConfigurationError(format!("environment pattern: {}", e)))?;

        Ok(Self {
            header_marker: config.header_marker.clone(),
            owner_header: config.owner_header.clone(),
            eol_header: config.eol_header.clone(),
            environment_re,
        })
    }

    /// Environment tag for a sheet: the word after the prefix, else the sheet name.
    ///
    /// Example: "gwre-ccs-dev Nov 11" → "dev"
    pub fn environment_for(&self, sheet_name: &str) -> String {
        self.environment_re
            .captures(sheet_name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| sheet_name.to_string())
    }

    fn is_header(&self, first_cell: &str) -> bool {
        first_cell.contains(&self.header_marker)
    }
}

/// A candidate inventory row, before the pipe cell is decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRow {
    pub sheet: String,
    pub row_number: usize,
    pub environment: String,
    pub pipe_cell: String,
    pub owner: Option<Data>,
    pub eol: Option<Data>,
}

/// Column positions of the optional explicit Owner / EOL columns.
#[derive(Debug, Clone, Copy, Default)]
struct ExplicitColumns {
    owner: Option<usize>,
    eol: Option<usize>,
}

impl ExplicitColumns {
    fn locate(header: &[Data], layout: &InventoryLayout) -> Self {
        let mut columns = Self::default();
        for (idx, cell) in header.iter().enumerate().skip(1) {
            let Some(text) = cell_text(cell) else {
                continue;
            };
            if text.eq_ignore_ascii_case(&layout.owner_header) {
                columns.owner = Some(idx);
            } else if text.eq_ignore_ascii_case(&layout.eol_header) {
                columns.eol = Some(idx);
            }
        }
        columns
    }
}

/// Candidate rows from every sheet, sheets in workbook order.
///
/// Header-marker rows, separator rows, and rows whose first cell is not text
/// are skipped here. Whether a candidate has enough fields is decided when it
/// is normalized.
pub fn inventory_rows(sheets: &[SheetData], layout: &InventoryLayout) -> Vec<InstanceRow> {
    let mut out = Vec::new();

    for sheet in sheets {
        let environment = layout.environment_for(&sheet.name);
        let mut columns = ExplicitColumns::default();
        let before = out.len();

        for (idx, row) in sheet.rows.iter().enumerate() {
            let Some(Data::String(first)) = row.first() else {
                continue;
            };
            if layout.is_header(first) {
                columns = ExplicitColumns::locate(row, layout);
                continue;
            }
            if first.trim().is_empty() || separator_re().is_match(first) {
                continue;
            }

            let pick = |col: Option<usize>| {
                col.and_then(|c| row.get(c))
                    .filter(|d| !matches!(d, Data::Empty))
                    .cloned()
            };

            out.push(InstanceRow {
                sheet: sheet.name.clone(),
                row_number: idx + 1,
                environment: environment.clone(),
                pipe_cell: first.clone(),
                owner: pick(columns.owner),
                eol: pick(columns.eol),
            });
        }

        log::debug!(
            "Sheet '{}' ({}): {} candidate rows",
            sheet.name,
            environment,
            out.len() - before
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    fn layout() -> InventoryLayout {
        InventoryLayout::from_config(&Config::default()).unwrap()
    }

    #[test]
    fn test_environment_from_sheet_name() {
        let layout = layout();
        assert_eq!(layout.environment_for("gwre-ccs-dev Nov 11"), "dev");
        assert_eq!(layout.environment_for("gwre-ccs-prod"), "prod");
        assert_eq!(layout.environment_for("Sheet1"), "Sheet1");
    }

    #[test]
    fn test_inventory_rows_skip_header_and_separators() {
        let sheets = vec![SheetData::new(
            "gwre-ccs-staging",
            vec![
                vec![s("| AutoMinorVersionUpgrade | DBInstanceIdentifier | EngineVersion |")],
                vec![s("|-------------------------|----------------------|---------------|")],
                vec![s("|  True  |  billing-db-1  |  15.4  |")],
                vec![Data::Empty],
                vec![Data::Float(3.0)],
                vec![s("stray note")],
                vec![s("|  False |  search-db-2   |  13.9  |")],
            ],
        )];

        let rows = inventory_rows(&sheets, &layout());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].environment, "staging");
        assert_eq!(rows[0].row_number, 3);
        assert_eq!(rows[1].pipe_cell, "stray note");
        assert_eq!(rows[2].row_number, 7);
        assert!(rows.iter().all(|r| r.owner.is_none() && r.eol.is_none()));
    }

    #[test]
    fn test_inventory_rows_locate_explicit_columns() {
        let sheets = vec![SheetData::new(
            "gwre-ccs-prod",
            vec![
                vec![
                    s("AutoMinorVersionUpgrade | DBInstanceIdentifier | EngineVersion"),
                    s("Owner"),
                    s("End of Standard Support"),
                ],
                vec![s("True | finance-db-2 | 16.1"), s("  "), Data::Float(47000.0)],
                vec![s("True | ledger-db-1 | 14.9"), s("payments"), Data::Empty],
            ],
        )];

        let rows = inventory_rows(&sheets, &layout());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].owner, Some(s("  ")));
        assert_eq!(rows[0].eol, Some(Data::Float(47000.0)));
        assert_eq!(rows[1].owner, Some(s("payments")));
        assert_eq!(rows[1].eol, None);
    }

    #[test]
    fn test_inventory_sheets_concatenate_in_order() {
        let sheets = vec![
            SheetData::new("gwre-ccs-dev", vec![vec![s("True | a-1 | 15.1")]]),
            SheetData::new("empty", vec![]),
            SheetData::new("gwre-ccs-test", vec![vec![s("True | b-1 | 16.1")]]),
        ];
        let envs: Vec<String> = inventory_rows(&sheets, &layout())
            .into_iter()
            .map(|r| r.environment)
            .collect();
        assert_eq!(envs, vec!["dev", "test"]);
    }

    #[test]
    fn test_task_rows_keyed_by_header() {
        let sheets = vec![
            SheetData::new(
                "KTLO",
                vec![
                    vec![Data::Empty, Data::Empty],
                    vec![s("KTLO Item"), s("Status"), s("Due Date")],
                    vec![s("Rotate keys"), s("Completed"), Data::Float(45350.0)],
                    vec![Data::Empty, Data::Empty, Data::Empty],
                    vec![s("Upgrade agents"), Data::Empty],
                ],
            ),
            SheetData::new("Ignored", vec![vec![s("KTLO Item")], vec![s("nope")]]),
        ];

        let rows = task_rows(&sheets);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("KTLO Item"), Some(&s("Rotate keys")));
        assert_eq!(rows[0].get("Due Date"), Some(&Data::Float(45350.0)));
        assert_eq!(rows[0].row_number, 3);
        assert_eq!(rows[1].get("Status"), None);
        assert_eq!(rows[1].row_number, 5);
    }

    #[test]
    fn test_task_rows_empty_workbook() {
        assert!(task_rows(&[]).is_empty());
        assert!(task_rows(&[SheetData::new("KTLO", vec![])]).is_empty());
    }

    #[test]
    fn test_cell_helpers() {
        assert_eq!(cell_text(&s("  x ")), Some("x".to_string()));
        assert_eq!(cell_text(&s("   ")), None);
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_serial(&Data::Int(45292)), Some(45292.0));
        assert_eq!(cell_serial(&s("45292")), None);
    }

    #[test]
    fn test_read_workbook_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_workbook(&dir.path().join("missing.xlsx")).unwrap_err();
        assert!(matches!(err, OpsError::SourceUnreadable { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_read_workbook_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let dev = workbook.add_worksheet();
        dev.set_name("gwre-ccs-dev Nov 11").unwrap();
        dev.write_string(0, 0, "| AutoMinorVersionUpgrade | DBInstanceIdentifier | EngineVersion |")
            .unwrap();
        dev.write_string(1, 0, "| True | orders-db-1 | 15.4 |").unwrap();
        let prod = workbook.add_worksheet();
        prod.set_name("gwre-ccs-prod Nov 11").unwrap();
        prod.write_string(0, 0, "| False | orders-db-9 | 12.2 |").unwrap();
        prod.write_number(0, 1, 45292.0).unwrap();
        workbook.save(&path).unwrap();

        let sheets = read_workbook(&path).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "gwre-ccs-dev Nov 11");
        assert_eq!(sheets[0].rows.len(), 2);
        assert_eq!(cell_serial(&sheets[1].rows[0][1]), Some(45292.0));
    }
}
