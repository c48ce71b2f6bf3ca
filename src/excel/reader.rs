//! Workbook reader - Excel (.xlsx/.xlsm) → in-memory sheet tables

use crate::error::{StatementError, StatementResult};
use crate::types::Cell;
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A worksheet materialized into memory: first row is the header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Index of the first header equal to `name` after trimming.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Cell at (row, column); short rows read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// All cells of one column, top to bottom.
    pub fn column(&self, col: usize) -> impl Iterator<Item = &Cell> + '_ {
        (0..self.rows.len()).map(move |row| self.cell(row, col))
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// Where sheet data comes from. The aggregator only sees this trait, so a
/// cache (or a test double) can sit in front of the real reader.
pub trait SheetSource: Send + Sync {
    /// Sheet names of a workbook, in workbook order.
    fn sheet_names(&self, path: &Path) -> StatementResult<Vec<String>>;

    /// Read one sheet of a workbook.
    fn read_sheet(&self, path: &Path, sheet: &str) -> StatementResult<Arc<SheetTable>>;
}

/// Reads workbooks from disk with calamine. Every call opens the file anew.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalamineSource;

impl CalamineSource {
    pub fn new() -> Self {
        Self
    }
}

impl SheetSource for CalamineSource {
    fn sheet_names(&self, path: &Path) -> StatementResult<Vec<String>> {
        let workbook = open_workbook_auto(path).map_err(|e| {
            StatementError::Workbook(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Ok(workbook.sheet_names())
    }

    fn read_sheet(&self, path: &Path, sheet: &str) -> StatementResult<Arc<SheetTable>> {
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            StatementError::Workbook(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let range = workbook.worksheet_range(sheet).map_err(|e| {
            StatementError::Workbook(format!(
                "Failed to read sheet '{}' of {}: {}",
                sheet,
                path.display(),
                e
            ))
        })?;

        let table = table_from_range(sheet, &range);
        debug!(
            path = %path.display(),
            sheet,
            rows = table.height(),
            "Read worksheet"
        );
        Ok(Arc::new(table))
    }
}

/// Convert a calamine range into a sheet table.
fn table_from_range(sheet: &str, range: &Range<Data>) -> SheetTable {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(col, cell)| match cell {
                Data::String(s) => s.clone(),
                Data::Int(i) => i.to_string(),
                Data::Float(f) => f.to_string(),
                _ => format!("col_{}", col),
            })
            .collect(),
        None => return SheetTable::new(sheet, Vec::new()),
    };

    let mut table = SheetTable::new(sheet, headers);
    table.rows = rows.map(|row| row.iter().map(convert_cell).collect()).collect();
    table
}

fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}
