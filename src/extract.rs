//! Per-file row extractor
//!
//! Turns one matched statement sheet into decoded rows. The 관/항/목 hierarchy
//! is recovered by folding over the rows top to bottom with [`DecoderState`],
//! carrying forward the latest label seen at each depth.

use crate::classify::{self, clean_label, depth_of};
use crate::error::{StatementError, StatementResult};
use crate::excel::SheetTable;
use crate::types::{Bucket, Cell, DecodedRow, RawRow, StatementType};
use serde::Serialize;

/// Accepted spellings of the subject column header, in priority order.
pub const SUBJECT_CANDIDATES: &[&str] = &["과목", "계정", "항목", "과목명", "계정과목", "계정명"];

/// Categories whose header row carries the value itself instead of children.
pub const SPECIAL_CATEGORIES: &[&str] = &["미사용전기이월자금", "미사용차기이월자금"];

pub fn is_special_category(name: &str) -> bool {
    SPECIAL_CATEGORIES.contains(&name.trim())
}

//==============================================================================
// Columns and cells
//==============================================================================

/// Locate the subject column: exact header match first, then substring.
pub fn find_subject_column(table: &SheetTable) -> StatementResult<usize> {
    let exact = table
        .headers
        .iter()
        .position(|h| SUBJECT_CANDIDATES.contains(&h.trim()));
    let fuzzy = || {
        table
            .headers
            .iter()
            .position(|h| SUBJECT_CANDIDATES.iter().any(|c| h.contains(c)))
    };

    exact.or_else(fuzzy).ok_or_else(|| StatementError::MissingColumn {
        sheet: table.name.clone(),
        wanted: format!("one of {}", SUBJECT_CANDIDATES.join("/")),
    })
}

pub fn find_value_column(table: &SheetTable, name: &str) -> StatementResult<usize> {
    table
        .column_index(name)
        .ok_or_else(|| StatementError::MissingColumn {
            sheet: table.name.clone(),
            wanted: name.to_string(),
        })
}

/// Read a cell as an amount.
///
/// Text has thousands separators and spaces removed before parsing. Blank or
/// unparseable cells yield `None`, which later sums skip rather than count as 0.
pub fn coerce_amount(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) => n.is_finite().then_some(*n),
        Cell::Text(s) => {
            let cleaned: String = s.chars().filter(|c| *c != ',' && *c != ' ').collect();
            match cleaned.trim() {
                "" | "nan" | "None" => None,
                t => t.parse::<f64>().ok().filter(|n| n.is_finite()),
            }
        }
    }
}

//==============================================================================
// Hierarchy decoding
//==============================================================================

/// Leading-whitespace depths that mark each hierarchy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthThresholds {
    pub category: usize,
    pub section: usize,
    /// Minimum depth of a line item
    pub line_item: usize,
}

impl DepthThresholds {
    pub const STANDARD: DepthThresholds = DepthThresholds {
        category: 0,
        section: 5,
        line_item: 10,
    };

    /// Every statement currently uses the standard layout.
    pub fn for_statement(_statement: StatementType) -> Self {
        Self::STANDARD
    }
}

impl Default for DepthThresholds {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Cursor carried while scanning a sheet top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderState {
    pub category: String,
    pub section: String,
    pub line_item: String,
}

impl DecoderState {
    /// Consume one label at the given depth.
    ///
    /// A new category clears section and line item; a special category names
    /// itself as its line item so its header value survives as a leaf. A new
    /// section clears the line item. Depths between levels leave the state as is.
    pub fn advance(&mut self, depth: usize, name: &str, thresholds: DepthThresholds) {
        if depth == thresholds.category {
            self.category = name.to_string();
            self.section.clear();
            self.line_item = if is_special_category(name) {
                name.to_string()
            } else {
                String::new()
            };
        } else if depth == thresholds.section {
            self.section = name.to_string();
            self.line_item.clear();
        } else if depth >= thresholds.line_item {
            self.line_item = name.to_string();
        }
    }
}

/// Decode every non-blank row, in file order.
pub fn decode_rows(
    rows: &[RawRow],
    value_column: &str,
    thresholds: DepthThresholds,
) -> Vec<DecodedRow> {
    rows.iter()
        .map(|row| (row, row.label.replace('\u{00a0}', " ")))
        .filter(|(_, label)| !label.trim().is_empty())
        .scan(DecoderState::default(), |state, (row, label)| {
            let label = label.trim_end();
            let depth = depth_of(label);
            let name = clean_label(label);
            state.advance(depth, &name, thresholds);
            Some(DecodedRow {
                label: name,
                depth,
                category: state.category.clone(),
                section: state.section.clone(),
                line_item: state.line_item.clone(),
                amount: row.value(value_column).and_then(coerce_amount),
            })
        })
        .collect()
}

/// Subject labels and values of a sheet as raw rows.
pub fn raw_rows(table: &SheetTable, subject_col: usize) -> Vec<RawRow> {
    (0..table.height())
        .map(|r| {
            let mut row = RawRow::new(table.cell(r, subject_col).text());
            for (c, header) in table.headers.iter().enumerate() {
                if c != subject_col {
                    row.values
                        .entry(header.trim().to_string())
                        .or_insert_with(|| table.cell(r, c).clone());
                }
            }
            row
        })
        .collect()
}

/// Decode a matched sheet, keeping every non-blank row.
pub fn decode_sheet(
    table: &SheetTable,
    statement: StatementType,
    value_column: &str,
) -> StatementResult<Vec<DecodedRow>> {
    let subject_col = find_subject_column(table)?;
    find_value_column(table, value_column)?;
    Ok(decode_rows(
        &raw_rows(table, subject_col),
        value_column,
        DepthThresholds::for_statement(statement),
    ))
}

/// Decode a matched sheet and keep only leaf rows (non-empty line item).
pub fn extract_sheet(
    table: &SheetTable,
    statement: StatementType,
    value_column: &str,
) -> StatementResult<Vec<DecodedRow>> {
    let mut rows = decode_sheet(table, statement, value_column)?;
    rows.retain(DecodedRow::is_leaf);
    Ok(rows)
}

//==============================================================================
// Raw statement view
//==============================================================================

/// One displayed row of a statement sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementLine {
    /// Label with its indentation preserved (NBSP as space, right-trimmed)
    pub label: String,
    pub depth: usize,
    pub indent: usize,
    pub bucket: Bucket,
    pub separator: bool,
    /// Values in `StatementView::columns` order
    #[serde(skip)]
    pub values: Vec<Cell>,
}

/// A statement sheet prepared for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementView {
    pub sheet: String,
    pub statement: StatementType,
    pub columns: Vec<String>,
    pub lines: Vec<StatementLine>,
}

/// Build the raw view of a sheet: every row with a non-blank subject, tagged with
/// its indentation level, block bucket and separator flag.
pub fn statement_view(
    table: &SheetTable,
    statement: StatementType,
) -> StatementResult<StatementView> {
    let subject_col = find_subject_column(table)?;
    let columns: Vec<(usize, String)> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(c, _)| *c != subject_col)
        .map(|(c, h)| (c, h.trim().to_string()))
        .collect();

    let kept: Vec<(usize, String)> = table
        .column(subject_col)
        .enumerate()
        .filter(|(_, cell)| !cell.is_blank())
        .map(|(r, cell)| (r, cell.text().replace('\u{00a0}', " ").trim_end().to_string()))
        .collect();

    let labels: Vec<&str> = kept.iter().map(|(_, l)| l.as_str()).collect();
    let buckets = classify::classify_blocks(statement, &labels);

    let lines = kept
        .iter()
        .zip(buckets)
        .map(|((r, label), bucket)| StatementLine {
            depth: depth_of(label),
            indent: classify::indent_level(label),
            bucket,
            separator: classify::is_expense_separator(label),
            values: columns.iter().map(|(c, _)| table.cell(*r, *c).clone()).collect(),
            label: label.clone(),
        })
        .collect();

    Ok(StatementView {
        sheet: table.name.clone(),
        statement,
        columns: columns.into_iter().map(|(_, h)| h).collect(),
        lines,
    })
}
