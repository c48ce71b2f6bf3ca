//! Multi-year aggregation
//!
//! Runs the extractor over every fiscal-year workbook of the data directory and
//! reduces the decoded rows into one long fact table keyed by
//! (year, bucket, category, section, line item).

use crate::classify::{bucket_of, normalize};
use crate::error::{StatementError, StatementResult};
use crate::excel::{SheetSource, SheetTable};
use crate::extract::{coerce_amount, extract_sheet, find_subject_column, find_value_column};
use crate::sheets::{match_sheets, DuplicateSheetPolicy, SheetMap};
use crate::types::{
    AggregatedFact, Bucket, FactTable, Series, SheetKey, StatementType, UnitType,
    WorkbookRef,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

/// Normalized label of the cash-flow grand total expense row (`자 금 지 출 총 계`)
pub const GRAND_TOTAL_EXPENSE_LABEL: &str = "자금지출총계";

static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(20\d{2})").expect("year pattern is valid"));

/// What to do with a workbook whose file name carries no `20xx` year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearPolicy {
    /// Leave the file out of year-keyed results and log a warning
    #[default]
    Skip,
    /// Fail the whole request
    Error,
}

/// Fiscal year from the first `20xx` token of a file stem.
pub fn year_from_filename(stem: &str) -> Option<i32> {
    YEAR_TOKEN
        .captures(stem)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

//==============================================================================
// Data directory
//==============================================================================

/// Directory holding one workbook per fiscal year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDirectory {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DataDirectory {
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            root: root.into(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|e| self.extensions.contains(&e))
    }

    /// All workbooks with an accepted extension, sorted by file name.
    ///
    /// A missing directory simply has no workbooks. Lock files left behind by
    /// Excel (`~$...`) are ignored.
    pub fn workbooks(&self) -> StatementResult<Vec<WorkbookRef>> {
        if !self.root.is_dir() {
            debug!(dir = %self.root.display(), "Data directory does not exist");
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            let hidden = path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with("~$"));
            if path.is_file() && !hidden && self.accepts(&path) {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(paths
            .into_iter()
            .map(|path| {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let fiscal_year = year_from_filename(&stem);
                WorkbookRef {
                    path,
                    fiscal_year,
                    year_label: fiscal_year.map_or(stem, |y| y.to_string()),
                }
            })
            .collect())
    }
}

//==============================================================================
// Aggregator
//==============================================================================

type FactKey = (i32, Bucket, String, String, String);

/// Builds year-keyed tables from the data directory through a [`SheetSource`].
pub struct Aggregator<S> {
    source: S,
    data: DataDirectory,
    year_policy: YearPolicy,
    duplicate_policy: DuplicateSheetPolicy,
}

impl<S: SheetSource> Aggregator<S> {
    pub fn new(source: S, data: DataDirectory) -> Self {
        Self {
            source,
            data,
            year_policy: YearPolicy::default(),
            duplicate_policy: DuplicateSheetPolicy::default(),
        }
    }

    pub fn with_year_policy(mut self, policy: YearPolicy) -> Self {
        self.year_policy = policy;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicateSheetPolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn data_directory(&self) -> &DataDirectory {
        &self.data
    }

    /// Workbooks with an integer fiscal year, in file name order.
    pub fn dated_workbooks(&self) -> StatementResult<Vec<(i32, WorkbookRef)>> {
        let mut dated = Vec::new();
        for wb in self.data.workbooks()? {
            match wb.year() {
                Some(year) => dated.push((year, wb)),
                None => match self.year_policy {
                    YearPolicy::Skip => {
                        warn!(file = %wb.file_name(), "No fiscal year in file name, skipping");
                    }
                    YearPolicy::Error => {
                        return Err(StatementError::FilenameYear(wb.file_name()));
                    }
                },
            }
        }
        Ok(dated)
    }

    /// The most recent fiscal-year workbook; the first by file name on ties.
    pub fn latest_workbook(&self) -> StatementResult<Option<(i32, WorkbookRef)>> {
        let mut latest: Option<(i32, WorkbookRef)> = None;
        for (year, wb) in self.dated_workbooks()? {
            if latest.as_ref().map_or(true, |(y, _)| year > *y) {
                latest = Some((year, wb));
            }
        }
        Ok(latest)
    }

    /// Statement sheets of one workbook.
    pub fn sheet_map(&self, path: &Path) -> StatementResult<SheetMap> {
        let names = self.source.sheet_names(path)?;
        match_sheets(&names, self.duplicate_policy)
    }

    /// Read the sheet matching `key`, or `MissingSheet` when the workbook has none.
    pub fn locate(&self, path: &Path, key: SheetKey) -> StatementResult<Arc<SheetTable>> {
        let map = self.sheet_map(path)?;
        let sheet = map.get(&key).ok_or_else(|| StatementError::MissingSheet {
            path: path.display().to_string(),
            key: key.to_string(),
        })?;
        self.source.read_sheet(path, sheet)
    }

    fn log_skip(wb: &WorkbookRef, key: SheetKey, err: &StatementError) {
        if err.is_missing_data() {
            debug!(file = %wb.file_name(), %key, "No matching sheet");
        } else {
            warn!(file = %wb.file_name(), %key, error = %err, "Skipping workbook");
        }
    }

    /// Sum leaf rows of every dated workbook into facts.
    ///
    /// A workbook that fails in any way is skipped as a whole for this key; the
    /// other workbooks are unaffected. Facts keep first-seen order. Rows whose
    /// amount could not be read add nothing to their group's sum.
    pub fn build_series_table(
        &self,
        statement: StatementType,
        unit: UnitType,
        value_column: &str,
    ) -> StatementResult<FactTable> {
        let key = SheetKey::new(statement, unit);
        let mut table = FactTable::new(statement, unit);
        let mut index: HashMap<FactKey, usize> = HashMap::new();
        let mut files = 0usize;

        for (year, wb) in self.dated_workbooks()? {
            let rows = match self
                .locate(&wb.path, key)
                .and_then(|sheet| extract_sheet(&sheet, statement, value_column))
            {
                Ok(rows) => rows,
                Err(e) => {
                    Self::log_skip(&wb, key, &e);
                    continue;
                }
            };
            files += 1;

            for row in rows {
                let bucket = bucket_of(statement, &row.category);
                let fact_key = (
                    year,
                    bucket,
                    row.category.clone(),
                    row.section.clone(),
                    row.line_item.clone(),
                );
                let amount = row.amount.unwrap_or(0.0);
                match index.get(&fact_key) {
                    Some(&i) => table.facts[i].amount += amount,
                    None => {
                        index.insert(fact_key, table.facts.len());
                        table.facts.push(AggregatedFact {
                            year,
                            bucket,
                            category: row.category,
                            section: row.section,
                            line_item: row.line_item,
                            amount,
                        });
                    }
                }
            }
        }

        info!(
            %key,
            files,
            facts = table.len(),
            "Built fact table"
        );
        Ok(table)
    }

    /// Per-year value of the cash-flow `자 금 지 출 총 계` row.
    ///
    /// Rows are matched on the whitespace-free subject; the last match in file
    /// order wins. Years where the row is missing or its value is unreadable are
    /// omitted. Two workbooks of the same year add up.
    pub fn grand_total_row_series(
        &self,
        unit: UnitType,
        value_column: &str,
    ) -> StatementResult<Series> {
        let key = SheetKey::new(StatementType::CashFlow, unit);
        let mut sums: BTreeMap<i32, f64> = BTreeMap::new();

        for (year, wb) in self.dated_workbooks()? {
            let found = self.locate(&wb.path, key).and_then(|sheet| {
                let subject = find_subject_column(&sheet)?;
                let value = find_value_column(&sheet, value_column)?;
                let hit = (0..sheet.height()).rev().find(|&r| {
                    normalize(&sheet.cell(r, subject).text()) == GRAND_TOTAL_EXPENSE_LABEL
                });
                Ok(hit.and_then(|r| coerce_amount(sheet.cell(r, value))))
            });

            match found {
                Ok(Some(amount)) => *sums.entry(year).or_insert(0.0) += amount,
                Ok(None) => debug!(file = %wb.file_name(), "No grand total row value"),
                Err(e) => Self::log_skip(&wb, key, &e),
            }
        }

        Ok(Series::from_year_sums(sums))
    }
}
