//! Statement analytics engine
//!
//! Entry point used by the CLI and the HTTP API: resolves value columns,
//! reference order and synthetic selections on top of the [`Aggregator`].

use crate::aggregate::{Aggregator, DataDirectory};
use crate::composition::{self, Composition, CompositionRequest};
use crate::config::AnalyticsConfig;
use crate::error::{StatementError, StatementResult};
use crate::excel::{CalamineSource, SheetCache, SheetSource};
use crate::extract::{statement_view, StatementView};
use crate::select::{self, ReferenceOrder};
use crate::types::{
    Bucket, FactTable, Level, Selection, Series, SeriesOption, SheetKey, StatementType, UnitType,
};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// The default engine: calamine reads behind a process-wide sheet cache.
pub type CachedAnalytics = Analytics<SheetCache<CalamineSource>>;

/// One workbook of the data directory as listed by `years`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkbookSummary {
    pub file: String,
    pub year_label: String,
    pub year: Option<i32>,
    pub sheets: Vec<SheetKey>,
    pub error: Option<String>,
}

pub struct Analytics<S> {
    aggregator: Aggregator<S>,
}

impl CachedAnalytics {
    pub fn from_config(config: &AnalyticsConfig) -> Self {
        let data = DataDirectory::new(&config.data_dir, &config.extensions);
        let aggregator = Aggregator::new(SheetCache::new(CalamineSource::new()), data)
            .with_year_policy(config.year_policy)
            .with_duplicate_policy(config.duplicate_sheet_policy);
        Self::new(aggregator)
    }
}

fn check_bucket(statement: StatementType, bucket: Option<Bucket>) -> StatementResult<()> {
    match bucket {
        Some(b) if b != Bucket::Other && !statement.buckets().contains(&b) => {
            Err(StatementError::Validation(format!(
                "Bucket '{}' does not apply to {}",
                b, statement
            )))
        }
        _ => Ok(()),
    }
}

impl<S: SheetSource> Analytics<S> {
    pub fn new(aggregator: Aggregator<S>) -> Self {
        Self { aggregator }
    }

    pub fn aggregator(&self) -> &Aggregator<S> {
        &self.aggregator
    }

    /// Fiscal years with a workbook, ascending.
    pub fn available_years(&self) -> StatementResult<Vec<i32>> {
        let mut years: Vec<i32> = self
            .aggregator
            .dated_workbooks()?
            .into_iter()
            .map(|(y, _)| y)
            .collect();
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }

    /// Every workbook of the data directory with its recognised sheets.
    pub fn workbooks(&self) -> StatementResult<Vec<WorkbookSummary>> {
        let workbooks = self.aggregator.data_directory().workbooks()?;
        Ok(workbooks
            .into_iter()
            .map(|wb| {
                let (sheets, error): (Vec<SheetKey>, Option<String>) =
                    match self.aggregator.sheet_map(&wb.path) {
                        Ok(map) => (map.iter().map(|(k, _)| *k).collect(), None),
                        Err(e) => (Vec::new(), Some(e.to_string())),
                    };
                WorkbookSummary {
                    file: wb.file_name(),
                    year: wb.year(),
                    year_label: wb.year_label,
                    sheets,
                    error,
                }
            })
            .collect())
    }

    pub fn fact_table(&self, statement: StatementType, unit: UnitType) -> StatementResult<FactTable> {
        self.aggregator
            .build_series_table(statement, unit, statement.value_column())
    }

    /// Label order of the most recent workbook; empty when it cannot be read.
    pub fn reference_order(&self, statement: StatementType, unit: UnitType) -> ReferenceOrder {
        let key = SheetKey::new(statement, unit);
        let latest = match self.aggregator.latest_workbook() {
            Ok(Some((_, wb))) => wb,
            Ok(None) => return ReferenceOrder::default(),
            Err(e) => {
                warn!(error = %e, "Cannot pick reference workbook");
                return ReferenceOrder::default();
            }
        };

        match self
            .aggregator
            .locate(&latest.path, key)
            .and_then(|sheet| ReferenceOrder::from_sheet(&sheet, statement))
        {
            Ok(order) => {
                debug!(file = %latest.file_name(), %key, "Reference order loaded");
                order
            }
            Err(e) => {
                debug!(file = %latest.file_name(), %key, error = %e, "No reference order");
                ReferenceOrder::default()
            }
        }
    }

    pub fn list_options(
        &self,
        statement: StatementType,
        unit: UnitType,
        level: Level,
        bucket: Option<Bucket>,
    ) -> StatementResult<Vec<SeriesOption>> {
        check_bucket(statement, bucket)?;
        let table = self.fact_table(statement, unit)?;
        let order = self.reference_order(statement, unit);
        Ok(select::list_options(&table, &order, level, bucket))
    }

    /// Year → amount series for a selection. Empty when there is no data.
    pub fn get_series(
        &self,
        statement: StatementType,
        unit: UnitType,
        selection: &Selection,
        bucket: Option<Bucket>,
    ) -> StatementResult<Series> {
        check_bucket(statement, bucket)?;
        match selection {
            Selection::CashOutflowTotal => {
                if statement != StatementType::CashFlow {
                    return Err(StatementError::Validation(format!(
                        "The grand total row exists only in {}",
                        StatementType::CashFlow
                    )));
                }
                self.aggregator
                    .grand_total_row_series(unit, statement.value_column())
            }
            Selection::TotalAssets | Selection::TotalLiabilitiesAndFunds
                if !statement.is_balance_sheet() =>
            {
                Err(StatementError::Validation(format!(
                    "Balance totals exist only in {}",
                    StatementType::BalanceSheet
                )))
            }
            // balance totals sum whole categories and ignore the bucket filter
            Selection::TotalAssets | Selection::TotalLiabilitiesAndFunds => {
                let table = self.fact_table(statement, unit)?;
                Ok(select::series_from_facts(&table, selection).unwrap_or_default())
            }
            _ => {
                let table = self.fact_table(statement, unit)?.filtered(bucket);
                Ok(select::series_from_facts(&table, selection).unwrap_or_default())
            }
        }
    }

    pub fn composition(
        &self,
        statement: StatementType,
        unit: UnitType,
        request: &CompositionRequest,
    ) -> StatementResult<Composition> {
        check_bucket(statement, Some(request.bucket))?;
        let table = self.fact_table(statement, unit)?;
        let order = self.reference_order(statement, unit);
        composition::composition(&table, &order, request)
    }

    /// Raw view of one workbook's statement sheet.
    pub fn read_statement(&self, path: &Path, key: SheetKey) -> StatementResult<StatementView> {
        let sheet = self.aggregator.locate(path, key)?;
        statement_view(&sheet, key.statement)
    }
}
