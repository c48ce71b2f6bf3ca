//! Excel exporter - series reports and fact tables → .xlsx

use crate::error::{StatementError, StatementResult};
use crate::report::SeriesReport;
use crate::types::FactTable;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;
use tracing::info;

pub const REPORT_SHEET: &str = "증감현황";
pub const FACTS_SHEET: &str = "집계";

const REPORT_HEADERS: [(&str, f64); 5] = [
    ("연도", 8.0),
    ("금액", 18.0),
    ("금액(백만원)", 14.0),
    ("증감(백만원)", 14.0),
    ("증감률", 10.0),
];

const FACT_HEADERS: [(&str, f64); 6] = [
    ("연도", 8.0),
    ("구분", 10.0),
    ("관", 22.0),
    ("항", 22.0),
    ("목", 26.0),
    ("금액", 18.0),
];

/// Writes a series report and/or a fact table to one workbook.
#[derive(Debug, Default)]
pub struct SeriesExporter<'a> {
    report: Option<&'a SeriesReport>,
    facts: Option<&'a FactTable>,
}

struct Formats {
    header: Format,
    amount: Format,
    millions: Format,
    percent: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            amount: Format::new().set_num_format("#,##0"),
            millions: Format::new().set_num_format("#,##0.0"),
            percent: Format::new().set_num_format("+0.00%;-0.00%;0.00%"),
        }
    }
}

impl<'a> SeriesExporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(mut self, report: &'a SeriesReport) -> Self {
        self.report = Some(report);
        self
    }

    pub fn with_facts(mut self, facts: &'a FactTable) -> Self {
        self.facts = Some(facts);
        self
    }

    /// Build the workbook in memory.
    pub fn to_workbook(&self) -> StatementResult<Workbook> {
        if self.report.is_none() && self.facts.is_none() {
            return Err(StatementError::Export("Nothing to export".to_string()));
        }

        let formats = Formats::new();
        let mut workbook = Workbook::new();

        if let Some(report) = self.report {
            let sheet = workbook.add_worksheet();
            sheet.set_name(REPORT_SHEET)?;
            write_headers(sheet, &REPORT_HEADERS, &formats)?;
            write_report(sheet, report, &formats)?;
        }

        if let Some(facts) = self.facts {
            let sheet = workbook.add_worksheet();
            sheet.set_name(FACTS_SHEET)?;
            write_headers(sheet, &FACT_HEADERS, &formats)?;
            write_facts(sheet, facts, &formats)?;
        }

        Ok(workbook)
    }

    /// Export to an .xlsx file
    pub fn export(&self, output_path: &Path) -> StatementResult<()> {
        let mut workbook = self.to_workbook()?;
        workbook.save(output_path).map_err(|e| {
            StatementError::Export(format!(
                "Failed to save {}: {}",
                output_path.display(),
                e
            ))
        })?;
        info!(path = %output_path.display(), "Exported workbook");
        Ok(())
    }

    /// Export to an in-memory .xlsx file
    pub fn to_bytes(&self) -> StatementResult<Vec<u8>> {
        Ok(self.to_workbook()?.save_to_buffer()?)
    }
}

fn write_headers(
    sheet: &mut Worksheet,
    headers: &[(&str, f64)],
    formats: &Formats,
) -> StatementResult<()> {
    for (col, (name, width)) in headers.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *name, &formats.header)?;
        sheet.set_column_width(col, *width)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_report(
    sheet: &mut Worksheet,
    report: &SeriesReport,
    formats: &Formats,
) -> StatementResult<()> {
    for (i, row) in report.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_number(r, 0, row.year)?;
        sheet.write_number_with_format(r, 1, row.amount, &formats.amount)?;
        sheet.write_number_with_format(r, 2, row.millions, &formats.millions)?;
        if let Some(delta) = row.delta_millions {
            sheet.write_number_with_format(r, 3, delta, &formats.millions)?;
        }
        if let Some(pct) = row.pct_change {
            sheet.write_number_with_format(r, 4, pct, &formats.percent)?;
        }
    }
    Ok(())
}

fn write_facts(sheet: &mut Worksheet, facts: &FactTable, formats: &Formats) -> StatementResult<()> {
    for (i, fact) in facts.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_number(r, 0, fact.year)?;
        sheet.write_string(r, 1, fact.bucket.label())?;
        sheet.write_string(r, 2, &fact.category)?;
        sheet.write_string(r, 3, &fact.section)?;
        sheet.write_string(r, 4, &fact.line_item)?;
        sheet.write_number_with_format(r, 5, fact.amount, &formats.amount)?;
    }
    Ok(())
}
