//! Workbook fixtures shared by the integration tests
//!
//! Fixtures are real .xlsx files written with rust_xlsxwriter and read back
//! through calamine by the code under test.

#![allow(dead_code)]

use rust_xlsxwriter::Workbook;
use statement_trends::config::AnalyticsConfig;
use statement_trends::CachedAnalytics;
use std::path::{Path, PathBuf};

/// Cell content of the value column.
#[derive(Debug, Clone, Copy)]
pub enum Value {
    Num(f64),
    Text(&'static str),
    Blank,
}

pub use Value::{Blank, Num, Text};

/// One worksheet: a subject column followed by value columns.
#[derive(Debug, Clone)]
pub struct SheetFixture {
    pub name: String,
    pub headers: Vec<&'static str>,
    pub rows: Vec<(String, Vec<Value>)>,
}

impl SheetFixture {
    /// `과목` plus a single value column.
    pub fn new(name: &str, value_header: &'static str) -> Self {
        Self::with_headers(name, &["과목", value_header])
    }

    pub fn with_headers(name: &str, headers: &[&'static str]) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    /// 관 row (no indentation)
    pub fn category(self, label: &str, value: Value) -> Self {
        self.row(label, value)
    }

    /// 항 row (5 spaces)
    pub fn section(self, label: &str, value: Value) -> Self {
        self.row(&format!("{}{}", " ".repeat(5), label), value)
    }

    /// 목 row (10 spaces)
    pub fn item(self, label: &str, value: Value) -> Self {
        self.row(&format!("{}{}", " ".repeat(10), label), value)
    }

    /// Row with the label written verbatim.
    pub fn row(mut self, label: &str, value: Value) -> Self {
        self.rows.push((label.to_string(), vec![value]));
        self
    }

    pub fn row_values(mut self, label: &str, values: &[Value]) -> Self {
        self.rows.push((label.to_string(), values.to_vec()));
        self
    }
}

/// Cash-flow sheet (`결산` column) for a unit, e.g. `cash_flow("전체")`.
pub fn cash_flow(unit: &str) -> SheetFixture {
    SheetFixture::new(&format!("자금계산서({})", unit), "결산")
}

/// Balance sheet (`당기` column) for a unit.
pub fn balance_sheet(unit: &str) -> SheetFixture {
    SheetFixture::new(&format!("재무상태표({})", unit), "당기")
}

pub fn write_workbook(path: &Path, sheets: &[SheetFixture]) {
    let mut workbook = Workbook::new();
    for sheet in sheets {
        let ws = workbook.add_worksheet();
        ws.set_name(&sheet.name).unwrap();
        for (c, header) in sheet.headers.iter().enumerate() {
            ws.write_string(0, c as u16, *header).unwrap();
        }
        for (r, (label, values)) in sheet.rows.iter().enumerate() {
            let r = (r + 1) as u32;
            ws.write_string(r, 0, label).unwrap();
            for (c, value) in values.iter().enumerate() {
                let c = (c + 1) as u16;
                match value {
                    Num(n) => ws.write_number(r, c, *n).unwrap(),
                    Text(t) => ws.write_string(r, c, *t).unwrap(),
                    Blank => continue,
                };
            }
        }
    }
    workbook.save(path).unwrap();
}

/// Write `<dir>/<file>` and return its path.
pub fn add_workbook(dir: &Path, file: &str, sheets: &[SheetFixture]) -> PathBuf {
    let path = dir.join(file);
    write_workbook(&path, sheets);
    path
}

pub fn config_for(dir: &Path) -> AnalyticsConfig {
    AnalyticsConfig {
        data_dir: dir.to_path_buf(),
        ..AnalyticsConfig::default()
    }
}

pub fn analytics_for(dir: &Path) -> CachedAnalytics {
    CachedAnalytics::from_config(&config_for(dir))
}

/// Tuition income and salaries for one year.
pub fn simple_cash_flow(tuition: f64, salaries: f64) -> SheetFixture {
    cash_flow("전체")
        .category("등록금및수강료수입", Blank)
        .section("등록금수입", Blank)
        .item("등록금", Num(tuition))
        .category("보수", Blank)
        .section("교원보수", Blank)
        .item("교원급여", Num(salaries))
}
