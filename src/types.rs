use crate::error::{StatementError, StatementResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

//==============================================================================
// Sheet keys
//==============================================================================

/// Financial statement kind. Each kind is a separate worksheet convention.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum StatementType {
    /// 자금계산서
    #[serde(alias = "자금계산서")]
    #[value(alias = "자금계산서")]
    CashFlow,
    /// 재무상태표
    #[serde(alias = "재무상태표")]
    #[value(alias = "재무상태표")]
    BalanceSheet,
    /// 운영계산서
    #[serde(alias = "운영계산서")]
    #[value(alias = "운영계산서")]
    Operating,
}

impl StatementType {
    pub const ALL: [StatementType; 3] = [
        StatementType::CashFlow,
        StatementType::BalanceSheet,
        StatementType::Operating,
    ];

    /// The literal used in sheet names
    pub fn label(self) -> &'static str {
        match self {
            StatementType::CashFlow => "자금계산서",
            StatementType::BalanceSheet => "재무상태표",
            StatementType::Operating => "운영계산서",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label.trim())
    }

    /// Column holding the amount that feeds the year-over-year series.
    ///
    /// Cash-flow statements report `결산` (actual); the balance sheet and the
    /// operating statement report `당기` (this period).
    pub fn value_column(self) -> &'static str {
        match self {
            StatementType::CashFlow => "결산",
            StatementType::BalanceSheet | StatementType::Operating => "당기",
        }
    }

    pub fn is_balance_sheet(self) -> bool {
        self == StatementType::BalanceSheet
    }

    /// The two buckets a category of this statement can fall in (besides `기타`)
    pub fn buckets(self) -> [Bucket; 2] {
        if self.is_balance_sheet() {
            [Bucket::Asset, Bucket::LiabilityAndFund]
        } else {
            [Bucket::Income, Bucket::Expense]
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StatementType {
    type Err = StatementError;

    fn from_str(s: &str) -> StatementResult<Self> {
        if let Some(st) = Self::from_label(s) {
            return Ok(st);
        }
        match s.trim().to_ascii_lowercase().as_str() {
            "cash-flow" | "cashflow" => Ok(StatementType::CashFlow),
            "balance-sheet" | "balancesheet" => Ok(StatementType::BalanceSheet),
            "operating" => Ok(StatementType::Operating),
            _ => Err(StatementError::Validation(format!(
                "Unknown statement type '{}'",
                s
            ))),
        }
    }
}

/// Fund partition a statement sheet covers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum UnitType {
    /// 전체
    #[serde(alias = "전체")]
    #[value(alias = "전체")]
    Total,
    /// 등록금
    #[serde(alias = "등록금")]
    #[value(alias = "등록금")]
    Tuition,
    /// 비등록금
    #[serde(alias = "비등록금")]
    #[value(alias = "비등록금")]
    NonTuition,
}

impl UnitType {
    pub const ALL: [UnitType; 3] = [UnitType::Total, UnitType::Tuition, UnitType::NonTuition];

    pub fn label(self) -> &'static str {
        match self {
            UnitType::Total => "전체",
            UnitType::Tuition => "등록금",
            UnitType::NonTuition => "비등록금",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.label() == label.trim())
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UnitType {
    type Err = StatementError;

    fn from_str(s: &str) -> StatementResult<Self> {
        if let Some(unit) = Self::from_label(s) {
            return Ok(unit);
        }
        match s.trim().to_ascii_lowercase().as_str() {
            "total" => Ok(UnitType::Total),
            "tuition" => Ok(UnitType::Tuition),
            "non-tuition" | "nontuition" => Ok(UnitType::NonTuition),
            _ => Err(StatementError::Validation(format!(
                "Unknown unit type '{}'",
                s
            ))),
        }
    }
}

/// (statement type, unit type) pair identifying one worksheet per workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SheetKey {
    pub statement: StatementType,
    pub unit: UnitType,
}

impl SheetKey {
    pub fn new(statement: StatementType, unit: UnitType) -> Self {
        Self { statement, unit }
    }
}

impl fmt::Display for SheetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.statement.label(), self.unit.label())
    }
}

//==============================================================================
// Classification
//==============================================================================

/// Summary bucket assigned to a category.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    #[serde(alias = "수입")]
    #[value(alias = "수입")]
    Income,
    #[serde(alias = "지출")]
    #[value(alias = "지출")]
    Expense,
    #[serde(alias = "자산")]
    #[value(alias = "자산")]
    Asset,
    #[serde(alias = "부채/기본금")]
    #[value(alias = "부채/기본금")]
    LiabilityAndFund,
    #[serde(alias = "기타")]
    #[value(alias = "기타")]
    Other,
}

impl Bucket {
    pub fn label(self) -> &'static str {
        match self {
            Bucket::Income => "수입",
            Bucket::Expense => "지출",
            Bucket::Asset => "자산",
            Bucket::LiabilityAndFund => "부채/기본금",
            Bucket::Other => "기타",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Hierarchy level: 관 / 항 / 목
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    #[serde(alias = "관")]
    #[value(alias = "관")]
    Category,
    #[serde(alias = "항")]
    #[value(alias = "항")]
    Section,
    #[serde(alias = "목")]
    #[value(alias = "목")]
    LineItem,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::Category => "관",
            Level::Section => "항",
            Level::LineItem => "목",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

//==============================================================================
// Workbooks and rows
//==============================================================================

/// One fiscal-year workbook found in the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkbookRef {
    pub path: PathBuf,
    /// Set only when the file stem carries a `20xx` token
    pub fiscal_year: Option<i32>,
    /// The fiscal year, or the whole stem when there is none
    pub year_label: String,
}

impl WorkbookRef {
    pub fn year(&self) -> Option<i32> {
        self.fiscal_year
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A single worksheet cell, reduced to what the analytics need.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Display text of the cell; numbers keep their shortest representation.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(_) => false,
            Cell::Text(s) => s.trim().is_empty(),
        }
    }
}

/// One row of a matched sheet: the subject label plus its other columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub label: String,
    pub values: BTreeMap<String, Cell>,
}

impl RawRow {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn value(&self, column: &str) -> Option<&Cell> {
        self.values.get(column)
    }
}

/// A row annotated with its position in the 관/항/목 hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRow {
    /// Trimmed subject text
    pub label: String,
    pub depth: usize,
    pub category: String,
    pub section: String,
    pub line_item: String,
    /// `None` when the cell could not be read as a number
    pub amount: Option<f64>,
}

impl DecodedRow {
    pub fn is_leaf(&self) -> bool {
        !self.line_item.trim().is_empty()
    }
}

//==============================================================================
// Aggregated facts
//==============================================================================

/// Summed amount for one (year, bucket, category, section, line-item) key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedFact {
    pub year: i32,
    pub bucket: Bucket,
    pub category: String,
    pub section: String,
    pub line_item: String,
    pub amount: f64,
}

/// All facts for one sheet key across the data directory, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactTable {
    pub statement: StatementType,
    pub unit: UnitType,
    pub facts: Vec<AggregatedFact>,
}

impl FactTable {
    pub fn new(statement: StatementType, unit: UnitType) -> Self {
        Self {
            statement,
            unit,
            facts: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AggregatedFact> {
        self.facts.iter()
    }

    /// Distinct years present, ascending
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.facts.iter().map(|f| f.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Copy of the table restricted to one bucket; `None` keeps everything.
    pub fn filtered(&self, bucket: Option<Bucket>) -> FactTable {
        let facts = match bucket {
            Some(b) => self.facts.iter().filter(|f| f.bucket == b).cloned().collect(),
            None => self.facts.clone(),
        };
        FactTable {
            statement: self.statement,
            unit: self.unit,
            facts,
        }
    }
}

//==============================================================================
// Series
//==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub amount: f64,
}

/// Year → amount, strictly increasing by year.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Series {
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn from_year_sums(sums: BTreeMap<i32, f64>) -> Self {
        Self {
            points: sums
                .into_iter()
                .map(|(year, amount)| SeriesPoint { year, amount })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn years(&self) -> Vec<i32> {
        self.points.iter().map(|p| p.year).collect()
    }

    pub fn amount(&self, year: i32) -> Option<f64> {
        self.points.iter().find(|p| p.year == year).map(|p| p.amount)
    }
}

/// What a series sums over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum Selection {
    Category(String),
    Section(String),
    LineItem(String),
    /// The `자 금 지 출 총 계` row of the cash-flow statement
    CashOutflowTotal,
    /// 유동자산 + 투자와기타자산 + 고정자산
    TotalAssets,
    /// 유동부채 + 고정부채
    TotalLiabilitiesAndFunds,
}

impl Selection {
    pub fn is_synthetic(&self) -> bool {
        matches!(
            self,
            Selection::CashOutflowTotal
                | Selection::TotalAssets
                | Selection::TotalLiabilitiesAndFunds
        )
    }
}

/// An entry of a drop-down option list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesOption {
    pub id: String,
    pub label: String,
    pub selection: Selection,
}
