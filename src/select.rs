//! Series selectors
//!
//! Option lists for the 관/항/목 pickers and the year → amount series behind
//! each option. Display order comes from the most recent workbook alone; labels
//! it does not know are appended in the order the fact table first saw them.

use crate::classify::normalize;
use crate::error::StatementResult;
use crate::excel::SheetTable;
use crate::extract::{
    decode_rows, find_subject_column, is_special_category, raw_rows, DepthThresholds,
};
use crate::types::{
    AggregatedFact, Bucket, FactTable, Level, Selection, Series, SeriesOption, StatementType,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Line items never offered as options.
pub const LINE_ITEM_DENYLIST: &[&str] = &["유동자금", "기타유동자산", "예수금", "선수금", "기타유동부채"];

/// Categories summed into 자산총계.
pub const TOTAL_ASSET_CATEGORIES: &[&str] = &["유동자산", "투자와기타자산", "고정자산"];

/// Categories summed into 부채총계.
pub const TOTAL_LIABILITY_CATEGORIES: &[&str] = &["유동부채", "고정부채"];

pub const CASH_OUTFLOW_TOTAL_LABEL: &str = "총 계";
pub const TOTAL_ASSETS_LABEL: &str = "자산총계";
pub const TOTAL_LIABILITIES_LABEL: &str = "부채총계";

//==============================================================================
// Reference order
//==============================================================================

/// Label order of the reference (most recent) workbook's sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceOrder {
    /// Category labels, deduplicated on their normalized form
    pub categories: Vec<String>,
    pub sections: Vec<String>,
    /// Normalized line-item labels
    pub line_items: Vec<String>,
    /// Normalized category → its section labels
    pub sections_by_category: HashMap<String, Vec<String>>,
    /// (normalized category, normalized section) → its line-item labels
    pub items_by_section: HashMap<(String, String), Vec<String>>,
}

fn push_unique(list: &mut Vec<String>, seen: &mut HashSet<String>, key: String, value: String) {
    if !key.is_empty() && seen.insert(key) {
        list.push(value);
    }
}

impl ReferenceOrder {
    pub fn from_sheet(table: &SheetTable, statement: StatementType) -> StatementResult<Self> {
        let thresholds = DepthThresholds::for_statement(statement);
        let subject_col = find_subject_column(table)?;
        let rows = decode_rows(&raw_rows(table, subject_col), "", thresholds);

        let mut order = ReferenceOrder::default();
        let (mut cats, mut secs, mut items) = (HashSet::new(), HashSet::new(), HashSet::new());
        let mut nested: HashSet<(String, String, String)> = HashSet::new();

        for row in rows {
            let key = normalize(&row.label);
            let cat_key = normalize(&row.category);
            if row.depth == thresholds.category {
                push_unique(&mut order.categories, &mut cats, key, row.label);
            } else if row.depth == thresholds.section {
                if !key.is_empty() && nested.insert((cat_key.clone(), key.clone(), String::new())) {
                    order
                        .sections_by_category
                        .entry(cat_key)
                        .or_default()
                        .push(row.label.clone());
                }
                push_unique(&mut order.sections, &mut secs, key, row.label);
            } else if row.depth >= thresholds.line_item {
                let sec_key = normalize(&row.section);
                if !key.is_empty() && nested.insert((cat_key.clone(), sec_key.clone(), key.clone())) {
                    order
                        .items_by_section
                        .entry((cat_key, sec_key))
                        .or_default()
                        .push(row.label.clone());
                }
                push_unique(&mut order.line_items, &mut items, key.clone(), key);
            }
        }
        Ok(order)
    }

    /// Position of a label at the given level; `None` for labels not in the reference.
    pub fn rank(&self, level: Level, label: &str) -> Option<usize> {
        let key = normalize(label);
        match level {
            Level::Category => self.categories.iter().position(|c| normalize(c) == key),
            Level::Section => self.sections.iter().position(|s| normalize(s) == key),
            Level::LineItem => self.line_items.iter().position(|i| *i == key),
        }
    }
}

//==============================================================================
// Options
//==============================================================================

fn level_label(level: Level, fact: &AggregatedFact) -> &str {
    match level {
        Level::Category => &fact.category,
        Level::Section => &fact.section,
        Level::LineItem => &fact.line_item,
    }
}

/// Ordered option list for one picker level.
///
/// `table` is filtered to `bucket` first. Labels whose amounts sum to zero over
/// all years are left out, as are denylisted line items. Reference-order labels
/// come first, then the rest in fact order. Synthetic totals are appended at the
/// category level: `총 계` for the unfiltered cash-flow statement, `자산총계` and
/// `부채총계` for the balance sheet.
pub fn list_options(
    table: &FactTable,
    order: &ReferenceOrder,
    level: Level,
    bucket: Option<Bucket>,
) -> Vec<SeriesOption> {
    let facts = table.filtered(bucket);

    let mut sums: HashMap<String, f64> = HashMap::new();
    let mut first_label: HashMap<String, String> = HashMap::new();
    let mut fact_order: Vec<String> = Vec::new();
    for fact in facts.iter() {
        let label = level_label(level, fact).trim();
        let key = normalize(label);
        if key.is_empty() {
            continue;
        }
        *sums.entry(key.clone()).or_insert(0.0) += fact.amount;
        if !first_label.contains_key(&key) {
            first_label.insert(key.clone(), label.to_string());
            fact_order.push(key);
        }
    }

    let denied: HashSet<String> = LINE_ITEM_DENYLIST.iter().map(|l| normalize(l)).collect();
    let valid = |key: &String| {
        sums.get(key).is_some_and(|s| s.abs() > 0.0)
            && !(level == Level::LineItem && denied.contains(key))
    };

    let reference: Vec<String> = match level {
        Level::Category => order.categories.iter().map(|c| normalize(c)).collect(),
        Level::Section => order.sections.iter().map(|s| normalize(s)).collect(),
        Level::LineItem => order.line_items.clone(),
    };
    let mut seen = HashSet::new();
    let ordered: Vec<String> = reference
        .into_iter()
        .chain(fact_order)
        .filter(|k| first_label.contains_key(k) && valid(k))
        .filter(|k| seen.insert(k.clone()))
        .collect();

    let mut options: Vec<SeriesOption> = ordered
        .into_iter()
        .map(|key| {
            let label = first_label.get(&key).cloned().unwrap_or_else(|| key.clone());
            let (id, selection) = match level {
                Level::Category => (format!("category:{}", label), Selection::Category(label.clone())),
                Level::Section => (format!("section:{}", label), Selection::Section(label.clone())),
                Level::LineItem => (format!("line_item:{}", key), Selection::LineItem(label.clone())),
            };
            SeriesOption {
                id,
                label,
                selection,
            }
        })
        .collect();

    if level == Level::Category {
        options.extend(synthetic_options(table.statement, bucket));
    }
    options
}

fn synthetic_options(statement: StatementType, bucket: Option<Bucket>) -> Vec<SeriesOption> {
    let option = |id: &str, label: &str, selection: Selection| SeriesOption {
        id: id.to_string(),
        label: label.to_string(),
        selection,
    };
    match statement {
        StatementType::CashFlow if bucket.is_none() => vec![option(
            "total:cash_outflow",
            CASH_OUTFLOW_TOTAL_LABEL,
            Selection::CashOutflowTotal,
        )],
        StatementType::BalanceSheet => vec![
            option("total:assets", TOTAL_ASSETS_LABEL, Selection::TotalAssets),
            option(
                "total:liabilities",
                TOTAL_LIABILITIES_LABEL,
                Selection::TotalLiabilitiesAndFunds,
            ),
        ],
        _ => Vec::new(),
    }
}

/// Display label of a selection, synthetic totals included.
pub fn selection_label(selection: &Selection) -> &str {
    match selection {
        Selection::Category(label) | Selection::Section(label) | Selection::LineItem(label) => {
            label
        }
        Selection::CashOutflowTotal => CASH_OUTFLOW_TOTAL_LABEL,
        Selection::TotalAssets => TOTAL_ASSETS_LABEL,
        Selection::TotalLiabilitiesAndFunds => TOTAL_LIABILITIES_LABEL,
    }
}

//==============================================================================
// Series
//==============================================================================

/// Sum the facts matching `selection` per year.
///
/// Years without a matching fact are absent from the result. A special category
/// contributes only its own header row. Returns `None` for selections the fact
/// table cannot answer (the cash-flow grand total row).
pub fn series_from_facts(table: &FactTable, selection: &Selection) -> Option<Series> {
    let in_set = |set: &[&str], label: &str| {
        let key = normalize(label);
        set.iter().any(|s| normalize(s) == key)
    };

    let matcher: Box<dyn Fn(&AggregatedFact) -> bool> = match selection {
        Selection::CashOutflowTotal => return None,
        Selection::Category(label) => {
            let key = normalize(label);
            if is_special_category(label) {
                Box::new(move |f| {
                    normalize(&f.category) == key
                        && f.section.trim().is_empty()
                        && normalize(&f.line_item) == key
                })
            } else {
                Box::new(move |f| normalize(&f.category) == key)
            }
        }
        Selection::Section(label) => {
            let key = normalize(label);
            Box::new(move |f| normalize(&f.section) == key)
        }
        Selection::LineItem(label) => {
            let key = normalize(label);
            Box::new(move |f| normalize(&f.line_item) == key)
        }
        Selection::TotalAssets => {
            Box::new(move |f| in_set(TOTAL_ASSET_CATEGORIES, &f.category))
        }
        Selection::TotalLiabilitiesAndFunds => {
            Box::new(move |f| in_set(TOTAL_LIABILITY_CATEGORIES, &f.category))
        }
    };

    let mut sums: BTreeMap<i32, f64> = BTreeMap::new();
    for fact in table.iter().filter(|f| matcher(f)) {
        *sums.entry(fact.year).or_insert(0.0) += fact.amount;
    }
    Some(Series::from_year_sums(sums))
}
