//! Single-year composition breakdown (관 → 항 → 목 drill-down)

use crate::classify::normalize;
use crate::error::{StatementError, StatementResult};
use crate::extract::is_special_category;
use crate::select::ReferenceOrder;
use crate::types::{AggregatedFact, Bucket, FactTable, Level, StatementType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const ACCUMULATED_DEPRECIATION: &str = "감가상각누계액";
const ACCUMULATED: &str = "누계액";
const USE_RIGHT: &str = "사용수익권";
const BUILDING: &str = "건물";

/// Which slice set to compute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "drill", rename_all = "snake_case")]
pub enum Drill {
    /// Every label of one level across the bucket
    Top { level: Level },
    /// Sections of one category
    Category { category: String },
    /// Line items of one section
    Section { category: String, section: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionRequest {
    pub year: i32,
    pub bucket: Bucket,
    #[serde(flatten)]
    pub drill: Drill,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub amount: f64,
    /// Fraction of the composition total
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    pub year: i32,
    pub bucket: Bucket,
    pub level: Level,
    pub total: f64,
    pub slices: Vec<Slice>,
}

impl Composition {
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

fn sum_by<'a, F>(facts: impl Iterator<Item = &'a AggregatedFact>, label: F) -> BTreeMap<String, f64>
where
    F: Fn(&AggregatedFact) -> &str,
{
    let mut sums = BTreeMap::new();
    for fact in facts {
        let key = label(fact).trim();
        if !key.is_empty() {
            *sums.entry(key.to_string()).or_insert(0.0) += fact.amount;
        }
    }
    sums
}

/// Net balance-sheet line items against their contra accounts.
///
/// `...감가상각누계액` rows are subtracted from the item they name and
/// `사용수익권` rows from `건물`; every other row counts with its absolute value.
/// Only positive results are kept.
pub fn net_depreciation(items: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    let mut net: BTreeMap<String, f64> = BTreeMap::new();
    for (label, amount) in items {
        let key = normalize(label);
        let (base, signed) = if key.contains(USE_RIGHT) {
            (BUILDING.to_string(), -amount.abs())
        } else if key.contains(ACCUMULATED_DEPRECIATION) {
            (
                key.replace(ACCUMULATED_DEPRECIATION, "").replace(ACCUMULATED, ""),
                -amount.abs(),
            )
        } else {
            (key.replace(ACCUMULATED, ""), amount.abs())
        };
        if !base.is_empty() {
            *net.entry(base).or_insert(0.0) += signed;
        }
    }
    net.retain(|_, v| *v > 0.0);
    net
}

/// Order groups by a reference list, unknown labels last in label order.
fn ordered(sums: BTreeMap<String, f64>, rank: impl Fn(&str) -> Option<usize>) -> Vec<(String, f64)> {
    let mut rows: Vec<(String, f64)> = sums.into_iter().filter(|(_, v)| v.abs() > 0.0).collect();
    rows.sort_by_key(|(label, _)| rank(label.as_str()).unwrap_or(usize::MAX));
    rows
}

fn position_in(list: Option<&Vec<String>>, label: &str) -> Option<usize> {
    let key = normalize(label);
    list.and_then(|l| l.iter().position(|x| normalize(x) == key))
}

/// Break one year of a fact table into slices.
///
/// The two carried-forward categories only count with their header value at the
/// category level and are left out of section and line-item views; drilling
/// into them is refused.
pub fn composition(
    table: &FactTable,
    order: &ReferenceOrder,
    request: &CompositionRequest,
) -> StatementResult<Composition> {
    let year_facts: Vec<&AggregatedFact> = table
        .iter()
        .filter(|f| f.year == request.year && f.bucket == request.bucket)
        .collect();
    let regular = || {
        year_facts
            .iter()
            .copied()
            .filter(|f| !is_special_category(&f.category))
    };
    let netted = table.statement == StatementType::BalanceSheet;

    let (level, rows) = match &request.drill {
        Drill::Top {
            level: Level::Category,
        } => {
            let mut sums = sum_by(year_facts.iter().copied(), |f| f.category.as_str());
            for (label, amount) in sums.iter_mut() {
                if is_special_category(label) {
                    let key = normalize(label);
                    *amount = year_facts
                        .iter()
                        .filter(|f| {
                            f.category.trim() == label.as_str()
                                && f.section.trim().is_empty()
                                && normalize(&f.line_item) == key
                        })
                        .map(|f| f.amount)
                        .sum();
                }
            }
            (
                Level::Category,
                ordered(sums, |l| order.rank(Level::Category, l)),
            )
        }
        Drill::Top {
            level: Level::Section,
        } => {
            let sums = sum_by(regular(), |f| f.section.as_str());
            (
                Level::Section,
                ordered(sums, |l| order.rank(Level::Section, l)),
            )
        }
        Drill::Top {
            level: Level::LineItem,
        } => {
            let mut sums = sum_by(regular(), |f| f.line_item.as_str());
            if netted {
                sums = net_depreciation(&sums);
            }
            (
                Level::LineItem,
                ordered(sums, |l| order.rank(Level::LineItem, l)),
            )
        }
        Drill::Category { category } => {
            refuse_special(category)?;
            let key = normalize(category);
            let sums = sum_by(
                regular().filter(|f| normalize(&f.category) == key),
                |f| f.section.as_str(),
            );
            let nested = order.sections_by_category.get(&key);
            (Level::Section, ordered(sums, |l| position_in(nested, l)))
        }
        Drill::Section { category, section } => {
            refuse_special(category)?;
            let cat_key = normalize(category);
            let sec_key = normalize(section);
            let mut sums = sum_by(
                regular().filter(|f| {
                    normalize(&f.category) == cat_key && normalize(&f.section) == sec_key
                }),
                |f| f.line_item.as_str(),
            );
            if netted {
                sums = net_depreciation(&sums);
            }
            let nested = order.items_by_section.get(&(cat_key, sec_key));
            (Level::LineItem, ordered(sums, |l| position_in(nested, l)))
        }
    };

    let total: f64 = rows.iter().map(|(_, v)| v).sum();
    let slices = rows
        .into_iter()
        .map(|(label, amount)| Slice {
            share: if total != 0.0 { amount / total } else { 0.0 },
            label,
            amount,
        })
        .collect();

    Ok(Composition {
        year: request.year,
        bucket: request.bucket,
        level,
        total,
        slices,
    })
}

fn refuse_special(category: &str) -> StatementResult<()> {
    if is_special_category(category) {
        return Err(StatementError::Validation(format!(
            "'{}' has no sections to drill into",
            category.trim()
        )));
    }
    Ok(())
}
