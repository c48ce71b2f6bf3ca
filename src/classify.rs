//! Label classification
//!
//! Statement sheets encode their 관/항/목 hierarchy purely through leading
//! whitespace in the subject column. This module decodes that indentation and
//! assigns summary buckets to categories, either from the fixed chart-of-accounts
//! tables or from keyword fallbacks.

use crate::types::{Bucket, StatementType};
use regex::Regex;
use std::sync::LazyLock;

/// Columns of indentation per hierarchy level in the raw statement view.
pub const INDENT_STEP: usize = 5;

const NBSP: char = '\u{00a0}';

//==============================================================================
// Indentation
//==============================================================================

/// Count leading space-equivalents of a label.
///
/// Spaces (including non-breaking spaces) count 1, tabs count 4. Counting stops
/// at the first other character, so only leading whitespace matters.
pub fn depth_of(label: &str) -> usize {
    let mut depth = 0;
    for ch in label.chars() {
        match ch {
            ' ' | NBSP => depth += 1,
            '\t' => depth += 4,
            _ => break,
        }
    }
    depth
}

/// Display indentation level (0 = 관, 1 = 항, 2+ = 목) of a raw label.
pub fn indent_level(label: &str) -> usize {
    depth_of(label) / INDENT_STEP
}

/// Comparison key: every whitespace character removed, case untouched.
pub fn normalize(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace() && *c != NBSP)
        .collect()
}

/// Trimmed display form of a label with NBSPs turned into plain spaces.
pub fn clean_label(label: &str) -> String {
    label.replace(NBSP, " ").trim().to_string()
}

//==============================================================================
// Category buckets
//==============================================================================

/// Categories of the cash-flow and operating statements.
const IO_CATEGORY_TABLE: &[(&str, Bucket)] = &[
    ("등록금및수강료수입", Bucket::Income),
    ("전입및기부수입", Bucket::Income),
    ("교육부대수입", Bucket::Income),
    ("교육외수입", Bucket::Income),
    ("투자와기타자산수입", Bucket::Income),
    ("고정자산매각수입", Bucket::Income),
    ("유동부채입금", Bucket::Income),
    ("고정부채입금", Bucket::Income),
    ("미사용전기이월자금", Bucket::Income),
    ("보수", Bucket::Expense),
    ("관리운영비", Bucket::Expense),
    ("연구학생경비", Bucket::Expense),
    ("교육외비용", Bucket::Expense),
    ("전출금", Bucket::Expense),
    ("예비비", Bucket::Expense),
    ("투자와기타자산지출", Bucket::Expense),
    ("고정자산매입지출", Bucket::Expense),
    ("유동부채상환", Bucket::Expense),
    ("고정부채상환", Bucket::Expense),
    ("미사용차기이월자금", Bucket::Expense),
    ("운영차액", Bucket::Other),
];

/// Categories of the balance sheet.
const BS_CATEGORY_TABLE: &[(&str, Bucket)] = &[
    ("유동자산", Bucket::Asset),
    ("투자와기타자산", Bucket::Asset),
    ("고정자산", Bucket::Asset),
    ("유동부채", Bucket::LiabilityAndFund),
    ("고정부채", Bucket::LiabilityAndFund),
    ("출연기본금", Bucket::LiabilityAndFund),
    ("적립금", Bucket::LiabilityAndFund),
    ("운영차액", Bucket::LiabilityAndFund),
];

const INCOME_KEYWORDS: &[&str] = &[
    "수입",
    "수익",
    "전입금",
    "기부금",
    "보조금",
    "등록금",
    "교육부대수익",
    "운영수익",
];

const EXPENSE_KEYWORDS: &[&str] = &[
    "지출",
    "비용",
    "운영비용",
    "관리운영비",
    "교육비",
    "연구비",
    "장학금",
    "일반관리비",
];

const ASSET_KEYWORDS: &[&str] = &["자산", "현금", "예금", "미수"];

const LIABILITY_KEYWORDS: &[&str] = &["부채", "기본금", "예수금", "선수금", "충당부채"];

fn category_table(statement: StatementType) -> &'static [(&'static str, Bucket)] {
    match statement {
        StatementType::CashFlow | StatementType::Operating => IO_CATEGORY_TABLE,
        StatementType::BalanceSheet => BS_CATEGORY_TABLE,
    }
}

/// Bucket from the fixed table alone, without keyword fallback.
pub fn table_bucket(statement: StatementType, category: &str) -> Option<Bucket> {
    let key = category.trim();
    category_table(statement)
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, bucket)| *bucket)
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

/// Assign a summary bucket to a category label.
///
/// The trimmed label is looked up in the statement's fixed table first. When
/// absent, the whitespace-free label is tested against the keyword lists of the
/// statement family; the first family that matches wins.
pub fn bucket_of(statement: StatementType, category: &str) -> Bucket {
    if category.trim().is_empty() {
        return Bucket::Other;
    }
    if let Some(bucket) = table_bucket(statement, category) {
        return bucket;
    }

    let key = normalize(category);
    let (first, second) = match statement {
        StatementType::BalanceSheet => (
            (ASSET_KEYWORDS, Bucket::Asset),
            (LIABILITY_KEYWORDS, Bucket::LiabilityAndFund),
        ),
        StatementType::CashFlow | StatementType::Operating => (
            (INCOME_KEYWORDS, Bucket::Income),
            (EXPENSE_KEYWORDS, Bucket::Expense),
        ),
    };

    if contains_any(&key, first.0) {
        first.1
    } else if contains_any(&key, second.0) {
        second.1
    } else {
        Bucket::Other
    }
}

//==============================================================================
// Block classifier (raw statement view)
//==============================================================================

const CF_INCOME_START: &str = "등록금및수강료수입";
const CF_EXPENSE_START: &str = "보수";
const CF_INCOME_END: &str = "자금수입총계";
const CF_EXPENSE_END: &str = "자금지출총계";

const BS_ASSET_START: &str = "유동자산";
const BS_ASSET_END: &str = "자산총계";
const BS_LIABILITY_START: &str = "유동부채";
const BS_LIABILITY_ENDS: &[&str] = &["부채와기본금총계", "부채및기본금총계", "기본금총계"];

const ROW_INCOME_KEYWORDS: &[&str] = &[
    "수입", "수익", "등록금", "기부금", "전입금", "보조금", "수강료", "이자수입", "잡수입",
];

const ROW_EXPENSE_KEYWORDS: &[&str] = &[
    "지출",
    "비용",
    "경비",
    "급여",
    "수당",
    "장학",
    "연구",
    "시설",
    "공사",
    "감가상각",
    "상각",
    "이자비용",
    "잡손실",
];

fn row_bucket(key: &str) -> Bucket {
    if contains_any(key, ROW_INCOME_KEYWORDS) {
        Bucket::Income
    } else if contains_any(key, ROW_EXPENSE_KEYWORDS) {
        Bucket::Expense
    } else {
        Bucket::Other
    }
}

/// Tag each row of a raw statement with the block it belongs to.
///
/// Cash-flow statements and balance sheets are split into contiguous blocks by
/// sentinel rows; a block's closing total row belongs to the block. Operating
/// statements carry no sentinels, so each row is classified on its own.
pub fn classify_blocks<S: AsRef<str>>(statement: StatementType, labels: &[S]) -> Vec<Bucket> {
    let mut state = Bucket::Other;
    let mut out = Vec::with_capacity(labels.len());

    for label in labels {
        let key = normalize(label.as_ref());
        let bucket = match statement {
            StatementType::Operating => row_bucket(&key),
            StatementType::CashFlow => {
                if key.contains(CF_INCOME_START) {
                    state = Bucket::Income;
                }
                if key.contains(CF_EXPENSE_START) {
                    state = Bucket::Expense;
                }
                let current = state;
                let closes = match state {
                    Bucket::Income => key.contains(CF_INCOME_END),
                    Bucket::Expense => key.contains(CF_EXPENSE_END),
                    _ => false,
                };
                if closes {
                    state = Bucket::Other;
                }
                current
            }
            StatementType::BalanceSheet => {
                if key.contains(BS_ASSET_START) {
                    state = Bucket::Asset;
                }
                if key.contains(BS_LIABILITY_START) {
                    state = Bucket::LiabilityAndFund;
                }
                let current = state;
                let closes = match state {
                    Bucket::Asset => key.contains(BS_ASSET_END),
                    Bucket::LiabilityAndFund => contains_any(&key, BS_LIABILITY_ENDS),
                    _ => false,
                };
                if closes {
                    state = Bucket::Other;
                }
                current
            }
        };
        out.push(bucket);
    }
    out
}

static EXPENSE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\[［【]\s*지출\s*[\]］】]\s*[-=—–]{3,}").expect("separator pattern is valid")
});

/// Whether a row is a `[지출]-----` style divider inserted between blocks.
pub fn is_expense_separator(label: &str) -> bool {
    EXPENSE_SEPARATOR.is_match(&label.replace(NBSP, " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // depth_of / normalize
    // =========================================================================

    #[test]
    fn test_depth_counts_spaces_tabs_and_nbsp() {
        assert_eq!(depth_of("등록금수입"), 0);
        assert_eq!(depth_of("     등록금수입"), 5);
        assert_eq!(depth_of("\t\t  수강료"), 10);
        assert_eq!(depth_of("\u{00a0}\u{00a0}\u{00a0}\u{00a0}\u{00a0}항"), 5);
        assert_eq!(depth_of(""), 0);
        assert_eq!(depth_of("   "), 3);
    }

    #[test]
    fn test_depth_ignores_trailing_text() {
        for suffix in ["", "abc", "  x  ", "목 이름"] {
            let label = format!("     보수{}", suffix);
            assert_eq!(depth_of(&label), 5);
        }
    }

    #[test]
    fn test_normalize_strips_all_whitespace() {
        assert_eq!(normalize("자 금 지 출 총 계"), "자금지출총계");
        assert_eq!(normalize(" 등록금\u{00a0}수입\t"), "등록금수입");
        assert_eq!(normalize("Abc"), "Abc");
    }

    #[test]
    fn test_indent_level() {
        assert_eq!(indent_level("관"), 0);
        assert_eq!(indent_level("     항"), 1);
        assert_eq!(indent_level("          목"), 2);
    }

    // =========================================================================
    // bucket_of
    // =========================================================================

    #[test]
    fn test_table_entries_win_over_keywords() {
        for (name, bucket) in IO_CATEGORY_TABLE {
            assert_eq!(bucket_of(StatementType::CashFlow, name), *bucket, "{}", name);
            assert_eq!(bucket_of(StatementType::Operating, name), *bucket, "{}", name);
        }
        for (name, bucket) in BS_CATEGORY_TABLE {
            assert_eq!(
                bucket_of(StatementType::BalanceSheet, name),
                *bucket,
                "{}",
                name
            );
        }
        // "미사용차기이월자금" contains no expense keyword but the table says 지출
        assert_eq!(
            bucket_of(StatementType::CashFlow, "  미사용차기이월자금 "),
            Bucket::Expense
        );
    }

    #[test]
    fn test_keyword_fallback() {
        assert_eq!(bucket_of(StatementType::CashFlow, "국고 보조금"), Bucket::Income);
        assert_eq!(bucket_of(StatementType::Operating, "일반 관리비"), Bucket::Expense);
        assert_eq!(bucket_of(StatementType::CashFlow, "기타 지출"), Bucket::Expense);
        assert_eq!(bucket_of(StatementType::BalanceSheet, "현금및 예금"), Bucket::Asset);
        assert_eq!(
            bucket_of(StatementType::BalanceSheet, "퇴직급여 충당부채"),
            Bucket::LiabilityAndFund
        );
        assert_eq!(bucket_of(StatementType::CashFlow, "잡항목"), Bucket::Other);
    }

    #[test]
    fn test_empty_category_is_other() {
        for st in StatementType::ALL {
            assert_eq!(bucket_of(st, ""), Bucket::Other);
            assert_eq!(bucket_of(st, "   "), Bucket::Other);
        }
    }

    // =========================================================================
    // classify_blocks
    // =========================================================================

    #[test]
    fn test_cash_flow_blocks() {
        let labels = [
            "자금계산서",
            "등록금및수강료수입",
            "     등록금수입",
            "자 금 수 입 총 계",
            "보수",
            "     교원보수",
            "자 금 지 출 총 계",
            "비고",
        ];
        let buckets = classify_blocks(StatementType::CashFlow, &labels);
        assert_eq!(
            buckets,
            vec![
                Bucket::Other,
                Bucket::Income,
                Bucket::Income,
                Bucket::Income,
                Bucket::Expense,
                Bucket::Expense,
                Bucket::Expense,
                Bucket::Other,
            ]
        );
    }

    #[test]
    fn test_balance_sheet_blocks() {
        let labels = [
            "유동자산",
            "     현금및현금성자산",
            "자산총계",
            "유동부채",
            "출연기본금",
            "부채와기본금총계",
            "주석",
        ];
        let buckets = classify_blocks(StatementType::BalanceSheet, &labels);
        assert_eq!(
            buckets,
            vec![
                Bucket::Asset,
                Bucket::Asset,
                Bucket::Asset,
                Bucket::LiabilityAndFund,
                Bucket::LiabilityAndFund,
                Bucket::LiabilityAndFund,
                Bucket::Other,
            ]
        );
    }

    #[test]
    fn test_operating_rows_classified_independently() {
        let labels = ["등록금수익", "교원 급여", "비고"];
        let buckets = classify_blocks(StatementType::Operating, &labels);
        assert_eq!(buckets, vec![Bucket::Income, Bucket::Expense, Bucket::Other]);
    }

    #[test]
    fn test_expense_separator() {
        assert!(is_expense_separator("[지출]-----------"));
        assert!(is_expense_separator("【 지출 】 ==="));
        assert!(is_expense_separator("［지출］———"));
        assert!(!is_expense_separator("[지출]--"));
        assert!(!is_expense_separator("지출 -----"));
    }
}
