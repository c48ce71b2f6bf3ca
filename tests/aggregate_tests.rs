//! Multi-year aggregation tests over real workbooks
//!
//! Every test writes fiscal-year .xlsx files into a temporary data directory
//! and queries them through the analytics engine.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use statement_trends::aggregate::{Aggregator, DataDirectory, YearPolicy};
use statement_trends::composition::{CompositionRequest, Drill};
use statement_trends::config::AnalyticsConfig;
use statement_trends::excel::CalamineSource;
use statement_trends::sheets::DuplicateSheetPolicy;
use statement_trends::types::{Bucket, Level, Selection, SeriesPoint, StatementType, UnitType};
use statement_trends::{CachedAnalytics, StatementError};
use tempfile::TempDir;

fn points(series: &statement_trends::Series) -> Vec<(i32, f64)> {
    series.points.iter().map(|p| (p.year, p.amount)).collect()
}

fn category(label: &str) -> Selection {
    Selection::Category(label.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════
// SERIES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_category_series_across_two_years() {
    let dir = TempDir::new().unwrap();
    for (file, amount) in [("2022.xlsx", 1_000_000.0), ("2023.xlsx", 1_200_000.0)] {
        add_workbook(
            dir.path(),
            file,
            &[cash_flow("전체")
                .category("등록금및수강료수입", Blank)
                .item("등록금", Num(amount))],
        );
    }

    let analytics = analytics_for(dir.path());
    let series = analytics
        .get_series(
            StatementType::CashFlow,
            UnitType::Total,
            &category("등록금및수강료수입"),
            None,
        )
        .unwrap();

    assert_eq!(
        series.points,
        vec![
            SeriesPoint {
                year: 2022,
                amount: 1_000_000.0
            },
            SeriesPoint {
                year: 2023,
                amount: 1_200_000.0
            },
        ]
    );
}

#[test]
fn test_year_without_sheet_is_omitted_not_zero() {
    let dir = TempDir::new().unwrap();
    add_workbook(dir.path(), "2021.xlsx", &[simple_cash_flow(100.0, 40.0)]);
    add_workbook(
        dir.path(),
        "2022.xlsx",
        &[balance_sheet("전체").category("유동자산", Blank).item("현금", Num(5.0))],
    );
    add_workbook(dir.path(), "2023.xlsx", &[simple_cash_flow(300.0, 60.0)]);

    let analytics = analytics_for(dir.path());
    let series = analytics
        .get_series(
            StatementType::CashFlow,
            UnitType::Total,
            &category("등록금및수강료수입"),
            None,
        )
        .unwrap();

    assert_eq!(points(&series), vec![(2021, 100.0), (2023, 300.0)]);
}

#[test]
fn test_malformed_workbooks_are_skipped() {
    let dir = TempDir::new().unwrap();
    add_workbook(dir.path(), "2021.xlsx", &[simple_cash_flow(100.0, 40.0)]);
    // no subject column
    add_workbook(
        dir.path(),
        "2022.xlsx",
        &[SheetFixture::with_headers("자금계산서(전체)", &["구분", "결산"])
            .category("등록금및수강료수입", Blank)
            .item("등록금", Num(999.0))],
    );
    add_workbook(dir.path(), "2023.xlsx", &[simple_cash_flow(300.0, 60.0)]);
    // not a zip container at all
    std::fs::write(dir.path().join("2024.xlsx"), b"this is not a workbook").unwrap();

    let analytics = analytics_for(dir.path());
    let series = analytics
        .get_series(
            StatementType::CashFlow,
            UnitType::Total,
            &category("등록금및수강료수입"),
            None,
        )
        .unwrap();

    assert_eq!(points(&series), vec![(2021, 100.0), (2023, 300.0)]);
}

#[test]
fn test_unreadable_amounts_are_excluded_from_sums() {
    let with_text = TempDir::new().unwrap();
    add_workbook(
        with_text.path(),
        "2023.xlsx",
        &[cash_flow("전체")
            .category("교육외수입", Blank)
            .item("이자수입", Text("1,234"))
            .item("잡수입", Text("abc"))],
    );
    let without_text = TempDir::new().unwrap();
    add_workbook(
        without_text.path(),
        "2023.xlsx",
        &[cash_flow("전체")
            .category("교육외수입", Blank)
            .item("이자수입", Text("1,234"))],
    );

    let selection = category("교육외수입");
    let with = analytics_for(with_text.path())
        .get_series(StatementType::CashFlow, UnitType::Total, &selection, None)
        .unwrap();
    let without = analytics_for(without_text.path())
        .get_series(StatementType::CashFlow, UnitType::Total, &selection, None)
        .unwrap();

    assert_eq!(points(&with), vec![(2023, 1234.0)]);
    assert_eq!(with, without);
}

#[test]
fn test_special_category_header_value() {
    let dir = TempDir::new().unwrap();
    add_workbook(
        dir.path(),
        "2023.xlsx",
        &[cash_flow("전체")
            .category("미사용전기이월자금", Num(500.0))
            .category("등록금및수강료수입", Blank)
            .item("등록금", Num(100.0))],
    );

    let analytics = analytics_for(dir.path());
    let table = analytics
        .fact_table(StatementType::CashFlow, UnitType::Total)
        .unwrap();
    let special: Vec<_> = table
        .iter()
        .filter(|f| f.category == "미사용전기이월자금")
        .collect();
    assert_eq!(special.len(), 1);
    assert_eq!(special[0].section, "");
    assert_eq!(special[0].line_item, "미사용전기이월자금");
    assert_eq!(special[0].amount, 500.0);
    assert_eq!(special[0].bucket, Bucket::Income);

    let series = analytics
        .get_series(
            StatementType::CashFlow,
            UnitType::Total,
            &category("미사용전기이월자금"),
            None,
        )
        .unwrap();
    assert_eq!(points(&series), vec![(2023, 500.0)]);
}

#[test]
fn test_grand_total_row_uses_last_match() {
    let dir = TempDir::new().unwrap();
    let sheet = |early: f64, last: f64| {
        simple_cash_flow(100.0, 40.0)
            .row("자금지출총계", Num(early))
            .category("미사용차기이월자금", Num(10.0))
            .row("자 금 지 출 총 계", Num(last))
    };
    add_workbook(dir.path(), "2022.xlsx", &[sheet(1.0, 900.0)]);
    add_workbook(dir.path(), "2023.xlsx", &[sheet(2.0, 950.0)]);

    let analytics = analytics_for(dir.path());
    let series = analytics
        .get_series(
            StatementType::CashFlow,
            UnitType::Total,
            &Selection::CashOutflowTotal,
            None,
        )
        .unwrap();
    assert_eq!(points(&series), vec![(2022, 900.0), (2023, 950.0)]);

    let err = analytics
        .get_series(
            StatementType::BalanceSheet,
            UnitType::Total,
            &Selection::CashOutflowTotal,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, StatementError::Validation(_)));
}

#[test]
fn test_balance_sheet_totals() {
    let dir = TempDir::new().unwrap();
    add_workbook(
        dir.path(),
        "2023.xlsx",
        &[balance_sheet("전체")
            .category("유동자산", Blank)
            .item("현금및현금성자산", Num(100.0))
            .category("투자와기타자산", Blank)
            .item("장기금융상품", Num(50.0))
            .category("고정자산", Blank)
            .item("건물", Num(1000.0))
            .category("유동부채", Blank)
            .item("미지급금", Num(30.0))
            .category("고정부채", Blank)
            .item("장기차입금", Num(70.0))
            .category("출연기본금", Blank)
            .item("기본금", Num(500.0))],
    );

    let analytics = analytics_for(dir.path());
    let assets = analytics
        .get_series(
            StatementType::BalanceSheet,
            UnitType::Total,
            &Selection::TotalAssets,
            None,
        )
        .unwrap();
    let liabilities = analytics
        .get_series(
            StatementType::BalanceSheet,
            UnitType::Total,
            &Selection::TotalLiabilitiesAndFunds,
            None,
        )
        .unwrap();

    assert_eq!(points(&assets), vec![(2023, 1150.0)]);
    assert_eq!(points(&liabilities), vec![(2023, 100.0)]);

    // the bucket filter does not apply to balance totals
    let liabilities_in_assets = analytics
        .get_series(
            StatementType::BalanceSheet,
            UnitType::Total,
            &Selection::TotalLiabilitiesAndFunds,
            Some(Bucket::Asset),
        )
        .unwrap();
    assert_eq!(liabilities_in_assets, liabilities);
}

#[test]
fn test_bucket_filter_and_mismatch() {
    let dir = TempDir::new().unwrap();
    add_workbook(dir.path(), "2023.xlsx", &[simple_cash_flow(100.0, 40.0)]);
    let analytics = analytics_for(dir.path());

    let income_salaries = analytics
        .get_series(
            StatementType::CashFlow,
            UnitType::Total,
            &category("보수"),
            Some(Bucket::Income),
        )
        .unwrap();
    assert!(income_salaries.is_empty());

    let expense_salaries = analytics
        .get_series(
            StatementType::CashFlow,
            UnitType::Total,
            &category("보수"),
            Some(Bucket::Expense),
        )
        .unwrap();
    assert_eq!(points(&expense_salaries), vec![(2023, 40.0)]);

    assert!(analytics
        .get_series(
            StatementType::CashFlow,
            UnitType::Total,
            &category("보수"),
            Some(Bucket::Asset),
        )
        .is_err());
}

#[test]
fn test_empty_directory_gives_empty_series() {
    let dir = TempDir::new().unwrap();
    let analytics = analytics_for(dir.path());
    let series = analytics
        .get_series(
            StatementType::Operating,
            UnitType::NonTuition,
            &category("운영수익"),
            None,
        )
        .unwrap();
    assert!(series.is_empty());
    assert!(analytics.available_years().unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// FACT TABLE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_aggregation_is_idempotent() {
    let dir = TempDir::new().unwrap();
    add_workbook(dir.path(), "2021.xlsx", &[simple_cash_flow(100.5, 40.25)]);
    add_workbook(dir.path(), "2022.xlsx", &[simple_cash_flow(200.5, 50.75)]);

    let analytics = analytics_for(dir.path());
    let first = analytics
        .fact_table(StatementType::CashFlow, UnitType::Total)
        .unwrap();
    let second = analytics
        .fact_table(StatementType::CashFlow, UnitType::Total)
        .unwrap();
    let fresh = analytics_for(dir.path())
        .fact_table(StatementType::CashFlow, UnitType::Total)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first, fresh);
    assert_eq!(first.len(), 4);
    assert_eq!(first.years(), vec![2021, 2022]);
}

#[test]
fn test_repeated_leaf_rows_are_summed() {
    let dir = TempDir::new().unwrap();
    add_workbook(
        dir.path(),
        "2023.xlsx",
        &[cash_flow("등록금")
            .category("관리운영비", Blank)
            .section("시설관리비", Blank)
            .item("건물관리비", Num(10.0))
            .item("건물관리비", Num(15.0))],
    );

    let table = analytics_for(dir.path())
        .fact_table(StatementType::CashFlow, UnitType::Tuition)
        .unwrap();
    assert_eq!(table.len(), 1);
    let fact = table.iter().next().unwrap();
    assert_eq!(fact.amount, 25.0);
    assert_eq!(fact.section, "시설관리비");
    assert_eq!(fact.bucket, Bucket::Expense);
}

#[test]
fn test_unit_sheets_are_independent() {
    let dir = TempDir::new().unwrap();
    add_workbook(
        dir.path(),
        "2023.xlsx",
        &[
            cash_flow("등록금")
                .category("등록금및수강료수입", Blank)
                .item("등록금", Num(70.0)),
            cash_flow("비등록금")
                .category("등록금및수강료수입", Blank)
                .item("수강료", Num(30.0)),
        ],
    );

    let analytics = analytics_for(dir.path());
    let selection = category("등록금및수강료수입");
    let tuition = analytics
        .get_series(StatementType::CashFlow, UnitType::Tuition, &selection, None)
        .unwrap();
    let other = analytics
        .get_series(StatementType::CashFlow, UnitType::NonTuition, &selection, None)
        .unwrap();
    let total = analytics
        .get_series(StatementType::CashFlow, UnitType::Total, &selection, None)
        .unwrap();

    assert_eq!(points(&tuition), vec![(2023, 70.0)]);
    assert_eq!(points(&other), vec![(2023, 30.0)]);
    assert!(total.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// POLICIES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_undated_workbook_policy() {
    let dir = TempDir::new().unwrap();
    add_workbook(dir.path(), "2023.xlsx", &[simple_cash_flow(100.0, 40.0)]);
    add_workbook(dir.path(), "결산서.xlsx", &[simple_cash_flow(999.0, 1.0)]);

    let skipping = analytics_for(dir.path());
    assert_eq!(skipping.available_years().unwrap(), vec![2023]);

    let strict = CachedAnalytics::from_config(&AnalyticsConfig {
        year_policy: YearPolicy::Error,
        ..config_for(dir.path())
    });
    let err = strict.available_years().unwrap_err();
    assert!(matches!(err, StatementError::FilenameYear(ref f) if f == "결산서.xlsx"));
}

#[test]
fn test_numeric_name_without_20xx_is_undated() {
    let dir = TempDir::new().unwrap();
    add_workbook(dir.path(), "0042.xlsx", &[simple_cash_flow(7.0, 1.0)]);
    add_workbook(dir.path(), "1999.xlsx", &[simple_cash_flow(999.0, 1.0)]);
    add_workbook(dir.path(), "2023.xlsx", &[simple_cash_flow(100.0, 40.0)]);

    let skipping = analytics_for(dir.path());
    assert_eq!(skipping.available_years().unwrap(), vec![2023]);
    assert_eq!(
        skipping
            .get_series(
                StatementType::CashFlow,
                UnitType::Total,
                &category("등록금및수강료수입"),
                None
            )
            .unwrap()
            .years(),
        vec![2023]
    );

    let aggregator = Aggregator::new(
        CalamineSource::new(),
        DataDirectory::new(dir.path(), &["xlsx".to_string()]),
    )
    .with_year_policy(YearPolicy::Error);
    let err = aggregator.dated_workbooks().unwrap_err();
    assert!(matches!(err, StatementError::FilenameYear(ref f) if f == "0042.xlsx"));
}

#[test]
fn test_duplicate_sheet_policy() {
    let dir = TempDir::new().unwrap();
    add_workbook(
        dir.path(),
        "2023.xlsx",
        &[
            SheetFixture::new("자금계산서(전체)", "결산")
                .category("등록금및수강료수입", Blank)
                .item("등록금", Num(1.0)),
            SheetFixture::new(" 자금계산서(전체) ", "결산")
                .category("등록금및수강료수입", Blank)
                .item("등록금", Num(2.0)),
        ],
    );
    let selection = category("등록금및수강료수입");
    let with_policy = |policy| {
        CachedAnalytics::from_config(&AnalyticsConfig {
            duplicate_sheet_policy: policy,
            ..config_for(dir.path())
        })
        .get_series(StatementType::CashFlow, UnitType::Total, &selection, None)
        .unwrap()
    };

    assert_eq!(
        points(&with_policy(DuplicateSheetPolicy::LastWins)),
        vec![(2023, 2.0)]
    );
    assert_eq!(
        points(&with_policy(DuplicateSheetPolicy::FirstWins)),
        vec![(2023, 1.0)]
    );
    // the workbook fails as a whole and is skipped
    assert!(with_policy(DuplicateSheetPolicy::Error).is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════

fn options_fixture(dir: &std::path::Path) {
    add_workbook(
        dir,
        "2021.xlsx",
        &[cash_flow("전체")
            .category("교육외수입", Blank)
            .item("기부금", Num(10.0))
            .category("등록금및수강료수입", Blank)
            .item("등록금", Num(90.0))],
    );
    add_workbook(
        dir,
        "2023.xlsx",
        &[cash_flow("전체")
            .category("등록금및수강료수입", Blank)
            .section("등록금수입", Blank)
            .item("등록금", Num(100.0))
            .category("전입및기부수입", Blank)
            .item("전입금", Num(50.0))
            .category("보수", Blank)
            .section("교원보수", Blank)
            .item("교원급여", Num(80.0))
            .item("예수금", Num(5.0))
            .category("예비비", Blank)
            .item("예비비", Num(0.0))],
    );
}

#[test]
fn test_category_options_follow_latest_workbook() {
    let dir = TempDir::new().unwrap();
    options_fixture(dir.path());
    let analytics = analytics_for(dir.path());

    let labels: Vec<String> = analytics
        .list_options(StatementType::CashFlow, UnitType::Total, Level::Category, None)
        .unwrap()
        .into_iter()
        .map(|o| o.label)
        .collect();

    assert_eq!(
        labels,
        vec!["등록금및수강료수입", "전입및기부수입", "보수", "교육외수입", "총 계"]
    );
}

#[test]
fn test_options_with_bucket_drop_grand_total() {
    let dir = TempDir::new().unwrap();
    options_fixture(dir.path());
    let analytics = analytics_for(dir.path());

    let income = analytics
        .list_options(
            StatementType::CashFlow,
            UnitType::Total,
            Level::Category,
            Some(Bucket::Income),
        )
        .unwrap();
    let ids: Vec<&str> = income.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "category:등록금및수강료수입",
            "category:전입및기부수입",
            "category:교육외수입"
        ]
    );
}

#[test]
fn test_line_item_options_skip_denylist() {
    let dir = TempDir::new().unwrap();
    options_fixture(dir.path());
    let analytics = analytics_for(dir.path());

    let labels: Vec<String> = analytics
        .list_options(StatementType::CashFlow, UnitType::Total, Level::LineItem, None)
        .unwrap()
        .into_iter()
        .map(|o| o.label)
        .collect();

    assert_eq!(labels, vec!["등록금", "전입금", "교원급여", "기부금"]);
}

// ═══════════════════════════════════════════════════════════════════════════
// COMPOSITION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_composition_drill_down() {
    let dir = TempDir::new().unwrap();
    add_workbook(
        dir.path(),
        "2023.xlsx",
        &[cash_flow("전체")
            .category("보수", Blank)
            .section("교원보수", Blank)
            .item("교원급여", Num(60.0))
            .item("교원상여금", Num(20.0))
            .section("직원보수", Blank)
            .item("직원급여", Num(20.0))
            .category("관리운영비", Blank)
            .section("시설관리비", Blank)
            .item("건물관리비", Num(100.0))],
    );
    let analytics = analytics_for(dir.path());

    let top = analytics
        .composition(
            StatementType::CashFlow,
            UnitType::Total,
            &CompositionRequest {
                year: 2023,
                bucket: Bucket::Expense,
                drill: Drill::Top {
                    level: Level::Category,
                },
            },
        )
        .unwrap();
    let slices: Vec<(&str, f64)> = top
        .slices
        .iter()
        .map(|s| (s.label.as_str(), s.amount))
        .collect();
    assert_eq!(slices, vec![("보수", 100.0), ("관리운영비", 100.0)]);
    assert_eq!(top.total, 200.0);
    assert_eq!(top.slices[0].share, 0.5);

    let sections = analytics
        .composition(
            StatementType::CashFlow,
            UnitType::Total,
            &CompositionRequest {
                year: 2023,
                bucket: Bucket::Expense,
                drill: Drill::Category {
                    category: "보수".to_string(),
                },
            },
        )
        .unwrap();
    let labels: Vec<&str> = sections.slices.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["교원보수", "직원보수"]);
    assert_eq!(sections.level, Level::Section);

    let items = analytics
        .composition(
            StatementType::CashFlow,
            UnitType::Total,
            &CompositionRequest {
                year: 2023,
                bucket: Bucket::Expense,
                drill: Drill::Section {
                    category: "보수".to_string(),
                    section: "교원보수".to_string(),
                },
            },
        )
        .unwrap();
    let items: Vec<(&str, f64)> = items
        .slices
        .iter()
        .map(|s| (s.label.as_str(), s.amount))
        .collect();
    assert_eq!(items, vec![("교원급여", 60.0), ("교원상여금", 20.0)]);
}
