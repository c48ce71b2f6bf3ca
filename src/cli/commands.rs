use crate::analytics::CachedAnalytics;
use crate::composition::{CompositionRequest, Drill};
use crate::config::AnalyticsConfig;
use crate::error::{StatementError, StatementResult};
use crate::excel::SeriesExporter;
use crate::report::SeriesReport;
use crate::select::selection_label;
use crate::types::{Bucket, Cell, Level, Selection, SheetKey};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Synthetic totals selectable with `--total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TotalKind {
    /// 자금계산서 grand total expense row (`자 금 지 출 총 계`)
    CashOutflow,
    /// 유동자산 + 투자와기타자산 + 고정자산
    Assets,
    /// 유동부채 + 고정부채
    Liabilities,
}

impl From<TotalKind> for Selection {
    fn from(kind: TotalKind) -> Self {
        match kind {
            TotalKind::CashOutflow => Selection::CashOutflowTotal,
            TotalKind::Assets => Selection::TotalAssets,
            TotalKind::Liabilities => Selection::TotalLiabilitiesAndFunds,
        }
    }
}

/// Format an amount in won with thousands separators, rounded to the unit.
fn format_amount(n: f64) -> String {
    let rounded = n.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn format_change(pct: Option<f64>) -> String {
    match pct {
        Some(p) => format!("{:+.2}%", p * 100.0),
        None => "-".to_string(),
    }
}

fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Number(n) => format_amount(*n),
        Cell::Text(s) => s.trim().to_string(),
        Cell::Empty => String::new(),
    }
}

fn print_json<T: Serialize>(value: &T) -> StatementResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open(config: &AnalyticsConfig) -> StatementResult<CachedAnalytics> {
    config.validate()?;
    Ok(CachedAnalytics::from_config(config))
}

/// Only `.xlsx` exports are supported.
fn check_export_path(output: &Path) -> StatementResult<()> {
    let extension = output.extension().and_then(|e| e.to_str()).unwrap_or("");
    if extension.eq_ignore_ascii_case("xlsx") {
        Ok(())
    } else {
        Err(StatementError::Export(format!(
            "Unsupported output format: '{}'. Use .xlsx",
            extension
        )))
    }
}

/// Exactly one of the selection flags must be given.
pub fn selection_from_args(
    category: Option<String>,
    section: Option<String>,
    line_item: Option<String>,
    total: Option<TotalKind>,
) -> StatementResult<Selection> {
    let mut picked: Vec<Selection> = Vec::with_capacity(1);
    picked.extend(category.map(Selection::Category));
    picked.extend(section.map(Selection::Section));
    picked.extend(line_item.map(Selection::LineItem));
    picked.extend(total.map(Selection::from));

    match picked.len() {
        1 => Ok(picked.remove(0)),
        0 => Err(StatementError::Validation(
            "One of --category, --section, --line-item or --total is required".to_string(),
        )),
        _ => Err(StatementError::Validation(
            "--category, --section, --line-item and --total are mutually exclusive".to_string(),
        )),
    }
}

/// `--category` drills into sections, `--category --section` into line items,
/// otherwise the whole bucket is broken down at `--level`.
pub fn drill_from_args(
    level: Option<Level>,
    category: Option<String>,
    section: Option<String>,
) -> StatementResult<Drill> {
    match (category, section) {
        (Some(category), Some(section)) => Ok(Drill::Section { category, section }),
        (Some(category), None) => Ok(Drill::Category { category }),
        (None, Some(_)) => Err(StatementError::Validation(
            "--section requires --category".to_string(),
        )),
        (None, None) => Ok(Drill::Top {
            level: level.unwrap_or(Level::Category),
        }),
    }
}

/// A workbook path given on the command line, falling back to the data directory.
fn resolve_workbook(config: &AnalyticsConfig, file: PathBuf) -> PathBuf {
    if file.exists() || file.is_absolute() {
        return file;
    }
    let in_data_dir = config.data_dir.join(&file);
    if in_data_dir.exists() {
        in_data_dir
    } else {
        file
    }
}

//==============================================================================
// years
//==============================================================================

/// Execute the years command
pub fn years(config: &AnalyticsConfig, json: bool) -> StatementResult<()> {
    let analytics = open(config)?;
    let workbooks = analytics.workbooks()?;

    if json {
        return print_json(&workbooks);
    }

    println!("{}", "🔥 Statement Trends - Workbooks".bold().green());
    println!("   Data directory: {}\n", config.data_dir.display());

    if workbooks.is_empty() {
        println!("{}", "⚠️  No workbooks found".yellow());
        return Ok(());
    }

    for wb in &workbooks {
        let year = match wb.year {
            Some(y) => y.to_string().bold().to_string(),
            None => format!("'{}'", wb.year_label).yellow().to_string(),
        };
        println!("   📄 {}  {}", wb.file.bright_blue(), year);

        if let Some(ref error) = wb.error {
            println!("      {} {}", "❌".red(), error.red());
        } else if wb.sheets.is_empty() {
            println!("      {}", "no statement sheets".dimmed());
        } else {
            let sheets: Vec<String> = wb.sheets.iter().map(|k| k.to_string()).collect();
            println!("      {}", sheets.join(", "));
        }
    }

    let mut years: Vec<i32> = workbooks.iter().filter_map(|wb| wb.year).collect();
    years.sort_unstable();
    years.dedup();
    let undated = workbooks.iter().filter(|wb| wb.year.is_none()).count();

    println!();
    println!(
        "   {} Fiscal years: {}",
        "✅".green(),
        years
            .iter()
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if undated > 0 {
        println!(
            "   {} {} workbook(s) without a 20xx year in the file name",
            "⚠️".yellow(),
            undated
        );
    }

    Ok(())
}

//==============================================================================
// show
//==============================================================================

/// Execute the show command
pub fn show(config: &AnalyticsConfig, file: PathBuf, key: SheetKey) -> StatementResult<()> {
    let analytics = open(config)?;
    let path = resolve_workbook(config, file);
    let view = analytics.read_statement(&path, key)?;

    println!("{}", "🔥 Statement Trends - Statement".bold().green());
    println!("   File:  {}", path.display());
    println!("   Sheet: {}\n", view.sheet.bright_yellow().bold());

    let mut header = format!("{:<40} {:<8}", "과목".bold(), "구분".bold());
    for column in &view.columns {
        header.push_str(&format!(" {:>18}", column.bold()));
    }
    println!("{}", header);
    println!("{}", "─".repeat(50 + 19 * view.columns.len()));

    for line in &view.lines {
        if line.separator {
            println!("{}", line.label.dimmed());
            continue;
        }
        let bucket = match line.bucket {
            Bucket::Income | Bucket::Asset => line.bucket.label().green(),
            Bucket::Expense | Bucket::LiabilityAndFund => line.bucket.label().red(),
            Bucket::Other => line.bucket.label().dimmed(),
        };
        let label = if line.indent == 0 {
            line.label.bold().to_string()
        } else {
            line.label.clone()
        };
        let mut row = format!("{:<40} {:<8}", label, bucket);
        for cell in &line.values {
            row.push_str(&format!(" {:>18}", format_cell(cell)));
        }
        println!("{}", row);
    }

    println!("{}", "─".repeat(50 + 19 * view.columns.len()));
    println!("   {} rows", view.lines.len());
    Ok(())
}

//==============================================================================
// options
//==============================================================================

/// Execute the options command
pub fn options(
    config: &AnalyticsConfig,
    key: SheetKey,
    level: Level,
    bucket: Option<Bucket>,
    json: bool,
) -> StatementResult<()> {
    let analytics = open(config)?;
    let options = analytics.list_options(key.statement, key.unit, level, bucket)?;

    if json {
        return print_json(&options);
    }

    println!("{}", "🔥 Statement Trends - Series Options".bold().green());
    println!("   Sheet: {}", key.to_string().bright_yellow().bold());
    print!("   Level: {}", level);
    if let Some(b) = bucket {
        print!("   Bucket: {}", b);
    }
    println!("\n");

    if options.is_empty() {
        println!("{}", "⚠️  No data for this selection".yellow());
        return Ok(());
    }

    for (i, option) in options.iter().enumerate() {
        let label = if option.selection.is_synthetic() {
            option.label.bright_magenta().bold()
        } else {
            option.label.bright_blue()
        };
        println!("   {:>3}. {}  {}", i + 1, label, option.id.dimmed());
    }
    println!("\n   {} options", options.len());
    Ok(())
}

//==============================================================================
// series
//==============================================================================

fn print_report(report: &SeriesReport) {
    println!("\n{}", format!("📊 {}", report.title).bold().cyan());
    println!("{}", "─".repeat(72));
    println!(
        "{:<8} {:>20} {:>14} {:>14} {:>10}",
        "연도".bold(),
        "금액".bold(),
        "백만원".bold(),
        "증감".bold(),
        "증감률".bold()
    );
    println!("{}", "─".repeat(72));

    for row in &report.rows {
        let delta = match row.delta_millions {
            Some(d) => format!("{:+.1}", d),
            None => "-".to_string(),
        };
        let pct = format_change(row.pct_change);
        let (delta, pct) = match row.pct_change.or(row.delta_millions) {
            Some(change) if change > 0.0 => (delta.green(), pct.green()),
            Some(change) if change < 0.0 => (delta.red(), pct.red()),
            _ => (delta.normal(), pct.normal()),
        };
        println!(
            "{:<8} {:>20} {:>14.1} {:>14} {:>10}",
            row.year,
            format_amount(row.amount),
            row.millions,
            delta,
            pct
        );
    }
    println!("{}", "─".repeat(72));
}

/// Execute the series command
pub fn series(
    config: &AnalyticsConfig,
    key: SheetKey,
    selection: Selection,
    bucket: Option<Bucket>,
    recent: Option<usize>,
    export: Option<PathBuf>,
    json: bool,
) -> StatementResult<()> {
    if let Some(ref output) = export {
        check_export_path(output)?;
    }

    let analytics = open(config)?;
    let series = analytics.get_series(key.statement, key.unit, &selection, bucket)?;
    let full = SeriesReport::from_series(selection_label(&selection), &series);
    let report = match recent {
        Some(n) => full.recent(n),
        None => full,
    };

    if json {
        return print_json(&report);
    }

    println!("{}", "🔥 Statement Trends - Series".bold().green());
    println!("   Sheet: {}", key.to_string().bright_yellow().bold());
    if let Some(b) = bucket {
        println!("   Bucket: {}", b);
    }

    if report.is_empty() {
        println!("\n{}", "⚠️  No data for this selection".yellow());
        return Ok(());
    }

    print_report(&report);

    if let Some(output) = export {
        SeriesExporter::new().with_report(&report).export(&output)?;
        println!(
            "{}",
            format!("✅ Series exported to {}", output.display())
                .bold()
                .green()
        );
    }
    Ok(())
}

//==============================================================================
// composition
//==============================================================================

/// Execute the composition command
pub fn composition(
    config: &AnalyticsConfig,
    key: SheetKey,
    request: CompositionRequest,
    json: bool,
) -> StatementResult<()> {
    let analytics = open(config)?;
    let composition = analytics.composition(key.statement, key.unit, &request)?;

    if json {
        return print_json(&composition);
    }

    println!("{}", "🔥 Statement Trends - Composition".bold().green());
    println!("   Sheet:  {}", key.to_string().bright_yellow().bold());
    println!("   Year:   {}", composition.year);
    println!("   Bucket: {}", composition.bucket);
    match request.drill {
        Drill::Top { .. } => {}
        Drill::Category { ref category } => println!("   관: {}", category.bright_blue()),
        Drill::Section {
            ref category,
            ref section,
        } => println!(
            "   관: {}  항: {}",
            category.bright_blue(),
            section.bright_blue()
        ),
    }

    if composition.is_empty() {
        println!("\n{}", "⚠️  No data for this selection".yellow());
        return Ok(());
    }

    println!(
        "\n{}",
        format!("📊 {} breakdown", composition.level).bold().cyan()
    );
    println!("{}", "─".repeat(64));
    for slice in &composition.slices {
        let bar = "█".repeat((slice.share * 30.0).round() as usize);
        println!(
            "{:<24} {:>18} {:>7.1}% {}",
            slice.label.bright_blue(),
            format_amount(slice.amount),
            slice.share * 100.0,
            bar.cyan()
        );
    }
    println!("{}", "─".repeat(64));
    println!("{:<24} {:>18}", "합계".bold(), format_amount(composition.total));
    Ok(())
}

//==============================================================================
// facts
//==============================================================================

/// Execute the facts command
pub fn facts(
    config: &AnalyticsConfig,
    key: SheetKey,
    bucket: Option<Bucket>,
    export: Option<PathBuf>,
) -> StatementResult<()> {
    if let Some(ref output) = export {
        check_export_path(output)?;
    }

    let analytics = open(config)?;
    let table = analytics.fact_table(key.statement, key.unit)?.filtered(bucket);

    println!("{}", "🔥 Statement Trends - Fact Table".bold().green());
    println!("   Sheet: {}", key.to_string().bright_yellow().bold());
    println!(
        "   {} facts over {} year(s)\n",
        table.len(),
        table.years().len()
    );

    if let Some(output) = export {
        SeriesExporter::new().with_facts(&table).export(&output)?;
        println!(
            "{}",
            format!("✅ Fact table exported to {}", output.display())
                .bold()
                .green()
        );
        return Ok(());
    }

    println!(
        "{:<6} {:<10} {:<20} {:<20} {:<24} {:>18}",
        "연도".bold(),
        "구분".bold(),
        "관".bold(),
        "항".bold(),
        "목".bold(),
        "금액".bold()
    );
    println!("{}", "─".repeat(104));
    for fact in table.iter() {
        println!(
            "{:<6} {:<10} {:<20} {:<20} {:<24} {:>18}",
            fact.year,
            fact.bucket.label(),
            fact.category,
            fact.section,
            fact.line_item,
            format_amount(fact.amount)
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
