use clap::{ArgGroup, Args, Parser, Subcommand};
use statement_trends::cli::{self, TotalKind};
use statement_trends::composition::CompositionRequest;
use statement_trends::config::AnalyticsConfig;
use statement_trends::error::StatementResult;
use statement_trends::types::{Bucket, Level, SheetKey, StatementType, UnitType};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "strend")]
#[command(about = "Multi-year trends over financial statement workbooks")]
#[command(long_about = "Statement Trends - year-over-year analytics over statement workbooks

Reads one workbook per fiscal year (the year comes from the file name, e.g.
2023.xlsx) and decodes the 관/항/목 hierarchy of sheets named like
자금계산서(전체), 재무상태표(등록금) or 운영계산서(비등록금).

COMMANDS:
  years        - List workbooks, fiscal years and matched sheets
  show         - Raw statement view of one workbook
  options      - Selectable 관/항/목 labels (plus synthetic totals)
  series       - Year → amount series with year-over-year changes
  composition  - Single-year breakdown of a bucket
  facts        - Dump the aggregated fact table

EXAMPLES:
  strend years --data-dir ./data
  strend options -s cash-flow -u total --level category --bucket income
  strend series -s 자금계산서 -u 등록금 --category 등록금수입
  strend series -s balance-sheet -u total --total assets --export assets.xlsx
  strend composition -s cash-flow -u total --year 2023 --bucket expense

CONFIGURATION:
  --config strend.yaml sets data_dir, extensions, year_policy and
  duplicate_sheet_policy. --data-dir (or STREND_DATA_DIR) overrides data_dir.
  Log level via RUST_LOG (default: statement_trends=warn).")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory of fiscal-year workbooks
    #[arg(short = 'd', long, global = true, env = "STREND_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Which sheet of each workbook to read.
#[derive(Args)]
struct SheetArgs {
    /// Statement type (cash-flow | balance-sheet | operating, or the Korean name)
    #[arg(short, long, value_enum)]
    statement: StatementType,

    /// Unit type (total | tuition | non-tuition, or the Korean name)
    #[arg(short, long, value_enum, default_value = "total")]
    unit: UnitType,
}

impl SheetArgs {
    fn key(&self) -> SheetKey {
        SheetKey::new(self.statement, self.unit)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List workbooks, fiscal years and matched sheets
    Years {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one workbook's statement sheet with hierarchy and blocks
    Show {
        /// Workbook path (relative paths also resolve against the data directory)
        file: PathBuf,

        #[command(flatten)]
        sheet: SheetArgs,
    },

    #[command(long_about = "List the labels selectable for a series.

Labels follow the most recent workbook's order; labels only found in older
workbooks come after. Labels whose amounts sum to zero over all years are
left out, as are denylisted line items (유동자금, 예수금, 선수금, ...).

At the category level the synthetic totals are listed too:
  총 계     - cash-flow grand total expense row (no bucket filter)
  자산총계  - balance sheet total assets
  부채총계  - balance sheet total liabilities and funds")]
    /// List selectable 관/항/목 labels
    Options {
        #[command(flatten)]
        sheet: SheetArgs,

        /// Hierarchy level
        #[arg(short, long, value_enum, default_value = "category")]
        level: Level,

        /// Restrict to one bucket (income, expense, asset, liability-and-fund)
        #[arg(short, long, value_enum)]
        bucket: Option<Bucket>,

        /// Print JSON instead of a list
        #[arg(long)]
        json: bool,
    },

    #[command(long_about = "Year → amount series for one label or synthetic total.

Years whose workbook lacks the sheet or the label are omitted, never
zero-filled. The report shows amounts in won and millions of won with
year-over-year change.

EXAMPLES:
  strend series -s cash-flow --category 등록금수입
  strend series -s cash-flow --total cash-outflow --recent 5
  strend series -s balance-sheet --total liabilities --export debt.xlsx")]
    /// Year → amount series with year-over-year changes
    #[command(group(
        ArgGroup::new("selection")
            .required(true)
            .args(["category", "section", "line_item", "total"]),
    ))]
    Series {
        #[command(flatten)]
        sheet: SheetArgs,

        /// 관 label
        #[arg(long)]
        category: Option<String>,

        /// 항 label
        #[arg(long)]
        section: Option<String>,

        /// 목 label
        #[arg(long)]
        line_item: Option<String>,

        /// Synthetic total
        #[arg(long, value_enum)]
        total: Option<TotalKind>,

        /// Restrict to one bucket
        #[arg(short, long, value_enum)]
        bucket: Option<Bucket>,

        /// Show only the last N years
        #[arg(short, long)]
        recent: Option<usize>,

        /// Write the report to an .xlsx file
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    #[command(long_about = "Single-year composition of a bucket.

Without --category the bucket is broken down at --level. --category drills
into that 관's 항, --category with --section into that 항's 목. Balance sheet
line items are shown net of accumulated depreciation.")]
    /// Single-year breakdown of a bucket
    Composition {
        #[command(flatten)]
        sheet: SheetArgs,

        /// Fiscal year
        #[arg(short, long)]
        year: i32,

        /// Bucket to break down
        #[arg(short, long, value_enum)]
        bucket: Bucket,

        /// Level for the top-level breakdown
        #[arg(short, long, value_enum)]
        level: Option<Level>,

        /// Drill into this 관
        #[arg(long)]
        category: Option<String>,

        /// Drill into this 항 (requires --category)
        #[arg(long, requires = "category")]
        section: Option<String>,

        /// Print JSON instead of a chart
        #[arg(long)]
        json: bool,
    },

    /// Dump the aggregated fact table
    Facts {
        #[command(flatten)]
        sheet: SheetArgs,

        /// Restrict to one bucket
        #[arg(short, long, value_enum)]
        bucket: Option<Bucket>,

        /// Write the table to an .xlsx file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
}

fn main() -> StatementResult<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statement_trends=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AnalyticsConfig::resolve(cli.config.as_deref(), cli.data_dir)?;

    match cli.command {
        Commands::Years { json } => cli::years(&config, json),

        Commands::Show { file, sheet } => cli::show(&config, file, sheet.key()),

        Commands::Options {
            sheet,
            level,
            bucket,
            json,
        } => cli::options(&config, sheet.key(), level, bucket, json),

        Commands::Series {
            sheet,
            category,
            section,
            line_item,
            total,
            bucket,
            recent,
            export,
            json,
        } => {
            let selection = cli::selection_from_args(category, section, line_item, total)?;
            cli::series(&config, sheet.key(), selection, bucket, recent, export, json)
        }

        Commands::Composition {
            sheet,
            year,
            bucket,
            level,
            category,
            section,
            json,
        } => {
            let drill = cli::drill_from_args(level, category, section)?;
            let request = CompositionRequest {
                year,
                bucket,
                drill,
            };
            cli::composition(&config, sheet.key(), request, json)
        }

        Commands::Facts {
            sheet,
            bucket,
            export,
        } => cli::facts(&config, sheet.key(), bucket, export),
    }
}
