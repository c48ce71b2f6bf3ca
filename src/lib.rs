//! Statement Trends - multi-year analytics over financial statement workbooks
//!
//! Each fiscal year is one spreadsheet whose sheets are named
//! `<statement>(<unit>)` (e.g. `자금계산서(등록금)`). Rows carry the
//! 관/항/목 hierarchy purely through leading indentation; this library decodes
//! that hierarchy, aggregates it across years and answers series, option-list
//! and composition queries over the result.
//!
//! # Features
//!
//! - Sheet matching with an explicit duplicate-sheet policy
//! - Indentation-driven hierarchy decoding (관 → 항 → 목)
//! - Income/expense and asset/liability bucket classification
//! - Multi-year fact tables with per-file failure isolation
//! - Read-through, thread-safe sheet cache
//! - Year-over-year reports and Excel export
//!
//! # Example
//!
//! ```no_run
//! use statement_trends::{AnalyticsConfig, CachedAnalytics, Selection, StatementType, UnitType};
//!
//! let config = AnalyticsConfig::resolve(None, Some("data".into()))?;
//! let analytics = CachedAnalytics::from_config(&config);
//!
//! let series = analytics.get_series(
//!     StatementType::CashFlow,
//!     UnitType::Total,
//!     &Selection::Category("등록금수입".to_string()),
//!     None,
//! )?;
//! for point in &series.points {
//!     println!("{}: {}", point.year, point.amount);
//! }
//! # Ok::<(), statement_trends::StatementError>(())
//! ```

pub mod aggregate;
pub mod analytics;
pub mod api;
pub mod classify;
pub mod cli;
pub mod composition;
pub mod config;
pub mod error;
pub mod excel;
pub mod extract;
pub mod report;
pub mod select;
pub mod sheets;
pub mod types;

// Re-export commonly used types
pub use analytics::{Analytics, CachedAnalytics, WorkbookSummary};
pub use composition::{Composition, CompositionRequest, Drill};
pub use config::AnalyticsConfig;
pub use error::{StatementError, StatementResult};
pub use report::SeriesReport;
pub use types::{
    AggregatedFact, Bucket, FactTable, Level, Selection, Series, SeriesOption, SheetKey,
    StatementType, UnitType,
};
