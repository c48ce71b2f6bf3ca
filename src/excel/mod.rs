//! Excel I/O for statement workbooks
//!
//! - Read: calamine-backed [`SheetSource`] plus the read-through [`SheetCache`]
//! - Write: report and fact-table export with rust_xlsxwriter

mod cache;
mod exporter;
mod reader;

pub use cache::SheetCache;
pub use exporter::{SeriesExporter, FACTS_SHEET, REPORT_SHEET};
pub use reader::{CalamineSource, SheetSource, SheetTable};
