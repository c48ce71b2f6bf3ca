//! Year-over-year report over a series

use crate::types::Series;
use serde::Serialize;

/// Divisor for the 백만원 (million won) columns.
pub const MILLION: f64 = 1_000_000.0;

/// Number of trailing years shown by default.
pub const DEFAULT_RECENT_YEARS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub year: i32,
    pub amount: f64,
    pub millions: f64,
    /// Change against the previous row, in millions
    pub delta_millions: Option<f64>,
    /// Fractional change against the previous row
    pub pct_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SeriesReport {
    pub title: String,
    pub rows: Vec<ReportRow>,
}

impl SeriesReport {
    pub fn from_series(title: impl Into<String>, series: &Series) -> Self {
        let mut rows: Vec<ReportRow> = Vec::with_capacity(series.len());
        for point in &series.points {
            let millions = point.amount / MILLION;
            let (delta_millions, pct_change) = match rows.last() {
                Some(prev) => (
                    Some(millions - prev.millions),
                    (prev.amount != 0.0).then(|| (point.amount - prev.amount) / prev.amount),
                ),
                None => (None, None),
            };
            rows.push(ReportRow {
                year: point.year,
                amount: point.amount,
                millions,
                delta_millions,
                pct_change,
            });
        }
        Self {
            title: title.into(),
            rows,
        }
    }

    /// The last `n` rows; changes keep referring to the full series.
    pub fn recent(&self, n: usize) -> SeriesReport {
        let skip = self.rows.len().saturating_sub(n);
        SeriesReport {
            title: self.title.clone(),
            rows: self.rows[skip..].to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
