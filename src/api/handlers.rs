//! API request handlers
//!
//! Handlers for all REST API endpoints. Workbook reads block, so every
//! analytics call runs on the blocking pool.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use super::server::AppState;
use crate::analytics::{CachedAnalytics, WorkbookSummary};
use crate::composition::{Composition, CompositionRequest, Drill};
use crate::error::{StatementError, StatementResult};
use crate::report::SeriesReport;
use crate::select::selection_label;
use crate::types::{Bucket, Level, Selection, Series, SeriesOption, StatementType, UnitType};

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// HTTP status for a failed query.
fn status_for(e: &StatementError) -> StatusCode {
    match e {
        StatementError::Validation(_) => StatusCode::BAD_REQUEST,
        StatementError::MissingSheet { .. } => StatusCode::NOT_FOUND,
        StatementError::MissingColumn { .. }
        | StatementError::Workbook(_)
        | StatementError::FilenameYear(_)
        | StatementError::DuplicateSheet { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Run a query against the shared engine on the blocking pool.
async fn run_query<T, F>(state: &AppState, query: F) -> (StatusCode, Json<ApiResponse<T>>)
where
    T: Serialize + Send + 'static,
    F: FnOnce(&CachedAnalytics) -> StatementResult<T> + Send + 'static,
{
    let analytics = Arc::clone(&state.analytics);
    match tokio::task::spawn_blocking(move || query(&analytics)).await {
        Ok(Ok(data)) => (StatusCode::OK, Json(ApiResponse::ok(data))),
        Ok(Err(e)) => {
            warn!(error = %e, "Query failed");
            (status_for(&e), Json(ApiResponse::err(e.to_string())))
        }
        Err(e) => {
            error!(error = %e, "Query worker failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("Internal error")),
            )
        }
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

fn endpoint(path: &str, method: &str, description: &str) -> EndpointInfo {
    EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "Statement Trends API Server".to_string(),
        version: state.version.clone(),
        description: "Multi-year series over financial statement workbooks".to_string(),
        endpoints: vec![
            endpoint("/health", "GET", "Health check endpoint"),
            endpoint("/version", "GET", "Get server version"),
            endpoint("/api/v1/years", "GET", "Fiscal years and workbooks"),
            endpoint("/api/v1/options", "POST", "Selectable labels for a level"),
            endpoint("/api/v1/series", "POST", "Year to amount series for a selection"),
            endpoint("/api/v1/composition", "POST", "Single-year breakdown of a bucket"),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: ["years", "options", "series", "composition"]
            .iter()
            .map(|f| f.to_string())
            .collect(),
    }))
}

/// Years response
#[derive(Serialize)]
pub struct YearsResponse {
    pub years: Vec<i32>,
    pub workbooks: Vec<WorkbookSummary>,
}

/// GET /api/v1/years - Fiscal years with a workbook
pub async fn years(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    run_query(&state, |analytics| {
        Ok(YearsResponse {
            years: analytics.available_years()?,
            workbooks: analytics.workbooks()?,
        })
    })
    .await
}

fn default_unit() -> UnitType {
    UnitType::Total
}

fn default_level() -> Level {
    Level::Category
}

/// Options request
#[derive(Debug, Deserialize)]
pub struct OptionsRequest {
    pub statement: StatementType,
    #[serde(default = "default_unit")]
    pub unit: UnitType,
    #[serde(default = "default_level")]
    pub level: Level,
    #[serde(default)]
    pub bucket: Option<Bucket>,
}

/// Options response
#[derive(Serialize)]
pub struct OptionsResponse {
    pub sheet: String,
    pub level: Level,
    pub options: Vec<SeriesOption>,
}

/// POST /api/v1/options - Selectable labels
pub async fn options(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OptionsRequest>,
) -> impl IntoResponse {
    run_query(&state, move |analytics| {
        let options = analytics.list_options(req.statement, req.unit, req.level, req.bucket)?;
        Ok(OptionsResponse {
            sheet: crate::types::SheetKey::new(req.statement, req.unit).to_string(),
            level: req.level,
            options,
        })
    })
    .await
}

/// Series request
#[derive(Debug, Deserialize)]
pub struct SeriesRequest {
    pub statement: StatementType,
    #[serde(default = "default_unit")]
    pub unit: UnitType,
    pub selection: Selection,
    #[serde(default)]
    pub bucket: Option<Bucket>,
    /// Limit the report to the last N years
    #[serde(default)]
    pub recent: Option<usize>,
}

/// Series response
#[derive(Serialize)]
pub struct SeriesResponse {
    pub label: String,
    pub series: Series,
    pub report: SeriesReport,
}

/// POST /api/v1/series - Year to amount series
pub async fn series(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SeriesRequest>,
) -> impl IntoResponse {
    run_query(&state, move |analytics| {
        let series = analytics.get_series(req.statement, req.unit, &req.selection, req.bucket)?;
        let label = selection_label(&req.selection).to_string();
        let report = SeriesReport::from_series(label.clone(), &series);
        let report = match req.recent {
            Some(n) => report.recent(n),
            None => report,
        };
        Ok(SeriesResponse {
            label,
            series,
            report,
        })
    })
    .await
}

/// Composition request
///
/// `{"statement": "cash-flow", "year": 2023, "bucket": "expense", "drill": "top", "level": "category"}`
#[derive(Debug, Deserialize)]
pub struct CompositionApiRequest {
    pub statement: StatementType,
    #[serde(default = "default_unit")]
    pub unit: UnitType,
    pub year: i32,
    pub bucket: Bucket,
    #[serde(flatten)]
    pub drill: Drill,
}

/// POST /api/v1/composition - Single-year breakdown
pub async fn composition(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompositionApiRequest>,
) -> impl IntoResponse {
    run_query(&state, move |analytics| -> StatementResult<Composition> {
        let request = CompositionRequest {
            year: req.year,
            bucket: req.bucket,
            drill: req.drill,
        };
        analytics.composition(req.statement, req.unit, &request)
    })
    .await
}
