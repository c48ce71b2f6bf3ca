//! Statement Trends API Server binary
//!
//! HTTP JSON API for the statement trends dashboard.
//! Provides years, options, series and composition endpoints.

use clap::Parser;
use statement_trends::api::{run_api_server, ApiConfig};
use statement_trends::config::AnalyticsConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "strend-server")]
#[command(version)]
#[command(about = "Statement Trends API Server - JSON API over fiscal-year statement workbooks")]
#[command(long_about = r#"
Statement Trends API Server - JSON API

Provides endpoints over the workbooks of the data directory:
  - GET  /api/v1/years        - Fiscal years and matched sheets per workbook
  - POST /api/v1/options      - Selectable 관/항/목 labels
  - POST /api/v1/series       - Year to amount series with year-over-year report
  - POST /api/v1/composition  - Single-year breakdown of a bucket

Additional endpoints:
  - GET  /health              - Health check
  - GET  /version             - Server version info
  - GET  /                    - API documentation

Features:
  - Shared, thread-safe sheet cache across requests
  - CORS enabled for cross-origin requests
  - Graceful shutdown on SIGINT/SIGTERM
  - JSON response format with request IDs

Example usage:
  strend-server --data-dir ./data           # Start on localhost:8080
  strend-server --host 0.0.0.0 --port 3000 --config strend.yaml

  curl -X POST http://localhost:8080/api/v1/series \
    -H "Content-Type: application/json" \
    -d '{"statement": "cash-flow", "unit": "total",
         "selection": {"kind": "category", "label": "등록금수입"}}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "STREND_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "STREND_PORT")]
    port: u16,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of fiscal-year workbooks
    #[arg(short = 'd', long, env = "STREND_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let analytics_config = AnalyticsConfig::resolve(args.config.as_deref(), args.data_dir)?;
    let config = ApiConfig {
        host: args.host,
        port: args.port,
    };

    run_api_server(config, analytics_config).await
}
