//! Statement Trends API Server implementation
//!
//! HTTP JSON API server using Axum for the dashboard front end.
//! Provides endpoints for years, options, series and composition queries.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::handlers;
use crate::analytics::CachedAnalytics;
use crate::config::AnalyticsConfig;

/// API Server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Shared application state
///
/// One engine (and so one sheet cache) serves every request.
pub struct AppState {
    pub version: String,
    pub analytics: Arc<CachedAnalytics>,
}

impl AppState {
    pub fn new(analytics: CachedAnalytics) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            analytics: Arc::new(analytics),
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(CachedAnalytics::from_config(config))
    }
}

/// Build the router with CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Analytics endpoints
        .route("/api/v1/years", get(handlers::years))
        .route("/api/v1/options", post(handlers::options))
        .route("/api/v1/series", post(handlers::series))
        .route("/api/v1/composition", post(handlers::composition))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(
    config: ApiConfig,
    analytics_config: AnalyticsConfig,
) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "statement_trends=info,strend_server=info,tower_http=info".into()
            }),
        )
        .init();

    analytics_config.validate()?;
    let state = Arc::new(AppState::from_config(&analytics_config));
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("🔥 Statement Trends API Server starting on http://{}", addr);
    info!("   Data directory: {}", analytics_config.data_dir.display());
    info!("   Endpoints: /api/v1/years, /api/v1/options, /api/v1/series, /api/v1/composition");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Statement Trends API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
