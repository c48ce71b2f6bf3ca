//! Statement Trends API Server module
//!
//! HTTP JSON API over the analytics engine.
//! Run with `strend-server`.

pub mod handlers;
pub mod server;

pub use server::{router, run_api_server, ApiConfig, AppState};
