//! API Routes
//!
//! This module organizes all HTTP endpoints for the application:
//! - `/api/invoices` - invoice upload, extraction and archival
//! - `/api/archive/{key}` - presigned download links for archived originals
//! - `/api/health` - health checks

pub mod health;
pub mod invoices;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
///
/// All routes live under `/api/`. CORS is restricted to the origins the
/// server config allows; request/response pairs are traced.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .merge(invoices::router(state.clone()))
        .merge(health::router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
