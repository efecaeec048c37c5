// Docmill - invoice ingestion: AI-assisted extraction with durable archival

pub mod analyzer;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod prompts;
pub mod queue;
pub mod routes;
pub mod storage;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
