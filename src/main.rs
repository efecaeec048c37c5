use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docmill::analyzer::{DocumentAnalyzer, GeminiAnalyzer};
use docmill::config::Config;
use docmill::queue::WorkerPool;
use docmill::routes::create_router;
use docmill::storage::{ObjectStore, R2Store};
use docmill::AppState;

/// How long in-flight jobs get to finish after the listener stops before
/// they are cancelled.
const DRAIN_DEADLINE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docmill=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    // External collaborators, wired up once and shared
    let analyzer: Arc<dyn DocumentAnalyzer> = Arc::new(GeminiAnalyzer::from_config(&config.analyzer));
    let store: Arc<dyn ObjectStore> = Arc::new(R2Store::new(&config.storage)?);

    // Worker pool behind the bounded queue
    let (pool, dispatcher) = WorkerPool::start(&config.queue, analyzer, store.clone());

    // Create shared state
    let state = AppState {
        dispatcher,
        store,
        config: config.clone(),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    // The server is down and has released its state, so every dispatcher
    // clone is gone and the queue is closed; give the workers a chance to
    // finish what they already took.
    info!("Draining worker pool");
    pool.join_with_deadline(DRAIN_DEADLINE).await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, closing listener");
}
