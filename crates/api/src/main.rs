use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use seismo_core::transform::executor::CliTransformExecutor;
use seismo_db::memory::MemoryStore;
use seismo_db::store::{AuditSink, ImageStore, PgStore};
use seismo_pipeline::{HttpSourceFetcher, ImagePipelineService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seismo_api::config::ServerConfig;
use seismo_api::router::build_app_router;
use seismo_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "seismo_api=debug,seismo_pipeline=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    tracing::info!(
        program = %config.pipeline.cli_program,
        cli_path = %config.pipeline.cli_path.display(),
        data_path = %config.pipeline.data_path.display(),
        timeout_secs = config.pipeline.cli_timeout.as_secs(),
        "Loaded pipeline configuration",
    );

    // --- Store ---
    let (pool, store, audit) = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = seismo_db::create_pool(&database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            seismo_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            seismo_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let store = Arc::new(PgStore::new(pool.clone()));
            let image_store: Arc<dyn ImageStore> = store.clone();
            let audit: Arc<dyn AuditSink> = store;
            (Some(pool), image_store, audit)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (data is not persisted)");
            let store = Arc::new(MemoryStore::new());
            let image_store: Arc<dyn ImageStore> = store.clone();
            let audit: Arc<dyn AuditSink> = store;
            (None, image_store, audit)
        }
    };

    // --- Pipeline ---
    let fetcher = HttpSourceFetcher::new(config.pipeline.download_timeout)
        .expect("Failed to build HTTP client");
    let executor = CliTransformExecutor::new(config.pipeline.executor_config());
    let pipeline = Arc::new(ImagePipelineService::new(
        store,
        audit,
        Arc::new(fetcher),
        executor,
        &config.pipeline,
    ));
    tracing::info!("Image pipeline started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        pipeline: Arc::clone(&pipeline),
    };

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Jobs are never cancelled; give running ones a chance to settle.
    let drained = pipeline
        .dispatcher()
        .drain(Duration::from_secs(config.shutdown_timeout_secs))
        .await;
    if drained {
        tracing::info!("All transform jobs settled");
    } else {
        tracing::warn!(
            pending = pipeline.dispatcher().in_flight(),
            "Shutdown timeout reached, abandoning in-flight transform jobs",
        );
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
