use std::sync::Arc;

use seismo_core::transform::executor::CliTransformExecutor;
use seismo_pipeline::ImagePipelineService;

use crate::config::ServerConfig;

/// The pipeline service as wired in the server: jobs run the external tool.
pub type Pipeline = ImagePipelineService<CliTransformExecutor>;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool; `None` when running on the in-memory store.
    pub pool: Option<seismo_db::DbPool>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Image pipeline service (also owns the job dispatcher).
    pub pipeline: Arc<Pipeline>,
}
