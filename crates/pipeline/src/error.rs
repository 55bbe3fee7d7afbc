use seismo_core::error::CoreError;

use crate::fetcher::DownloadError;

/// Synchronous failures of pipeline operations.
///
/// Transform failures are not represented here: once a job is submitted its
/// outcome only ever lands in the image record.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Failed to download image: {0}")]
    Download(#[from] DownloadError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
