//! Asynchronous earthquake image processing pipeline.
//!
//! - [`ImagePipelineService`] owns the per-image state machine: it creates
//!   image records, submits transform jobs and applies their results.
//! - [`JobDispatcher`] runs each job as an independent background task and
//!   hands its outcome to a one-shot continuation.
//! - [`SourceFetcher`] downloads source images shared by several jobs.
//!
//! Jobs are fire-and-forget: there is no queue, no concurrency cap and no
//! cancellation. Every submission spawns its own task.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod service;

pub use config::PipelineConfig;
pub use dispatcher::{JobDispatcher, JobHandle};
pub use error::{PipelineError, PipelineResult};
pub use fetcher::{DownloadError, HttpSourceFetcher, SourceFetcher};
pub use service::ImagePipelineService;
