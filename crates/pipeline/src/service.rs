//! Image pipeline service.
//!
//! Owns the lifecycle of earthquake images:
//! 1. Verify the earthquake exists.
//! 2. Create the image record in `PROCESSING` and audit the creation.
//! 3. Submit the transform job and return the `PROCESSING` record.
//! 4. When the job settles, move the record to `COMPLETED` or `FAILED`
//!    and audit the transition.
//!
//! Step 1 runs in the caller's request. Steps 2-3 run in a task tracked by
//! the dispatcher that the request awaits but cannot cancel. Step 4 runs in
//! the job's background task, where errors are logged and never surfaced.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use seismo_core::error::CoreError;
use seismo_core::metadata::{ImageMetadata, ImageSource};
use seismo_core::transform::executor::{TransformOutcome, TransformRequest, TransformRunner};
use seismo_core::transform::naming;
use seismo_core::transform::TransformKind;
use seismo_core::types::DbId;
use seismo_db::models::audit::CreateAuditLog;
use seismo_db::models::image::{
    CompleteImage, CreateEarthquakeImage, EarthquakeImage, EarthquakeImageDetail,
};
use seismo_db::models::status::{ImageType, ProcessingStatus};
use seismo_db::store::{AuditSink, ImageStore};
use serde_json::json;

use crate::config::PipelineConfig;
use crate::dispatcher::JobDispatcher;
use crate::error::PipelineResult;
use crate::fetcher::SourceFetcher;

/// Fallback failure reason when a runner reports failure without one.
const UNKNOWN_ERROR: &str = "Unknown error";

/// Coordinates image records, transform jobs and the audit trail.
///
/// Held in the API state as an `Arc<ImagePipelineService<_>>`.
pub struct ImagePipelineService<R> {
    store: Arc<dyn ImageStore>,
    audit: Arc<dyn AuditSink>,
    fetcher: Arc<dyn SourceFetcher>,
    dispatcher: JobDispatcher<R>,
    processed_url_prefix: String,
    downloads_dir: PathBuf,
    min_time_secs: u64,
}

impl<R: TransformRunner> ImagePipelineService<R> {
    pub fn new(
        store: Arc<dyn ImageStore>,
        audit: Arc<dyn AuditSink>,
        fetcher: Arc<dyn SourceFetcher>,
        runner: R,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            store,
            audit,
            fetcher,
            dispatcher: JobDispatcher::new(runner),
            processed_url_prefix: config.processed_url_prefix.clone(),
            downloads_dir: config.downloads_dir(),
            min_time_secs: config.min_time_secs,
        }
    }

    pub fn dispatcher(&self) -> &JobDispatcher<R> {
        &self.dispatcher
    }

    /// Start one transform of `image_url` for an earthquake.
    ///
    /// Returns the new image in `PROCESSING`; the job's result is applied
    /// to it later. Fails with `NotFound` before any record is created if
    /// the earthquake does not exist.
    ///
    /// Creating the record, auditing it and submitting the job run as one
    /// tracked task. Dropping the returned future (request timeout, client
    /// disconnect) does not stop that task, so a created record always gets
    /// a job.
    pub async fn process_image(
        &self,
        earthquake_id: DbId,
        image_url: &str,
        kind: TransformKind,
    ) -> PipelineResult<EarthquakeImage> {
        self.require_earthquake(earthquake_id).await?;

        let output_filename = naming::output_filename(earthquake_id, kind, Utc::now());
        let start = JobStart {
            store: Arc::clone(&self.store),
            audit: Arc::clone(&self.audit),
            dispatcher: self.dispatcher.clone(),
            earthquake_id,
            processed_url: format!("{}/{output_filename}", self.processed_url_prefix),
            request: TransformRequest {
                input: image_url.to_string(),
                output_filename,
                kind,
                min_time_secs: self.min_time_secs,
            },
        };

        let image = self
            .dispatcher
            .track(start.run())
            .await
            .map_err(|e| CoreError::Internal(format!("image start task failed: {e}")))??;

        tracing::info!(
            earthquake_id,
            image_id = image.id,
            kind = %kind,
            "Image processing started",
        );
        Ok(image)
    }

    /// Download `image_url` once and start every transform kind against the
    /// local copy.
    ///
    /// Returns the `PROCESSING` images in [`TransformKind::ALL`] order. A
    /// failed download starts no jobs. A failure part-way through leaves the
    /// already started jobs running.
    pub async fn process_all_types(
        &self,
        earthquake_id: DbId,
        image_url: &str,
    ) -> PipelineResult<Vec<EarthquakeImage>> {
        self.require_earthquake(earthquake_id).await?;

        let local = self
            .downloads_dir
            .join(naming::source_filename(earthquake_id, Utc::now()));
        self.fetcher.download(image_url, &local).await?;
        let local = local.to_string_lossy();

        let mut images = Vec::with_capacity(TransformKind::ALL.len());
        for kind in TransformKind::ALL {
            images.push(self.process_image(earthquake_id, &local, kind).await?);
        }
        Ok(images)
    }

    /// Record an untransformed image for an earthquake.
    ///
    /// Without `image_url` a concrete placeholder URL is resolved. The image
    /// is created directly in `COMPLETED` with provenance metadata.
    pub async fn create_original_image(
        &self,
        earthquake_id: DbId,
        image_url: Option<String>,
    ) -> PipelineResult<EarthquakeImage> {
        self.require_earthquake(earthquake_id).await?;

        let (url, source) = match image_url {
            Some(url) => (url, ImageSource::Provided),
            None => (self.fetcher.resolve_random().await, ImageSource::Random),
        };

        let image = self
            .store
            .create_image(&CreateEarthquakeImage {
                earthquake_id,
                image_type: ImageType::Original,
                original_url: url,
                processing_status: ProcessingStatus::Completed,
                metadata: ImageMetadata::provenance(source),
            })
            .await?;

        self.audit
            .append(&CreateAuditLog::process_image(
                earthquake_id,
                image.id,
                json!({ "imageType": ImageType::Original, "status": ProcessingStatus::Completed }),
            ))
            .await?;

        tracing::info!(earthquake_id, image_id = image.id, "Original image recorded");
        Ok(image)
    }

    /// All images of an earthquake, newest first. Unknown earthquakes yield
    /// an empty list.
    pub async fn images_by_earthquake(
        &self,
        earthquake_id: DbId,
    ) -> PipelineResult<Vec<EarthquakeImage>> {
        Ok(self.store.list_images_by_earthquake(earthquake_id).await?)
    }

    /// One image with a summary of its earthquake.
    pub async fn image_by_id(&self, image_id: DbId) -> PipelineResult<Option<EarthquakeImageDetail>> {
        let Some(image) = self.store.find_image(image_id).await? else {
            return Ok(None);
        };
        let earthquake = self.store.find_earthquake(image.earthquake_id).await?;
        Ok(Some(EarthquakeImageDetail { image, earthquake }))
    }

    async fn require_earthquake(&self, earthquake_id: DbId) -> PipelineResult<()> {
        match self.store.find_earthquake(earthquake_id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::NotFound {
                entity: "Earthquake",
                id: earthquake_id,
            }
            .into()),
        }
    }
}

/// Record creation, its audit entry and job submission for one transform.
struct JobStart<R> {
    store: Arc<dyn ImageStore>,
    audit: Arc<dyn AuditSink>,
    dispatcher: JobDispatcher<R>,
    earthquake_id: DbId,
    processed_url: String,
    request: TransformRequest,
}

impl<R: TransformRunner> JobStart<R> {
    async fn run(self) -> PipelineResult<EarthquakeImage> {
        let earthquake_id = self.earthquake_id;
        let kind = self.request.kind;
        let image_type = ImageType::from(kind);

        let image = self
            .store
            .create_image(&CreateEarthquakeImage {
                earthquake_id,
                image_type,
                original_url: self.request.input.clone(),
                processing_status: ProcessingStatus::Processing,
                metadata: ImageMetadata::started(kind),
            })
            .await?;

        self.audit
            .append(&CreateAuditLog::process_image(
                earthquake_id,
                image.id,
                json!({ "imageType": image_type, "status": ProcessingStatus::Processing }),
            ))
            .await?;

        let completion = JobCompletion {
            store: self.store,
            audit: self.audit,
            earthquake_id,
            image_id: image.id,
            processed_url: self.processed_url,
        };
        self.dispatcher
            .submit(self.request, move |outcome| completion.apply(outcome));
        Ok(image)
    }
}

/// Everything a finished job needs to settle its image.
///
/// Consumed by [`apply`](Self::apply), so each job settles its image once.
struct JobCompletion {
    store: Arc<dyn ImageStore>,
    audit: Arc<dyn AuditSink>,
    earthquake_id: DbId,
    image_id: DbId,
    processed_url: String,
}

impl JobCompletion {
    async fn apply(self, outcome: TransformOutcome) {
        let (earthquake_id, image_id) = (self.earthquake_id, self.image_id);
        if let Err(e) = self.try_apply(outcome).await {
            tracing::error!(
                earthquake_id,
                image_id,
                error = %e,
                "Failed to record transform result",
            );
        }
    }

    async fn try_apply(self, outcome: TransformOutcome) -> Result<(), sqlx::Error> {
        let (updated, changes) = if outcome.success {
            let processing_time = i32::try_from(outcome.processing_time).unwrap_or(i32::MAX);
            let updated = self
                .store
                .complete_image(
                    self.image_id,
                    &CompleteImage {
                        processed_url: self.processed_url.clone(),
                        thumbnail_url: self.processed_url.clone(),
                        processing_time,
                        metadata: ImageMetadata::completed(outcome.metadata),
                    },
                )
                .await?;
            let changes = json!({
                "status": ProcessingStatus::Completed,
                "processingTime": processing_time,
            });
            (updated, changes)
        } else {
            let error = outcome.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string());
            let updated = self
                .store
                .fail_image(self.image_id, &ImageMetadata::failed(error.clone()))
                .await?;
            let changes = json!({ "status": ProcessingStatus::Failed, "error": error });
            (updated, changes)
        };

        let Some(image) = updated else {
            tracing::warn!(
                image_id = self.image_id,
                "Image no longer processing, transform result dropped",
            );
            return Ok(());
        };

        self.audit
            .append(&CreateAuditLog::process_image(
                self.earthquake_id,
                image.id,
                changes,
            ))
            .await?;

        tracing::info!(
            earthquake_id = self.earthquake_id,
            image_id = image.id,
            status = ?image.processing_status,
            "Image processing settled",
        );
        Ok(())
    }
}
