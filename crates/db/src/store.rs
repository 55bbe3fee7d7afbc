//! Store traits the pipeline service depends on.
//!
//! The service receives its persistence as explicit trait objects instead
//! of reaching for a global pool. [`PgStore`] backs them with PostgreSQL;
//! [`MemoryStore`](crate::memory::MemoryStore) backs them in-process.

use async_trait::async_trait;
use seismo_core::metadata::ImageMetadata;
use seismo_core::types::DbId;

use crate::models::audit::{AuditLog, CreateAuditLog};
use crate::models::earthquake::EarthquakeSummary;
use crate::models::image::{CompleteImage, CreateEarthquakeImage, EarthquakeImage};
use crate::repositories::{AuditRepo, EarthquakeImageRepo, EarthquakeRepo};
use crate::DbPool;

/// Keyed record store for earthquakes and their images.
///
/// `complete_image` and `fail_image` are guarded transitions: they apply
/// only to images currently `PROCESSING` and return `None` otherwise.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn find_earthquake(&self, id: DbId) -> Result<Option<EarthquakeSummary>, sqlx::Error>;

    async fn create_image(
        &self,
        input: &CreateEarthquakeImage,
    ) -> Result<EarthquakeImage, sqlx::Error>;

    async fn complete_image(
        &self,
        id: DbId,
        input: &CompleteImage,
    ) -> Result<Option<EarthquakeImage>, sqlx::Error>;

    async fn fail_image(
        &self,
        id: DbId,
        metadata: &ImageMetadata,
    ) -> Result<Option<EarthquakeImage>, sqlx::Error>;

    async fn find_image(&self, id: DbId) -> Result<Option<EarthquakeImage>, sqlx::Error>;

    /// Images of one earthquake, most recently created first.
    async fn list_images_by_earthquake(
        &self,
        earthquake_id: DbId,
    ) -> Result<Vec<EarthquakeImage>, sqlx::Error>;
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &CreateAuditLog) -> Result<AuditLog, sqlx::Error>;
}

/// PostgreSQL-backed store delegating to the repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl ImageStore for PgStore {
    async fn find_earthquake(&self, id: DbId) -> Result<Option<EarthquakeSummary>, sqlx::Error> {
        EarthquakeRepo::find_summary(&self.pool, id).await
    }

    async fn create_image(
        &self,
        input: &CreateEarthquakeImage,
    ) -> Result<EarthquakeImage, sqlx::Error> {
        EarthquakeImageRepo::create(&self.pool, input).await
    }

    async fn complete_image(
        &self,
        id: DbId,
        input: &CompleteImage,
    ) -> Result<Option<EarthquakeImage>, sqlx::Error> {
        EarthquakeImageRepo::complete(&self.pool, id, input).await
    }

    async fn fail_image(
        &self,
        id: DbId,
        metadata: &ImageMetadata,
    ) -> Result<Option<EarthquakeImage>, sqlx::Error> {
        EarthquakeImageRepo::fail(&self.pool, id, metadata).await
    }

    async fn find_image(&self, id: DbId) -> Result<Option<EarthquakeImage>, sqlx::Error> {
        EarthquakeImageRepo::find_by_id(&self.pool, id).await
    }

    async fn list_images_by_earthquake(
        &self,
        earthquake_id: DbId,
    ) -> Result<Vec<EarthquakeImage>, sqlx::Error> {
        EarthquakeImageRepo::list_by_earthquake(&self.pool, earthquake_id).await
    }
}

#[async_trait]
impl AuditSink for PgStore {
    async fn append(&self, entry: &CreateAuditLog) -> Result<AuditLog, sqlx::Error> {
        AuditRepo::insert(&self.pool, entry).await
    }
}
