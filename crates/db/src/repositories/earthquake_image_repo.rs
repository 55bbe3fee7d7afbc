//! Repository for the `earthquake_images` table.
//!
//! Terminal transitions are guarded in SQL: `complete` and `fail` only touch
//! rows still in `PROCESSING`, so a settled image is never overwritten.

use seismo_core::metadata::ImageMetadata;
use seismo_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::image::{CompleteImage, CreateEarthquakeImage, EarthquakeImage};
use crate::models::status::ProcessingStatus;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, earthquake_id, image_type, original_url, processed_url, \
    thumbnail_url, processing_status, processing_time, metadata, created_at, updated_at";

/// Provides create, guarded-update and read operations for earthquake images.
pub struct EarthquakeImageRepo;

impl EarthquakeImageRepo {
    /// Insert a new image, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateEarthquakeImage,
    ) -> Result<EarthquakeImage, sqlx::Error> {
        let query = format!(
            "INSERT INTO earthquake_images
                (earthquake_id, image_type, original_url, processing_status, metadata)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EarthquakeImage>(&query)
            .bind(input.earthquake_id)
            .bind(input.image_type)
            .bind(&input.original_url)
            .bind(input.processing_status)
            .bind(Json(&input.metadata))
            .fetch_one(pool)
            .await
    }

    /// Find an image by its internal ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<EarthquakeImage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM earthquake_images WHERE id = $1");
        sqlx::query_as::<_, EarthquakeImage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all images of an earthquake, most recently created first.
    pub async fn list_by_earthquake(
        pool: &PgPool,
        earthquake_id: DbId,
    ) -> Result<Vec<EarthquakeImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM earthquake_images
             WHERE earthquake_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, EarthquakeImage>(&query)
            .bind(earthquake_id)
            .fetch_all(pool)
            .await
    }

    /// Move a `PROCESSING` image to `COMPLETED`.
    ///
    /// Returns `None` if the image does not exist or is not processing.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        input: &CompleteImage,
    ) -> Result<Option<EarthquakeImage>, sqlx::Error> {
        let query = format!(
            "UPDATE earthquake_images SET
                processing_status = $2,
                processed_url = $3,
                thumbnail_url = $4,
                processing_time = $5,
                metadata = $6
             WHERE id = $1 AND processing_status = $7
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EarthquakeImage>(&query)
            .bind(id)
            .bind(ProcessingStatus::Completed)
            .bind(&input.processed_url)
            .bind(&input.thumbnail_url)
            .bind(input.processing_time)
            .bind(Json(&input.metadata))
            .bind(ProcessingStatus::Processing)
            .fetch_optional(pool)
            .await
    }

    /// Move a `PROCESSING` image to `FAILED`, replacing its metadata.
    ///
    /// Returns `None` if the image does not exist or is not processing.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        metadata: &ImageMetadata,
    ) -> Result<Option<EarthquakeImage>, sqlx::Error> {
        let query = format!(
            "UPDATE earthquake_images SET
                processing_status = $2,
                metadata = $3
             WHERE id = $1 AND processing_status = $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EarthquakeImage>(&query)
            .bind(id)
            .bind(ProcessingStatus::Failed)
            .bind(Json(metadata))
            .bind(ProcessingStatus::Processing)
            .fetch_optional(pool)
            .await
    }
}
