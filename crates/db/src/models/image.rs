//! Earthquake image models and DTOs.
//!
//! One `earthquake_images` row per (earthquake, processing attempt). Rows
//! are never moved out of a terminal status; retries create new rows.

use seismo_core::metadata::ImageMetadata;
use seismo_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::earthquake::EarthquakeSummary;
use crate::models::status::{ImageType, ProcessingStatus};

/// A row from the `earthquake_images` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct EarthquakeImage {
    pub id: DbId,
    pub earthquake_id: DbId,
    pub image_type: ImageType,
    pub original_url: Option<String>,
    pub processed_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub processing_status: ProcessingStatus,
    /// Whole seconds spent in the transform tool.
    pub processing_time: Option<i32>,
    pub metadata: Option<Json<ImageMetadata>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EarthquakeImage {
    /// Typed view of the metadata bag.
    pub fn metadata(&self) -> Option<&ImageMetadata> {
        self.metadata.as_ref().map(|m| &m.0)
    }
}

/// DTO for inserting a new image row.
#[derive(Debug, Clone)]
pub struct CreateEarthquakeImage {
    pub earthquake_id: DbId,
    pub image_type: ImageType,
    pub original_url: String,
    pub processing_status: ProcessingStatus,
    pub metadata: ImageMetadata,
}

/// Fields written when a `PROCESSING` image completes.
#[derive(Debug, Clone)]
pub struct CompleteImage {
    pub processed_url: String,
    pub thumbnail_url: String,
    pub processing_time: i32,
    pub metadata: ImageMetadata,
}

/// An image together with a summary of its earthquake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarthquakeImageDetail {
    #[serde(flatten)]
    pub image: EarthquakeImage,
    pub earthquake: Option<EarthquakeSummary>,
}
