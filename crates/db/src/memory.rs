//! In-process implementation of the store traits.
//!
//! Used by tests and by the API server when no `DATABASE_URL` is set.
//! Mirrors the PostgreSQL semantics the service relies on: generated ids,
//! newest-first listing, and transitions guarded on `PROCESSING`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use seismo_core::metadata::ImageMetadata;
use seismo_core::types::DbId;
use sqlx::types::Json;

use crate::models::audit::{AuditLog, CreateAuditLog};
use crate::models::earthquake::{CreateEarthquake, Earthquake, EarthquakeSummary};
use crate::models::image::{CompleteImage, CreateEarthquakeImage, EarthquakeImage};
use crate::models::status::ProcessingStatus;
use crate::store::{AuditSink, ImageStore};

#[derive(Default)]
struct MemoryState {
    earthquakes: HashMap<DbId, Earthquake>,
    images: HashMap<DbId, EarthquakeImage>,
    audit: Vec<AuditLog>,
    next_id: DbId,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

/// Thread-safe in-memory earthquake, image and audit store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert an earthquake, returning the stored row.
    pub fn insert_earthquake(&self, input: CreateEarthquake) -> Earthquake {
        let mut state = self.lock();
        let now = Utc::now();
        let earthquake = Earthquake {
            id: state.next_id(),
            usgs_id: input.usgs_id,
            place: input.place,
            magnitude: input.magnitude,
            time: input.time,
            created_at: now,
            updated_at: now,
        };
        state.earthquakes.insert(earthquake.id, earthquake.clone());
        earthquake
    }

    /// Every audit entry, in append order.
    pub fn audit_entries(&self) -> Vec<AuditLog> {
        self.lock().audit.clone()
    }

    /// Audit entries referencing one image, in append order.
    pub fn audit_for_image(&self, image_id: DbId) -> Vec<AuditLog> {
        self.lock()
            .audit
            .iter()
            .filter(|entry| entry.image_id == Some(image_id))
            .cloned()
            .collect()
    }

    /// Apply `update` to an image if it is still `PROCESSING`.
    fn transition(
        &self,
        id: DbId,
        update: impl FnOnce(&mut EarthquakeImage),
    ) -> Option<EarthquakeImage> {
        let mut state = self.lock();
        let image = state.images.get_mut(&id)?;
        if image.processing_status != ProcessingStatus::Processing {
            return None;
        }
        update(image);
        image.updated_at = Utc::now();
        Some(image.clone())
    }
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn find_earthquake(&self, id: DbId) -> Result<Option<EarthquakeSummary>, sqlx::Error> {
        Ok(self.lock().earthquakes.get(&id).map(EarthquakeSummary::from))
    }

    async fn create_image(
        &self,
        input: &CreateEarthquakeImage,
    ) -> Result<EarthquakeImage, sqlx::Error> {
        let mut state = self.lock();
        let now = Utc::now();
        let image = EarthquakeImage {
            id: state.next_id(),
            earthquake_id: input.earthquake_id,
            image_type: input.image_type,
            original_url: Some(input.original_url.clone()),
            processed_url: None,
            thumbnail_url: None,
            processing_status: input.processing_status,
            processing_time: None,
            metadata: Some(Json(input.metadata.clone())),
            created_at: now,
            updated_at: now,
        };
        state.images.insert(image.id, image.clone());
        Ok(image)
    }

    async fn complete_image(
        &self,
        id: DbId,
        input: &CompleteImage,
    ) -> Result<Option<EarthquakeImage>, sqlx::Error> {
        Ok(self.transition(id, |image| {
            image.processing_status = ProcessingStatus::Completed;
            image.processed_url = Some(input.processed_url.clone());
            image.thumbnail_url = Some(input.thumbnail_url.clone());
            image.processing_time = Some(input.processing_time);
            image.metadata = Some(Json(input.metadata.clone()));
        }))
    }

    async fn fail_image(
        &self,
        id: DbId,
        metadata: &ImageMetadata,
    ) -> Result<Option<EarthquakeImage>, sqlx::Error> {
        Ok(self.transition(id, |image| {
            image.processing_status = ProcessingStatus::Failed;
            image.metadata = Some(Json(metadata.clone()));
        }))
    }

    async fn find_image(&self, id: DbId) -> Result<Option<EarthquakeImage>, sqlx::Error> {
        Ok(self.lock().images.get(&id).cloned())
    }

    async fn list_images_by_earthquake(
        &self,
        earthquake_id: DbId,
    ) -> Result<Vec<EarthquakeImage>, sqlx::Error> {
        let mut images: Vec<EarthquakeImage> = self
            .lock()
            .images
            .values()
            .filter(|image| image.earthquake_id == earthquake_id)
            .cloned()
            .collect();
        images.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(images)
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn append(&self, entry: &CreateAuditLog) -> Result<AuditLog, sqlx::Error> {
        let mut state = self.lock();
        let log = AuditLog {
            id: state.next_id(),
            earthquake_id: entry.earthquake_id,
            image_id: entry.image_id,
            action: entry.action,
            entity_type: entry.entity_type.clone(),
            entity_id: entry.entity_id,
            changes: Json(entry.changes.clone()),
            created_at: Utc::now(),
        };
        state.audit.push(log.clone());
        Ok(log)
    }
}
