//! Audit log entity models.
//!
//! Audit entries are append-only and have no `updated_at` field.

use seismo_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::status::AuditAction;

/// Entity type recorded for image audit entries.
pub const ENTITY_EARTHQUAKE_IMAGE: &str = "EarthquakeImage";

/// A single audit log entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    pub earthquake_id: DbId,
    pub image_id: Option<DbId>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: DbId,
    /// Snapshot of the fields the action changed.
    pub changes: Json<serde_json::Value>,
    pub created_at: Timestamp,
}

/// DTO for appending an audit entry.
#[derive(Debug, Clone)]
pub struct CreateAuditLog {
    pub earthquake_id: DbId,
    pub image_id: Option<DbId>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: DbId,
    pub changes: serde_json::Value,
}

impl CreateAuditLog {
    /// A `PROCESS_IMAGE` entry for an earthquake image.
    pub fn process_image(earthquake_id: DbId, image_id: DbId, changes: serde_json::Value) -> Self {
        Self {
            earthquake_id,
            image_id: Some(image_id),
            action: AuditAction::ProcessImage,
            entity_type: ENTITY_EARTHQUAKE_IMAGE.to_string(),
            entity_id: image_id,
            changes,
        }
    }
}
