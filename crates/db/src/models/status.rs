//! Enumerations backed by PostgreSQL enum types.
//!
//! Wire names (JSON and SQL) are SCREAMING_SNAKE_CASE and must match the
//! `CREATE TYPE` statements in the migrations.

use seismo_core::transform::TransformKind;
use serde::{Deserialize, Serialize};

/// What produced an earthquake image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "image_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageType {
    Original,
    EdgeDetected,
    FftTransformed,
    #[serde(rename = "PROCESSED_3D")]
    #[sqlx(rename = "PROCESSED_3D")]
    Processed3d,
}

impl From<TransformKind> for ImageType {
    fn from(kind: TransformKind) -> Self {
        match kind {
            TransformKind::Edge => Self::EdgeDetected,
            TransformKind::Fft => Self::FftTransformed,
            TransformKind::Heightmap3d => Self::Processed3d,
        }
    }
}

/// Lifecycle state of an earthquake image.
///
/// `Pending -> Processing -> Completed | Failed`. Completed and Failed are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "processing_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: ProcessingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

/// Kind of action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Sync,
    ProcessImage,
}
