//! Typed image metadata.
//!
//! An image's metadata takes one of four shapes over its lifetime. They are
//! stored as a plain JSON object and told apart by which fields are present,
//! so the persisted form stays an open bag while Rust code sees a closed enum.
//! Keys are camelCase, like the audit trail's `changes`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::transform::TransformKind;
use crate::types::Timestamp;

/// Where an original image URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    /// Supplied by the caller.
    Provided,
    /// Resolved from the placeholder image service.
    Random,
}

/// Metadata attached to an earthquake image.
///
/// Variant order matters for deserialization: the first variant whose
/// required fields are all present wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageMetadata {
    /// Set on success: the tool's own measurements plus the completion time.
    #[serde(rename_all = "camelCase")]
    Completion {
        completed_at: Timestamp,
        #[serde(flatten)]
        measurements: Map<String, Value>,
    },
    /// Set on failure.
    #[serde(rename_all = "camelCase")]
    Error { error: String, failed_at: Timestamp },
    /// Set when a transform job is submitted.
    #[serde(rename_all = "camelCase")]
    Start {
        processing_type: TransformKind,
        started_at: Timestamp,
    },
    /// Set when an original image is recorded.
    #[serde(rename_all = "camelCase")]
    Provenance {
        source: ImageSource,
        fetched_at: Timestamp,
    },
}

impl ImageMetadata {
    pub fn provenance(source: ImageSource) -> Self {
        Self::Provenance {
            source,
            fetched_at: chrono::Utc::now(),
        }
    }

    pub fn started(kind: TransformKind) -> Self {
        Self::Start {
            processing_type: kind,
            started_at: chrono::Utc::now(),
        }
    }

    /// Completion metadata merging the tool's sidecar contents, if any.
    pub fn completed(measurements: Option<Map<String, Value>>) -> Self {
        let mut measurements = measurements.unwrap_or_default();
        // The completion timestamp is ours; never let the tool's copy shadow it.
        measurements.remove("completedAt");
        Self::Completion {
            completed_at: chrono::Utc::now(),
            measurements,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
            failed_at: chrono::Utc::now(),
        }
    }

    /// The failure reason, if this is error metadata.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error { error, .. } => Some(error),
            _ => None,
        }
    }
}
