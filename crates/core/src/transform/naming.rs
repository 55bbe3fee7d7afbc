//! File naming for transform inputs, outputs and sidecars.
//!
//! Every job writes its own uniquely named output so concurrent jobs never
//! share a path.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::transform::TransformKind;
use crate::types::{DbId, Timestamp};

/// Suffix appended to the output stem to form the sidecar metadata path.
pub const SIDECAR_SUFFIX: &str = "_metadata.json";

/// Process-wide counter that separates names generated in the same millisecond.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_sequence() -> u64 {
    SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

/// Output file name for one transform job, e.g. `42_edge_1700000000000-7.jpg`.
pub fn output_filename(earthquake_id: DbId, kind: TransformKind, at: Timestamp) -> String {
    format!(
        "{earthquake_id}_{kind}_{}-{}.jpg",
        at.timestamp_millis(),
        next_sequence()
    )
}

/// File name for a downloaded source image, e.g. `42_source_1700000000000-8.jpg`.
pub fn source_filename(earthquake_id: DbId, at: Timestamp) -> String {
    format!(
        "{earthquake_id}_source_{}-{}.jpg",
        at.timestamp_millis(),
        next_sequence()
    )
}

/// Sidecar metadata path for `output`: same directory and stem, with
/// [`SIDECAR_SUFFIX`] in place of the extension.
pub fn sidecar_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{stem}{SIDECAR_SUFFIX}"))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn output_name_carries_earthquake_kind_and_time() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let name = output_filename(7, TransformKind::Fft, at);
        assert!(name.starts_with("7_fft_1700000000123-"), "got {name}");
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn same_millisecond_submissions_get_distinct_names() {
        let at = Utc::now();
        let a = output_filename(1, TransformKind::Edge, at);
        let b = output_filename(1, TransformKind::Edge, at);
        assert_ne!(a, b);
    }

    #[test]
    fn sidecar_replaces_extension() {
        let path = sidecar_path(Path::new("/data/output/1_edge_5-0.jpg"));
        assert_eq!(path, PathBuf::from("/data/output/1_edge_5-0_metadata.json"));
    }

    #[test]
    fn sidecar_without_extension_appends_suffix() {
        let path = sidecar_path(Path::new("/data/output/result"));
        assert_eq!(path, PathBuf::from("/data/output/result_metadata.json"));
    }
}
