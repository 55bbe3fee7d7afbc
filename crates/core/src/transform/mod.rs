//! External image transform execution.
//!
//! The transformation algorithms themselves live in an opaque command-line
//! tool. This module names the supported transforms, derives the file names
//! a job writes, and runs the tool as a subprocess with a hard timeout.

pub mod executor;
pub mod naming;
pub mod subprocess;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One of the transformations the external tool supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformKind {
    /// Canny + Sobel edge detection.
    #[serde(rename = "edge")]
    Edge,
    /// Frequency-domain magnitude spectrum.
    #[serde(rename = "fft")]
    Fft,
    /// Pseudo-3D heightmap.
    #[serde(rename = "3d")]
    Heightmap3d,
}

impl TransformKind {
    /// Every kind, in the order `process-all-images` submits them.
    pub const ALL: [TransformKind; 3] = [Self::Edge, Self::Fft, Self::Heightmap3d];

    /// The value passed to the tool's `--type` flag and used in file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edge => "edge",
            Self::Fft => "fft",
            Self::Heightmap3d => "3d",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edge" => Ok(Self::Edge),
            "fft" => Ok(Self::Fft),
            "3d" => Ok(Self::Heightmap3d),
            _ => Err(CoreError::Validation(
                "processingType must be one of: edge, fft, 3d".to_string(),
            )),
        }
    }
}

/// Shared test helpers for executor tests.
#[cfg(test)]
pub(crate) mod test_helpers {
    use std::path::Path;
    use std::time::Duration;

    use super::executor::ExecutorConfig;

    /// Write `body` as a bash script standing in for the transform tool.
    ///
    /// The script has `$out` and `$meta` set from the `--output` and
    /// `--metadata` flags before `body` runs.
    pub fn write_fake_tool(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("fake_tool.sh");
        let script = format!(
            "#!/bin/bash\n\
             while [ $# -gt 0 ]; do\n\
               case \"$1\" in\n\
                 --output) out=\"$2\"; shift 2;;\n\
                 --metadata) meta=\"$2\"; shift 2;;\n\
                 *) shift;;\n\
               esac\n\
             done\n\
             {body}\n"
        );
        std::fs::write(&path, script).expect("write fake tool");
        path
    }

    /// Executor config running `script` through bash with a 5-second timeout.
    pub fn bash_config(script: &Path, output_dir: &Path) -> ExecutorConfig {
        ExecutorConfig {
            program: "bash".to_string(),
            script: Some(script.to_path_buf()),
            output_dir: output_dir.to_path_buf(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_every_wire_name() {
        for kind in TransformKind::ALL {
            assert_eq!(kind.as_str().parse::<TransformKind>().unwrap(), kind);
        }
    }

    #[test]
    fn rejects_unknown_kind() {
        assert_matches!(
            "blur".parse::<TransformKind>(),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn serializes_as_tool_flag_value() {
        let json = serde_json::to_value(TransformKind::Heightmap3d).unwrap();
        assert_eq!(json, "3d");
    }
}
