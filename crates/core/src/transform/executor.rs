//! Fail-soft execution of the external transform tool.
//!
//! [`TransformRunner::run`] never returns an error: spawn failures,
//! non-zero exits, timeouts and output directory problems all come back as
//! a [`TransformOutcome`] with `success == false`.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::process::Command;

use super::naming::sidecar_path;
use super::subprocess::{self, CommandError};
use super::TransformKind;

/// Default hard wall-clock limit for one tool invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// One invocation of the transform tool.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    /// Remote URL or local path of the source image.
    pub input: String,
    /// File name (not path) of the artifact to produce in the output directory.
    pub output_filename: String,
    pub kind: TransformKind,
    /// Minimum processing duration hint forwarded as `--min-time`.
    pub min_time_secs: u64,
}

/// Result of one tool invocation. Produced for every request, success or not.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransformOutcome {
    pub success: bool,
    /// Absolute path of the produced artifact; empty on failure.
    pub output_path: PathBuf,
    pub metadata_path: Option<PathBuf>,
    /// Parsed sidecar metadata, absent when the tool wrote none or it was not valid JSON.
    pub metadata: Option<Map<String, Value>>,
    /// Elapsed wall-clock seconds, rounded.
    pub processing_time: u64,
    /// Failure reason; set only when `success` is false.
    pub error: Option<String>,
}

impl TransformOutcome {
    /// A failed outcome with the given reason.
    pub fn failure(error: impl Into<String>, processing_time: u64) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            processing_time,
            ..Self::default()
        }
    }
}

/// Anything that can turn a [`TransformRequest`] into a [`TransformOutcome`].
///
/// Implementations must be fail-soft: every failure is reported through the
/// outcome, never by panicking.
pub trait TransformRunner: Send + Sync + 'static {
    fn run(&self, request: TransformRequest) -> impl Future<Output = TransformOutcome> + Send;
}

/// How to invoke the external tool.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Program to spawn (`python3` for the bundled tool).
    pub program: String,
    /// Script passed as the first argument, if the program is an interpreter.
    pub script: Option<PathBuf>,
    /// Directory receiving outputs and sidecars; created on demand.
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

/// Errors folded into a failed [`TransformOutcome`].
#[derive(Debug, thiserror::Error)]
enum TransformError {
    #[error("failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("transform tool exited with code {exit_code}: {stderr}")]
    Exited { exit_code: i32, stderr: String },
}

/// Runs the transform tool as a subprocess.
pub struct CliTransformExecutor {
    config: ExecutorConfig,
}

impl CliTransformExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Build the tool command line for `request`.
    fn command(&self, request: &TransformRequest, output: &Path, sidecar: &Path) -> Command {
        let mut cmd = Command::new(&self.config.program);
        if let Some(script) = &self.config.script {
            cmd.arg(script);
        }
        cmd.arg("--input")
            .arg(&request.input)
            .arg("--output")
            .arg(output)
            .arg("--type")
            .arg(request.kind.as_str())
            .arg("--min-time")
            .arg(request.min_time_secs.to_string())
            .arg("--metadata")
            .arg(sidecar);
        cmd
    }

    async fn try_run(
        &self,
        request: &TransformRequest,
        output: &Path,
        sidecar: &Path,
    ) -> Result<(), TransformError> {
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|source| TransformError::OutputDir {
                path: self.config.output_dir.clone(),
                source,
            })?;

        let mut cmd = self.command(request, output, sidecar);
        tracing::info!(
            kind = %request.kind,
            input = %request.input,
            output = %output.display(),
            "Executing transform tool",
        );

        let result = subprocess::run_command(&mut cmd, self.config.timeout).await?;

        if !result.stdout.is_empty() {
            tracing::debug!(stdout = %result.stdout.trim_end(), "Transform tool stdout");
        }
        if !result.stderr.is_empty() {
            tracing::warn!(stderr = %result.stderr.trim_end(), "Transform tool stderr");
        }

        if result.exit_code != 0 {
            return Err(TransformError::Exited {
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

impl TransformRunner for CliTransformExecutor {
    async fn run(&self, request: TransformRequest) -> TransformOutcome {
        let start = Instant::now();
        let output = self.config.output_dir.join(&request.output_filename);
        let sidecar = sidecar_path(&output);

        match self.try_run(&request, &output, &sidecar).await {
            Ok(()) => {
                let metadata = read_sidecar(&sidecar).await;
                TransformOutcome {
                    success: true,
                    output_path: output,
                    metadata_path: Some(sidecar),
                    metadata,
                    processing_time: rounded_secs(start.elapsed()),
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(kind = %request.kind, error = %e, "Transform execution failed");
                TransformOutcome::failure(e.to_string(), rounded_secs(start.elapsed()))
            }
        }
    }
}

/// Read and parse the sidecar metadata. A missing or malformed sidecar is
/// tolerated and yields `None`.
async fn read_sidecar(path: &Path) -> Option<Map<String, Value>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not read metadata file");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(map) => Some(map),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not parse metadata file");
            None
        }
    }
}

fn rounded_secs(elapsed: Duration) -> u64 {
    elapsed.as_secs_f64().round() as u64
}
