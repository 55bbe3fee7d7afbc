use std::path::PathBuf;
use std::time::Duration;

use seismo_core::transform::executor::{ExecutorConfig, DEFAULT_TIMEOUT};

/// Pipeline configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Interpreter or binary that runs the transform tool.
    pub cli_program: String,
    /// Directory containing `process_image.py`.
    pub cli_path: PathBuf,
    /// Root for `output/` (processed artifacts) and `downloads/` (sources).
    pub data_path: PathBuf,
    /// Hard limit for one tool invocation.
    pub cli_timeout: Duration,
    /// Value forwarded to the tool's `--min-time` flag.
    pub min_time_secs: u64,
    /// Limit for downloading a shared source image.
    pub download_timeout: Duration,
    /// Public URL prefix under which `output/` is served.
    pub processed_url_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cli_program: "python3".to_string(),
            cli_path: PathBuf::from("/app/cli"),
            data_path: PathBuf::from("/data"),
            cli_timeout: DEFAULT_TIMEOUT,
            min_time_secs: 10,
            download_timeout: Duration::from_secs(30),
            processed_url_prefix: "/processed".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default      |
    /// |-------------------------|--------------|
    /// | `CLI_PROGRAM`           | `python3`    |
    /// | `CLI_PATH`              | `/app/cli`   |
    /// | `CLI_DATA_PATH`         | `/data`      |
    /// | `CLI_TIMEOUT_SECS`      | `120`        |
    /// | `CLI_MIN_TIME_SECS`     | `10`         |
    /// | `DOWNLOAD_TIMEOUT_SECS` | `30`         |
    /// | `PROCESSED_URL_PREFIX`  | `/processed` |
    ///
    /// Panics on malformed values, including a `PROCESSED_URL_PREFIX` that
    /// is not a non-root absolute path.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cli_timeout_secs: u64 = std::env::var("CLI_TIMEOUT_SECS")
            .unwrap_or_else(|_| defaults.cli_timeout.as_secs().to_string())
            .parse()
            .expect("CLI_TIMEOUT_SECS must be a valid u64");

        let min_time_secs: u64 = std::env::var("CLI_MIN_TIME_SECS")
            .unwrap_or_else(|_| defaults.min_time_secs.to_string())
            .parse()
            .expect("CLI_MIN_TIME_SECS must be a valid u64");

        let download_timeout_secs: u64 = std::env::var("DOWNLOAD_TIMEOUT_SECS")
            .unwrap_or_else(|_| defaults.download_timeout.as_secs().to_string())
            .parse()
            .expect("DOWNLOAD_TIMEOUT_SECS must be a valid u64");

        Self {
            cli_program: std::env::var("CLI_PROGRAM").unwrap_or(defaults.cli_program),
            cli_path: std::env::var("CLI_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cli_path),
            data_path: std::env::var("CLI_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            cli_timeout: Duration::from_secs(cli_timeout_secs),
            min_time_secs,
            download_timeout: Duration::from_secs(download_timeout_secs),
            processed_url_prefix: std::env::var("PROCESSED_URL_PREFIX")
                .map(|raw| normalize_url_prefix(&raw).expect("Invalid PROCESSED_URL_PREFIX"))
                .unwrap_or(defaults.processed_url_prefix),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_path.join("output")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.data_path.join("downloads")
    }

    /// Executor settings for the bundled `process_image.py` tool.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            program: self.cli_program.clone(),
            script: Some(self.cli_path.join("process_image.py")),
            output_dir: self.output_dir(),
            timeout: self.cli_timeout,
        }
    }
}

/// Strip trailing slashes from a URL path prefix and require what remains
/// to be an absolute path other than `/`.
pub fn normalize_url_prefix(raw: &str) -> Result<String, String> {
    let prefix = raw.trim().trim_end_matches('/');
    if !prefix.starts_with('/') {
        return Err(format!("{raw:?} must be an absolute path other than /"));
    }
    Ok(prefix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_executor_runs_bundled_script() {
        let config = PipelineConfig::default();
        let executor = config.executor_config();
        assert_eq!(executor.program, "python3");
        assert_eq!(
            executor.script,
            Some(PathBuf::from("/app/cli/process_image.py"))
        );
        assert_eq!(executor.output_dir, PathBuf::from("/data/output"));
        assert_eq!(executor.timeout, Duration::from_secs(120));
    }

    #[test]
    fn downloads_live_beside_outputs() {
        let config = PipelineConfig {
            data_path: PathBuf::from("/srv/quakes"),
            ..PipelineConfig::default()
        };
        assert_eq!(config.downloads_dir(), PathBuf::from("/srv/quakes/downloads"));
        assert_eq!(config.output_dir(), PathBuf::from("/srv/quakes/output"));
    }

    #[test]
    fn url_prefix_drops_trailing_slashes() {
        assert_eq!(normalize_url_prefix("/processed/").unwrap(), "/processed");
        assert_eq!(normalize_url_prefix("/static/img").unwrap(), "/static/img");
    }

    #[test]
    fn url_prefix_must_be_non_root_absolute_path() {
        assert!(normalize_url_prefix("/").is_err());
        assert!(normalize_url_prefix("//").is_err());
        assert!(normalize_url_prefix("").is_err());
        assert!(normalize_url_prefix("processed").is_err());
    }
}
