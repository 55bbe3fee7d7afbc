use std::time::Duration;

use seismo_pipeline::PipelineConfig;

/// Headroom the request timeout keeps over the source download timeout.
const REQUEST_TIMEOUT_HEADROOM: Duration = Duration::from_secs(30);

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: download timeout + `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight transform jobs (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Transform tool, data directory and download settings.
    pub pipeline: PipelineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:3001`    |
    /// | `REQUEST_TIMEOUT_SECS` | `DOWNLOAD_TIMEOUT_SECS+30` |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    ///
    /// Pipeline variables are documented on [`PipelineConfig::from_env`].
    ///
    /// Panics if `REQUEST_TIMEOUT_SECS` does not exceed
    /// `DOWNLOAD_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3001".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let pipeline = PipelineConfig::from_env();

        let request_timeout_secs: u64 = match std::env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().expect("REQUEST_TIMEOUT_SECS must be a valid u64"),
            Err(_) => default_request_timeout_secs(&pipeline),
        };
        check_request_timeout(request_timeout_secs, &pipeline)
            .expect("Invalid REQUEST_TIMEOUT_SECS");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            pipeline,
        }
    }
}

/// Request timeout that leaves room for a full source download.
pub fn default_request_timeout_secs(pipeline: &PipelineConfig) -> u64 {
    (pipeline.download_timeout + REQUEST_TIMEOUT_HEADROOM).as_secs()
}

/// A request must outlast the source download it may perform.
pub fn check_request_timeout(
    request_timeout_secs: u64,
    pipeline: &PipelineConfig,
) -> Result<(), String> {
    let download_secs = pipeline.download_timeout.as_secs();
    if request_timeout_secs <= download_secs {
        return Err(format!(
            "request timeout ({request_timeout_secs}s) must exceed the download timeout ({download_secs}s)"
        ));
    }
    Ok(())
}
