//! Shared harness for API integration tests.
//!
//! Builds the production router over an in-memory store, a bash script
//! standing in for the transform tool, and a fetcher that never touches the
//! network.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use seismo_api::config::ServerConfig;
use seismo_api::router::build_app_router;
use seismo_api::state::{AppState, Pipeline};
use seismo_core::transform::executor::CliTransformExecutor;
use seismo_db::memory::MemoryStore;
use seismo_db::models::earthquake::{CreateEarthquake, Earthquake};
use seismo_pipeline::{DownloadError, ImagePipelineService, PipelineConfig, SourceFetcher};
use tempfile::TempDir;
use tower::ServiceExt;

/// URL returned for placeholder image lookups.
pub const RANDOM_URL: &str = "https://fastly.picsum.photos/id/237/800/600.jpg";

/// Inputs containing this marker make the fake tool exit non-zero.
pub const FAILING_INPUT: &str = "https://example.com/fail.jpg";

/// URLs containing this marker fail to download.
pub const UNREACHABLE_URL: &str = "https://unreachable.example.com/quake.jpg";

/// Stand-in for `process_image.py`: writes the output and a sidecar naming
/// the transform kind, or fails when the input mentions `fail`.
const FAKE_TOOL: &str = r#"#!/bin/bash
while [ $# -gt 0 ]; do
  case "$1" in
    --input) input="$2"; shift 2;;
    --output) out="$2"; shift 2;;
    --type) kind="$2"; shift 2;;
    --metadata) meta="$2"; shift 2;;
    *) shift;;
  esac
done
case "$input" in
  *fail*) echo "cannot decode $input" >&2; exit 1;;
esac
echo "processed $kind" > "$out"
echo "{\"type\": \"$kind\", \"width\": 800}" > "$meta"
"#;

/// Writes a stub body instead of downloading.
struct FakeFetcher;

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn download(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        if url.contains("unreachable") {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: 503,
            });
        }
        let write_err = |source| DownloadError::Write {
            path: dest.display().to_string(),
            source,
        };
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(dest, b"source image").await.map_err(write_err)
    }

    async fn resolve_random(&self) -> String {
        RANDOM_URL.to_string()
    }
}

/// A running test application and the handles tests assert against.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub pipeline: Arc<Pipeline>,
    pub earthquake: Earthquake,
    /// Holds the data directory alive for the duration of the test.
    pub dir: TempDir,
}

impl TestApp {
    /// Wait until every submitted transform job has settled.
    pub async fn settle(&self) {
        self.pipeline.dispatcher().wait_idle().await;
    }
}

/// Build a test `ServerConfig` whose pipeline runs the fake tool under `dir`.
pub fn test_config(dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3001".to_string()],
        request_timeout_secs: 60,
        shutdown_timeout_secs: 30,
        pipeline: PipelineConfig {
            cli_program: "bash".to_string(),
            cli_path: dir.to_path_buf(),
            data_path: dir.to_path_buf(),
            cli_timeout: Duration::from_secs(10),
            min_time_secs: 0,
            ..PipelineConfig::default()
        },
    }
}

/// Build the full application router over a fresh in-memory store holding
/// one earthquake.
pub fn build_test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("create temp dir");
    std::fs::write(dir.path().join("process_image.py"), FAKE_TOOL).expect("write fake tool");
    let config = test_config(dir.path());

    let store = Arc::new(MemoryStore::new());
    let earthquake = store.insert_earthquake(CreateEarthquake {
        usgs_id: "us6000test".to_string(),
        place: "12 km W of Testville".to_string(),
        magnitude: 6.1,
        time: Utc::now(),
    });

    let pipeline = Arc::new(ImagePipelineService::new(
        store.clone(),
        store.clone(),
        Arc::new(FakeFetcher),
        CliTransformExecutor::new(config.pipeline.executor_config()),
        &config.pipeline,
    ));

    let state = AppState {
        pool: None,
        config: Arc::new(config.clone()),
        pipeline: Arc::clone(&pipeline),
    };

    TestApp {
        router: build_app_router(state),
        store,
        pipeline,
        earthquake,
        dir,
    }
}

/// Send a GET request.
pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Send a POST request without a body.
pub async fn post_empty(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Collect a response body as bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
