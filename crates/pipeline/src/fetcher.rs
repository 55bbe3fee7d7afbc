//! Source image fetching.
//!
//! `process-all-images` downloads the remote source once so the three
//! transform jobs read the same local file. Original images without a
//! caller-supplied URL are resolved against the placeholder image service.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

/// Placeholder service used when no original image URL is supplied.
pub const RANDOM_IMAGE_URL: &str = "https://picsum.photos/800/600";

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// Errors from downloading a source image.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The request could not be sent or its body could not be read.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body could not be written to disk.
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Downloads source images and resolves placeholder URLs.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Download `url` into `dest`, creating parent directories as needed.
    async fn download(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;

    /// A concrete image URL from the placeholder service.
    ///
    /// Never fails: falls back to [`RANDOM_IMAGE_URL`] itself.
    async fn resolve_random(&self) -> String;
}

/// [`SourceFetcher`] over HTTP using `reqwest`.
pub struct HttpSourceFetcher {
    client: reqwest::Client,
}

impl HttpSourceFetcher {
    /// Build a fetcher whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn download(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let request_err = |source| DownloadError::Request {
            url: url.to_string(),
            source,
        };
        let write_err = |source| DownloadError::Write {
            path: dest.display().to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(request_err)?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(dest, &bytes).await.map_err(write_err)?;

        tracing::info!(
            url,
            dest = %dest.display(),
            bytes = bytes.len(),
            "Downloaded source image",
        );
        Ok(())
    }

    async fn resolve_random(&self) -> String {
        match self.client.head(RANDOM_IMAGE_URL).send().await {
            Ok(response) => response.url().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve random image, using service URL");
                RANDOM_IMAGE_URL.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    use super::*;

    /// Serve `router` on an ephemeral port, returning its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fetcher() -> HttpSourceFetcher {
        HttpSourceFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn download_writes_body_and_creates_directories() {
        let base = serve(Router::new().route("/quake.jpg", get(|| async { "jpeg-bytes" }))).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("downloads/1_source.jpg");

        fetcher()
            .download(&format!("{base}/quake.jpg"), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(dest).unwrap(), "jpeg-bytes");
    }

    #[tokio::test]
    async fn non_success_status_is_download_error() {
        let base = serve(Router::new().route(
            "/missing.jpg",
            get(|| async { (StatusCode::NOT_FOUND, "gone") }),
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing.jpg");

        let result = fetcher()
            .download(&format!("{base}/missing.jpg"), &dest)
            .await;

        assert_matches!(result, Err(DownloadError::Status { status: 404, .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn unreachable_host_is_request_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = fetcher()
            .download("http://127.0.0.1:1/quake.jpg", &dir.path().join("q.jpg"))
            .await;

        assert_matches!(result, Err(DownloadError::Request { .. }));
    }
}
