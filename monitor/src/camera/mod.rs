mod command;
mod http;

pub use command::CommandSource;
pub use http::HttpSource;

use bytes::Bytes;
use motion_watch_common::config::CameraConfig;
use std::future::Future;
use std::time::Duration;

/// Something that can hand over one encoded still image on demand.
pub trait FrameSource: Send + Sync {
    /// Acquire a single still. Implementations return the encoded bytes untouched.
    fn capture(&self) -> impl Future<Output = Result<Bytes, CaptureError>> + Send;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to spawn capture command '{0}': {1}")]
    Spawn(String, std::io::Error),
    #[error("capture command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("camera returned an empty image")]
    EmptyImage,
    #[error("capture timed out after {0:?}")]
    Timeout(Duration),
}

/// Camera backend selected from `[camera] source`.
pub enum CameraSource {
    Command(CommandSource),
    Http(HttpSource),
}

impl FrameSource for CameraSource {
    async fn capture(&self) -> Result<Bytes, CaptureError> {
        match self {
            CameraSource::Command(source) => source.capture().await,
            CameraSource::Http(source) => source.capture().await,
        }
    }

    fn name(&self) -> &str {
        match self {
            CameraSource::Command(source) => source.name(),
            CameraSource::Http(source) => source.name(),
        }
    }
}

/// Build the configured camera backend. The config is validated beforehand,
/// so an `http` source always has a URL here.
pub fn build_source(config: &CameraConfig) -> Result<CameraSource, CaptureError> {
    match (config.source.as_str(), config.url.as_deref()) {
        ("http", Some(url)) => Ok(CameraSource::Http(HttpSource::new(url)?)),
        _ => Ok(CameraSource::Command(CommandSource::from_config(config))),
    }
}

/// Acquire one frame, treating an overrun of `limit` as a capture failure.
pub async fn capture_with_timeout<S: FrameSource>(
    source: &S,
    limit: Duration,
) -> Result<Bytes, CaptureError> {
    let bytes = tokio::time::timeout(limit, source.capture())
        .await
        .map_err(|_| CaptureError::Timeout(limit))??;
    if bytes.is_empty() {
        return Err(CaptureError::EmptyImage);
    }
    Ok(bytes)
}
