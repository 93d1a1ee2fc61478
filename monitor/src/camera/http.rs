use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

use super::{CaptureError, FrameSource};

/// Fetches stills from a network camera's snapshot endpoint.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: &str) -> Result<Self, CaptureError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl FrameSource for HttpSource {
    async fn capture(&self) -> Result<Bytes, CaptureError> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(CaptureError::HttpStatus(resp.status().as_u16()));
        }
        let bytes = resp.bytes().await?;
        debug!(url = self.url, bytes = bytes.len(), "fetched snapshot");
        Ok(bytes)
    }

    fn name(&self) -> &str {
        "http"
    }
}
