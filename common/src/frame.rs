use bytes::Bytes;
use image::{ImageReader, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// A still captured from the camera, kept in its encoded (JPEG) form.
///
/// The encoded bytes are what viewers receive. Motion comparison works on the
/// decoded RGBA buffer produced by [`CapturedFrame::decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub jpeg: Bytes,
    pub captured_at_ms: i64,
    pub seq: u64,
}

impl CapturedFrame {
    pub fn new(jpeg: impl Into<Bytes>, captured_at_ms: i64, seq: u64) -> Self {
        Self {
            jpeg: jpeg.into(),
            captured_at_ms,
            seq,
        }
    }

    /// Stamp freshly captured bytes with the current wall-clock time.
    pub fn now(jpeg: impl Into<Bytes>, seq: u64) -> Self {
        Self::new(jpeg, chrono::Utc::now().timestamp_millis(), seq)
    }

    /// Decode into an RGBA pixel buffer. The format is sniffed from the bytes,
    /// so PNG or BMP stills from unusual cameras decode as well as JPEG.
    pub fn decode(&self) -> Result<RgbaImage, FrameError> {
        if self.jpeg.is_empty() {
            return Err(FrameError::Empty);
        }

        let img = ImageReader::new(Cursor::new(&self.jpeg[..]))
            .with_guessed_format()
            .map_err(|e| FrameError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| FrameError::Decode(e.to_string()))?;

        if img.width() == 0 || img.height() == 0 {
            return Err(FrameError::ZeroSized);
        }

        debug!(
            seq = self.seq,
            width = img.width(),
            height = img.height(),
            "decoded frame"
        );
        Ok(img.to_rgba8())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame payload is empty")]
    Empty,
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("decoded frame has zero width or height")]
    ZeroSized,
}
