pub mod pixel;

use image::RgbaImage;
use tracing::{debug, warn};

/// Outcome of comparing one frame against the previous one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionResult {
    pub detected: bool,
    /// Fraction of pixels that differ from the baseline, in `[0, 1]`.
    pub changed_ratio: f64,
    pub changed_pixels: u64,
    pub total_pixels: u64,
}

impl MotionResult {
    fn unchanged(total_pixels: u64) -> Self {
        Self {
            detected: false,
            changed_ratio: 0.0,
            changed_pixels: 0,
            total_pixels,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("frame has zero width or height")]
    EmptyFrame,
}

/// Frame-differencing motion detector.
///
/// Keeps exactly one baseline: the previous frame. Every evaluated frame
/// replaces it, so a change is always measured against the frame captured
/// one tick earlier. Slow drift that never moves more than `threshold` of
/// the picture between two ticks is not reported.
///
/// A frame whose dimensions differ from the baseline's (camera reconfigured,
/// resolution renegotiated) becomes the new baseline and reports no change.
pub struct MotionDetector {
    baseline: Option<RgbaImage>,
    threshold: f64,
    max_delta: f64,
}

impl MotionDetector {
    /// `threshold` is the changed-pixel ratio that must be exceeded to count
    /// as motion; `pixel_tolerance` (0..1) is how far two pixels may drift in
    /// colour before they count as changed.
    pub fn new(threshold: f64, pixel_tolerance: f64) -> Self {
        Self {
            baseline: None,
            threshold,
            max_delta: pixel::max_delta(pixel_tolerance),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// Forget the baseline. The next frame is treated as the first one.
    pub fn reset(&mut self) {
        debug!("resetting motion baseline");
        self.baseline = None;
    }

    pub fn evaluate(&mut self, frame: &RgbaImage) -> Result<MotionResult, DetectorError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectorError::EmptyFrame);
        }
        let total_pixels = u64::from(width) * u64::from(height);

        let result = match &self.baseline {
            None => {
                debug!(width, height, "first frame, storing baseline");
                MotionResult::unchanged(total_pixels)
            }
            Some(prev) if prev.dimensions() != frame.dimensions() => {
                warn!(
                    baseline = ?prev.dimensions(),
                    frame = ?frame.dimensions(),
                    "frame size changed, restarting from new baseline"
                );
                MotionResult::unchanged(total_pixels)
            }
            Some(prev) => {
                let changed_pixels = self.count_changed(prev, frame);
                let changed_ratio = changed_pixels as f64 / total_pixels as f64;
                MotionResult {
                    detected: changed_ratio > self.threshold,
                    changed_ratio,
                    changed_pixels,
                    total_pixels,
                }
            }
        };

        self.baseline = Some(frame.clone());
        Ok(result)
    }

    fn count_changed(&self, prev: &RgbaImage, next: &RgbaImage) -> u64 {
        if prev.as_raw() == next.as_raw() {
            return 0;
        }
        prev.pixels()
            .zip(next.pixels())
            .filter(|(a, b)| pixel::color_delta(a.0, b.0) > self.max_delta)
            .count() as u64
    }
}
