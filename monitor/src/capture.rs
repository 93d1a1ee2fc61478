use motion_watch_common::frame::{CapturedFrame, FrameError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::camera::{capture_with_timeout, CaptureError, FrameSource};
use crate::detector::{DetectorError, MotionDetector, MotionResult};
use crate::state::{Observation, ObservationStore};
use crate::wake::{ScreenWaker, WakeOutcome};

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Decode(#[from] FrameError),
    #[error("motion evaluation failed: {0}")]
    Detector(#[from] DetectorError),
    #[error("evaluation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug)]
pub enum CycleOutcome {
    Published(MotionResult),
    /// The cycle was abandoned and the published observation left as it was.
    Skipped(CycleError),
}

/// Drives acquire → decode → evaluate → publish once per tick.
///
/// Owns the detector. Only one cycle runs at a time because `run` awaits
/// each cycle before sleeping until the next tick.
pub struct CaptureLoop<S> {
    source: S,
    detector: Arc<Mutex<MotionDetector>>,
    store: ObservationStore,
    interval: Duration,
    capture_timeout: Duration,
    /// Failures in a row after which the baseline is considered stale.
    /// Zero keeps the baseline forever.
    reset_after_failures: u32,
    consecutive_failures: u32,
    seq: u64,
    waker: Option<ScreenWaker>,
}

impl<S: FrameSource> CaptureLoop<S> {
    pub fn new(
        source: S,
        detector: MotionDetector,
        store: ObservationStore,
        interval: Duration,
        capture_timeout: Duration,
    ) -> Self {
        Self {
            source,
            detector: Arc::new(Mutex::new(detector)),
            store,
            interval,
            capture_timeout,
            reset_after_failures: 0,
            consecutive_failures: 0,
            seq: 0,
            waker: None,
        }
    }

    pub fn reset_after_failures(mut self, failures: u32) -> Self {
        self.reset_after_failures = failures;
        self
    }

    pub fn with_waker(mut self, waker: ScreenWaker) -> Self {
        self.waker = Some(waker);
        self
    }

    /// Run forever. Ticks sit on a fixed grid starting now; grid points that
    /// pass while a cycle is still running are dropped, not queued or fired
    /// late.
    pub async fn run(mut self) {
        info!(
            source = self.source.name(),
            interval_ms = self.interval.as_millis() as u64,
            "capture loop started"
        );

        let mut deadline = Instant::now();
        loop {
            tokio::time::sleep_until(deadline).await;
            self.run_cycle().await;
            deadline = next_deadline(deadline, self.interval, Instant::now());
        }
    }

    pub async fn run_cycle(&mut self) -> CycleOutcome {
        match self.try_cycle().await {
            Ok(result) => {
                self.consecutive_failures = 0;
                if result.detected {
                    if let Some(waker) = self.waker.as_mut() {
                        match waker.on_motion().await {
                            WakeOutcome::Woke | WakeOutcome::DryRun => {
                                debug!(total = waker.wakes(), "screen wake sent")
                            }
                            WakeOutcome::RateLimited => {}
                            WakeOutcome::Failed(e) => warn!(error = %e, "failed to wake screen"),
                        }
                    }
                }
                CycleOutcome::Published(result)
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!(
                    error = %e,
                    consecutive_failures = self.consecutive_failures,
                    "capture cycle skipped, keeping last frame"
                );
                CycleOutcome::Skipped(e)
            }
        }
    }

    async fn try_cycle(&mut self) -> Result<MotionResult, CycleError> {
        let bytes = capture_with_timeout(&self.source, self.capture_timeout).await?;
        let frame = CapturedFrame::now(bytes, self.seq + 1);

        let stale_baseline = self.reset_after_failures > 0
            && self.consecutive_failures >= self.reset_after_failures;

        let detector = Arc::clone(&self.detector);
        let to_decode = frame.clone();
        let result = tokio::task::spawn_blocking(move || -> Result<MotionResult, CycleError> {
            let pixels = to_decode.decode()?;
            let mut detector = detector.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if stale_baseline && detector.has_baseline() {
                info!("camera recovered after repeated failures, restarting baseline");
                detector.reset();
            }
            Ok(detector.evaluate(&pixels)?)
        })
        .await??;

        self.seq = frame.seq;
        if self.seq % 100 == 0 {
            debug!(total = self.seq, "frames captured");
        }

        if result.detected {
            info!(
                seq = frame.seq,
                captured_at_ms = frame.captured_at_ms,
                changed = format!("{:.2}%", result.changed_ratio * 100.0),
                changed_pixels = result.changed_pixels,
                total_pixels = result.total_pixels,
                "motion detected"
            );
        } else {
            debug!(
                seq = frame.seq,
                captured_at_ms = frame.captured_at_ms,
                changed = format!("{:.2}%", result.changed_ratio * 100.0),
                "no motion"
            );
        }

        self.store.publish(Observation {
            frame: Some(frame),
            motion: result.detected,
        });
        Ok(result)
    }
}

/// First grid point `prev + k * period` (k >= 1) that is not already in the past.
fn next_deadline(prev: Instant, period: Duration, now: Instant) -> Instant {
    let late = now.saturating_duration_since(prev).as_nanos();
    let period_ns = period.as_nanos().max(1);
    let steps = late.div_ceil(period_ns).max(1);
    prev + period.saturating_mul(u32::try_from(steps).unwrap_or(u32::MAX))
}
