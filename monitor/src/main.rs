mod camera;
mod capture;
mod detector;
mod server;
mod state;
mod wake;

use capture::CaptureLoop;
use detector::MotionDetector;
use motion_watch_common::config::Config;
use server::AppState;
use state::ObservationStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use wake::ScreenWaker;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    let source = match camera::build_source(&config.camera) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to set up camera source");
            std::process::exit(1);
        }
    };

    let detector = MotionDetector::new(config.detector.threshold, config.detector.pixel_tolerance);
    info!(
        source = config.camera.source,
        device = config.camera.device.as_deref().unwrap_or("default"),
        threshold = format!("{:.2}%", detector.threshold() * 100.0),
        pixel_tolerance = config.detector.pixel_tolerance,
        interval_ms = config.capture.interval_ms,
        "starting motion detection"
    );

    let store = ObservationStore::new();
    let mut capture_loop = CaptureLoop::new(
        source,
        detector,
        store.clone(),
        Duration::from_millis(config.capture.interval_ms),
        Duration::from_millis(config.camera.timeout_ms),
    )
    .reset_after_failures(config.capture.reset_after_failures);

    if config.wake.enabled {
        info!(
            command = config.wake.command.join(" "),
            min_interval_secs = config.wake.min_interval_secs,
            dry_run = config.wake.dry_run,
            "screen wake on motion enabled"
        );
        capture_loop = capture_loop.with_waker(ScreenWaker::from_config(&config.wake));
    }

    if config.server.enabled {
        let state = Arc::new(AppState {
            store,
            capture_interval_ms: config.capture.interval_ms,
        });
        let addr = format!("{}:{}", config.server.bind, config.server.port);
        info!(url = format!("http://localhost:{}", config.server.port), "starting video server");
        tokio::spawn(async move {
            if let Err(e) = server::serve(&addr, state).await {
                error!(error = %e, "video server stopped");
                std::process::exit(1);
            }
        });
    }

    capture_loop.run().await;
}
