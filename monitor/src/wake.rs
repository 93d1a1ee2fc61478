use motion_watch_common::config::WakeConfig;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::info;

const WAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum WakeError {
    #[error("wake command is empty")]
    EmptyCommand,
    #[error("failed to spawn wake command '{0}': {1}")]
    Spawn(String, std::io::Error),
    #[error("wake command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },
    #[error("wake command timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug)]
pub enum WakeOutcome {
    Woke,
    /// Dry-run mode: logged instead of executed.
    DryRun,
    /// A wake was sent less than `min_interval` ago.
    RateLimited,
    Failed(WakeError),
}

/// Runs a screen-wake command (`xset dpms force on` by default) when motion
/// is seen, at most once per `min_interval`.
pub struct ScreenWaker {
    command: Vec<String>,
    min_interval: Duration,
    dry_run: bool,
    last_wake: Option<Instant>,
    wakes: u64,
}

impl ScreenWaker {
    pub fn from_config(config: &WakeConfig) -> Self {
        Self {
            command: config.command.clone(),
            min_interval: Duration::from_secs(config.min_interval_secs),
            dry_run: config.dry_run,
            last_wake: None,
            wakes: 0,
        }
    }

    /// Wakes sent (or logged, in dry-run mode) so far.
    pub fn wakes(&self) -> u64 {
        self.wakes
    }

    pub async fn on_motion(&mut self) -> WakeOutcome {
        let now = Instant::now();
        if let Some(last) = self.last_wake {
            if now.duration_since(last) <= self.min_interval {
                return WakeOutcome::RateLimited;
            }
        }
        // The window starts even if the command fails, so a broken display
        // does not get hammered every tick.
        self.last_wake = Some(now);
        self.wakes += 1;

        if self.dry_run {
            info!(command = self.command.join(" "), "dry run: would wake screen");
            return WakeOutcome::DryRun;
        }

        match self.run_command().await {
            Ok(()) => {
                info!(wakes = self.wakes, "screen woken");
                WakeOutcome::Woke
            }
            Err(e) => WakeOutcome::Failed(e),
        }
    }

    async fn run_command(&self) -> Result<(), WakeError> {
        let (program, args) = self.command.split_first().ok_or(WakeError::EmptyCommand)?;
        let run = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(WAKE_TIMEOUT, run)
            .await
            .map_err(|_| WakeError::Timeout(WAKE_TIMEOUT))?
            .map_err(|e| WakeError::Spawn(program.clone(), e))?;

        if !output.status.success() {
            return Err(WakeError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
