use bytes::Bytes;
use motion_watch_common::config::CameraConfig;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::{CaptureError, FrameSource};

/// Takes a still by running a capture program (fswebcam-compatible flags)
/// that writes one JPEG to stdout.
pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            program: config.command.clone(),
            args: capture_args(config),
        }
    }
}

/// Arguments for a single silent JPEG capture to stdout.
fn capture_args(config: &CameraConfig) -> Vec<String> {
    let mut args = vec![
        "--no-banner".to_string(),
        "-r".to_string(),
        format!("{}x{}", config.width, config.height),
        "--jpeg".to_string(),
        config.quality.to_string(),
        "-S".to_string(),
        config.skip_frames.to_string(),
    ];
    if let Some(device) = &config.device {
        args.push("-d".to_string());
        args.push(device.clone());
    }
    if config.greyscale {
        args.push("--greyscale".to_string());
    }
    // "-" sends the image to stdout.
    args.push("-".to_string());
    args
}

impl FrameSource for CommandSource {
    async fn capture(&self) -> Result<Bytes, CaptureError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CaptureError::Spawn(self.program.clone(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::CommandFailed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!(
            program = self.program,
            bytes = output.stdout.len(),
            "captured still"
        );
        Ok(Bytes::from(output.stdout))
    }

    fn name(&self) -> &str {
        "command"
    }
}
