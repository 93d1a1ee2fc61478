use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub wake: WakeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    /// Where frames come from: "command" (local capture program) or "http" (snapshot URL).
    #[serde(default = "default_source")]
    pub source: String,
    /// Device selector passed to the capture program. `None` uses the system default camera.
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_quality")]
    pub quality: u32,
    /// Frames the camera discards before the still is taken, so exposure can settle.
    #[serde(default = "default_skip_frames")]
    pub skip_frames: u32,
    #[serde(default = "default_greyscale")]
    pub greyscale: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Fraction of changed pixels above which a frame counts as motion.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Per-pixel colour distance tolerance (0..1). Smaller is more sensitive.
    #[serde(default = "default_pixel_tolerance")]
    pub pixel_tolerance: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Consecutive failed cycles after which the motion baseline is dropped,
    /// so the first frame after an outage is not compared to a stale one.
    /// Zero disables the reset.
    #[serde(default = "default_reset_after_failures")]
    pub reset_after_failures: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Serve the live view. Off by default; the detector runs headless.
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Screen wake-up on motion.
#[derive(Debug, Clone, Deserialize)]
pub struct WakeConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Program and arguments run when motion is detected.
    #[serde(default = "default_wake_command")]
    pub command: Vec<String>,
    /// Minimum seconds between two wakes.
    #[serde(default = "default_wake_min_interval_secs")]
    pub min_interval_secs: u64,
    /// Log the wake instead of running the command.
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            device: None,
            command: default_command(),
            url: None,
            width: default_width(),
            height: default_height(),
            quality: default_quality(),
            skip_frames: default_skip_frames(),
            greyscale: default_greyscale(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            pixel_tolerance: default_pixel_tolerance(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            reset_after_failures: default_reset_after_failures(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_server_enabled(),
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_wake_command(),
            min_interval_secs: default_wake_min_interval_secs(),
            dry_run: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.detector.threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "detector.threshold must be in (0, 1), got {threshold}"
            )));
        }
        let tolerance = self.detector.pixel_tolerance;
        if !(0.0..=1.0).contains(&tolerance) {
            return Err(ConfigError::Invalid(format!(
                "detector.pixel_tolerance must be in [0, 1], got {tolerance}"
            )));
        }
        if self.capture.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "capture.interval_ms must be positive".into(),
            ));
        }
        if self.camera.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "camera.timeout_ms must be positive".into(),
            ));
        }
        if self.wake.enabled && self.wake.command.is_empty() {
            return Err(ConfigError::Invalid(
                "wake.command must not be empty when wake.enabled = true".into(),
            ));
        }
        match self.camera.source.as_str() {
            "command" => {}
            "http" if self.camera.url.is_some() => {}
            "http" => {
                return Err(ConfigError::Invalid(
                    "camera.url is required when camera.source = \"http\"".into(),
                ))
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown camera.source '{other}', expected 'command' or 'http'"
                )))
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_source() -> String {
    "command".into()
}
fn default_command() -> String {
    "fswebcam".into()
}
fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    480
}
fn default_quality() -> u32 {
    80
}
fn default_skip_frames() -> u32 {
    19
}
fn default_greyscale() -> bool {
    true
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_threshold() -> f64 {
    0.02
}
fn default_pixel_tolerance() -> f64 {
    0.1
}
fn default_interval_ms() -> u64 {
    1000
}
fn default_reset_after_failures() -> u32 {
    0
}
fn default_server_enabled() -> bool {
    false
}
fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3000
}
fn default_wake_command() -> Vec<String> {
    vec!["xset".into(), "dpms".into(), "force".into(), "on".into()]
}
fn default_wake_min_interval_secs() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.camera.source, "command");
        assert!(config.camera.device.is_none());
        assert_eq!(config.detector.threshold, 0.02);
        assert_eq!(config.detector.pixel_tolerance, 0.1);
        assert_eq!(config.capture.interval_ms, 1000);
        assert_eq!(config.capture.reset_after_failures, 0);
        assert!(!config.server.enabled);
        assert_eq!(config.server.port, 3000);
        assert!(!config.wake.enabled);
        assert_eq!(config.wake.command, ["xset", "dpms", "force", "on"]);
        assert_eq!(config.wake.min_interval_secs, 10);
        assert!(!config.wake.dry_run);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [camera]
            device = "/dev/video2"

            [detector]
            threshold = 0.05

            [server]
            enabled = true
            port = 8080

            [wake]
            enabled = true
            dry_run = true
            "#,
        )
        .unwrap();
        assert_eq!(config.camera.device.as_deref(), Some("/dev/video2"));
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.detector.threshold, 0.05);
        assert_eq!(config.detector.pixel_tolerance, 0.1);
        assert!(config.server.enabled);
        assert_eq!(config.server.port, 8080);
        assert!(config.wake.dry_run);
        assert_eq!(config.wake.min_interval_secs, 10);
    }

    #[test]
    fn enabled_wake_needs_a_command() {
        assert!(matches!(
            Config::parse("[wake]\nenabled = true\ncommand = []\n"),
            Err(ConfigError::Invalid(_))
        ));
        // An empty command is fine while wake-up is off.
        assert!(Config::parse("[wake]\ncommand = []\n").is_ok());
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        for bad in ["0.0", "1.0", "-0.5", "1.5"] {
            let doc = format!("[detector]\nthreshold = {bad}\n");
            assert!(
                matches!(Config::parse(&doc), Err(ConfigError::Invalid(_))),
                "threshold {bad} should be rejected"
            );
        }
    }

    #[test]
    fn zero_interval_rejected() {
        let result = Config::parse("[capture]\ninterval_ms = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn http_source_requires_url() {
        assert!(matches!(
            Config::parse("[camera]\nsource = \"http\"\n"),
            Err(ConfigError::Invalid(_))
        ));
        let config =
            Config::parse("[camera]\nsource = \"http\"\nurl = \"http://cam.local/frame\"\n")
                .unwrap();
        assert_eq!(config.camera.url.as_deref(), Some("http://cam.local/frame"));
    }

    #[test]
    fn unknown_source_rejected() {
        assert!(matches!(
            Config::parse("[camera]\nsource = \"v4l2\"\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            Config::parse("[detector\nthreshold = "),
            Err(ConfigError::Parse(_))
        ));
    }
}
