//! Configuration system using Figment.
//!
//! Strongly-typed settings loaded from:
//! 1. A TOML file (base configuration, `config/default.toml` by default)
//! 2. Environment variables (prefixed with `CELLSCOUT_`)
//!
//! # Environment Variable Overrides
//!
//! ```text
//! CELLSCOUT_SERIAL_PORT=/dev/ttyUSB2
//! CELLSCOUT_SERIAL_BAUD_RATE=115200
//! CELLSCOUT_LOGGING_LEVEL=debug
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cellscout::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("Port: {}", settings.serial.port);
//!     println!("Fast interval: {:?}", settings.intervals.fast);
//!     Ok(())
//! }
//! ```

use crate::commands::CommandGroups;
use crate::error::{AppResult, ScoutError};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Serial link to the modem.
    #[serde(default)]
    pub serial: SerialSettings,
    /// Command executor timing and retry bounds.
    #[serde(default)]
    pub executor: ExecutorSettings,
    /// Device identity verification.
    #[serde(default)]
    pub identity: IdentitySettings,
    /// Polling cadence intervals.
    #[serde(default)]
    pub intervals: IntervalSettings,
    /// Output locations for telemetry sinks and the transcript.
    #[serde(default)]
    pub output: OutputSettings,
    /// Optional gpsd position source.
    #[serde(default)]
    pub gpsd: GpsdSettings,
    /// Structured logging.
    #[serde(default)]
    pub logging: LoggingSettings,
    /// AT command vocabulary, organized into named groups.
    #[serde(default)]
    pub commands: CommandGroups,
}

/// Serial connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Serial device path (e.g. `/dev/ttyUSB0`, `COM3`).
    #[serde(default = "default_port")]
    pub port: String,
    /// Baud rate.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Read timeout for a single blocking read on the port.
    #[serde(with = "humantime_serde", default = "default_read_timeout")]
    pub read_timeout: Duration,
}

/// Executor timing and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorSettings {
    /// Settle delay after sending a command before reading its response,
    /// and the back-off between retry attempts.
    #[serde(with = "humantime_serde", default = "default_command_delay")]
    pub command_delay: Duration,
    /// Pause between drain passes while the response is still arriving.
    #[serde(with = "humantime_serde", default = "default_idle_gap")]
    pub idle_gap: Duration,
    /// Number of retries after a failed attempt (total attempts = retries + 1).
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
}

/// What to do when the connected device is not on the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityPolicy {
    /// Log a warning and continue with degraded confidence.
    Warn,
    /// Treat a mismatch as fatal for the session.
    Enforce,
}

/// Device identity verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySettings {
    /// Accepted manufacturer substrings (case-insensitive).
    #[serde(default = "default_manufacturers")]
    pub manufacturers: Vec<String>,
    /// Accepted model substrings (case-insensitive).
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    /// Mismatch policy.
    #[serde(default = "default_identity_policy")]
    pub policy: IdentityPolicy,
}

/// Polling cadence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalSettings {
    /// Fast command loop interval.
    #[serde(with = "humantime_serde", default = "default_fast_interval")]
    pub fast: Duration,
    /// Medium command loop interval.
    #[serde(with = "humantime_serde", default = "default_medium_interval")]
    pub medium: Duration,
    /// Slow command loop interval.
    #[serde(with = "humantime_serde", default = "default_slow_interval")]
    pub slow: Duration,
    /// Scheduler tick granularity.
    #[serde(with = "humantime_serde", default = "default_tick")]
    pub tick: Duration,
}

/// Output settings for the telemetry sinks and protocol transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Directory for all output files; created if missing.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Base filename for the sample CSV (prefixed with a session timestamp).
    #[serde(default = "default_sample_filename")]
    pub sample_filename: String,
    /// Base filename for the modem-info JSON document.
    #[serde(default = "default_modem_info_filename")]
    pub modem_info_filename: String,
    /// Base filename for the raw protocol transcript.
    #[serde(default = "default_transcript_filename")]
    pub transcript_filename: String,
}

/// Optional gpsd position source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsdSettings {
    /// Whether to query gpsd for positions at all.
    #[serde(default)]
    pub enabled: bool,
    /// gpsd host.
    #[serde(default = "default_gpsd_host")]
    pub host: String,
    /// gpsd TCP port.
    #[serde(default = "default_gpsd_port")]
    pub port: u16,
}

/// Structured logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout() -> Duration {
    Duration::from_millis(100)
}

fn default_command_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_idle_gap() -> Duration {
    Duration::from_millis(100)
}

fn default_retry_count() -> u32 {
    3
}

fn default_manufacturers() -> Vec<String> {
    vec!["Quectel".to_string()]
}

fn default_models() -> Vec<String> {
    vec!["EG25".to_string()]
}

fn default_identity_policy() -> IdentityPolicy {
    IdentityPolicy::Warn
}

fn default_fast_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_medium_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_slow_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_tick() -> Duration {
    Duration::from_secs(1)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_sample_filename() -> String {
    "cell_data.csv".to_string()
}

fn default_modem_info_filename() -> String {
    "modem_info.json".to_string()
}

fn default_transcript_filename() -> String {
    "transcript.log".to_string()
}

fn default_gpsd_host() -> String {
    "localhost".to_string()
}

fn default_gpsd_port() -> u16 {
    2947
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            read_timeout: default_read_timeout(),
        }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            command_delay: default_command_delay(),
            idle_gap: default_idle_gap(),
            retry_count: default_retry_count(),
        }
    }
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            manufacturers: default_manufacturers(),
            models: default_models(),
            policy: default_identity_policy(),
        }
    }
}

impl Default for IntervalSettings {
    fn default() -> Self {
        Self {
            fast: default_fast_interval(),
            medium: default_medium_interval(),
            slow: default_slow_interval(),
            tick: default_tick(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            sample_filename: default_sample_filename(),
            modem_info_filename: default_modem_info_filename(),
            transcript_filename: default_transcript_filename(),
        }
    }
}

impl Default for GpsdSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_gpsd_host(),
            port: default_gpsd_port(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default(),
            executor: ExecutorSettings::default(),
            identity: IdentitySettings::default(),
            intervals: IntervalSettings::default(),
            output: OutputSettings::default(),
            gpsd: GpsdSettings::default(),
            logging: LoggingSettings::default(),
            commands: CommandGroups::default(),
        }
    }
}

// ============================================================================
// Configuration Loading and Validation
// ============================================================================

impl Settings {
    /// Load configuration from `config/default.toml` and environment variables.
    ///
    /// Precedence (highest to lowest): environment variables
    /// (`CELLSCOUT_` prefix), then the TOML file. The file is optional; a
    /// missing file yields the built-in defaults. After loading, the
    /// configuration is validated.
    pub fn load() -> AppResult<Self> {
        Self::load_from("config/default.toml")
    }

    /// Load configuration from a specific TOML file path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("CELLSCOUT_").split("_"))
            .extract()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration after loading.
    ///
    /// Checks:
    /// - Log level is one of trace/debug/info/warn/error
    /// - Serial port path and baud rate are non-degenerate
    /// - Intervals and tick are non-zero
    /// - Identity allow-lists are non-empty when policy is `enforce`
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ScoutError::Configuration(format!(
                "Invalid logging level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        if self.serial.port.is_empty() {
            return Err(ScoutError::Configuration(
                "'serial.port' cannot be empty".to_string(),
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(ScoutError::Configuration(
                "'serial.baud_rate' must be > 0".to_string(),
            ));
        }

        if self.intervals.tick.is_zero() {
            return Err(ScoutError::Configuration(
                "'intervals.tick' must be > 0".to_string(),
            ));
        }
        for (name, interval) in [
            ("fast", self.intervals.fast),
            ("medium", self.intervals.medium),
            ("slow", self.intervals.slow),
        ] {
            if interval.is_zero() {
                return Err(ScoutError::Configuration(format!(
                    "'intervals.{name}' must be > 0"
                )));
            }
        }

        if self.identity.policy == IdentityPolicy::Enforce
            && (self.identity.manufacturers.is_empty() || self.identity.models.is_empty())
        {
            return Err(ScoutError::Configuration(
                "identity policy 'enforce' requires non-empty manufacturer and model lists"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.serial.baud_rate, 115_200);
        assert_eq!(settings.executor.retry_count, 3);
        assert_eq!(settings.intervals.fast, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut settings = Settings::default();
        settings.logging.level = "verbose".to_string();
        let result = settings.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Invalid logging level"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut settings = Settings::default();
        settings.intervals.medium = Duration::ZERO;
        let result = settings.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("intervals.medium"));
    }

    #[test]
    fn test_enforce_requires_allow_lists() {
        let mut settings = Settings::default();
        settings.identity.policy = IdentityPolicy::Enforce;
        settings.identity.models.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
[serial]
port = "/dev/ttyUSB3"
baud_rate = 9600

[identity]
policy = "enforce"

[intervals]
fast = "2s"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.serial.port, "/dev/ttyUSB3");
        assert_eq!(settings.serial.baud_rate, 9600);
        assert_eq!(settings.identity.policy, IdentityPolicy::Enforce);
        assert_eq!(settings.intervals.fast, Duration::from_secs(2));
        // Unspecified sections fall back to defaults.
        assert_eq!(settings.intervals.medium, Duration::from_secs(30));
    }
}
