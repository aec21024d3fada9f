//! Configuration schema definitions.
//!
//! Every section is `#[serde(default)]`, so a config file only needs the keys
//! it wants to change.

use super::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial ports the boards are attached to
    pub serial: SerialConfig,
    /// Protocol timeouts and retry budgets
    pub timing: TimingConfig,
    /// External build/flash step
    pub flash: FlashConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values that would make the runner hang or never retry.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.serial.baud == 0 {
            return Err(ConfigError::validation("serial.baud", "must be non-zero"));
        }
        let timing = &self.timing;
        for (key, value) in [
            ("timing.short_output_timeout_ms", timing.short_output_timeout_ms),
            ("timing.testcase_timeout_ms", timing.testcase_timeout_ms),
            ("timing.poll_interval_ms", timing.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::validation(key, "must be non-zero"));
            }
        }
        if timing.reset_retries == 0 {
            return Err(ConfigError::validation(
                "timing.reset_retries",
                "at least one reset attempt is required",
            ));
        }
        if self.flash.command.trim().is_empty() {
            return Err(ConfigError::validation("flash.command", "must not be empty"));
        }
        Ok(())
    }
}

/// Serial port section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port of board A
    pub port_a: String,
    /// Port of board B (paired runs only)
    pub port_b: String,
    /// Baud rate of the test image console
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_a: "/dev/ttyUSB0".to_string(),
            port_b: "/dev/ttyUSB1".to_string(),
            baud: 115_200,
        }
    }
}

/// Protocol timing section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Quiet period that ends a line wait, and the monitor's per-read timeout
    pub short_output_timeout_ms: u64,
    /// Overall budget for one test case
    pub testcase_timeout_ms: u64,
    /// Reset attempts before the banner is declared missing
    pub reset_retries: u32,
    /// How long the reset line is held
    pub reset_pulse_ms: u64,
    /// Interval at which the orchestrator checks running monitors
    pub poll_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            short_output_timeout_ms: 250,
            testcase_timeout_ms: 60_000,
            reset_retries: 10,
            reset_pulse_ms: 50,
            poll_interval_ms: 100,
        }
    }
}

impl TimingConfig {
    pub fn short_output_timeout(&self) -> Duration {
        Duration::from_millis(self.short_output_timeout_ms)
    }

    pub fn testcase_timeout(&self) -> Duration {
        Duration::from_millis(self.testcase_timeout_ms)
    }

    pub fn reset_pulse(&self) -> Duration {
        Duration::from_millis(self.reset_pulse_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Build/flash step section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashConfig {
    /// Program to run
    pub command: String,
    /// Its arguments
    pub args: Vec<String>,
    /// Directory it runs in
    pub working_dir: PathBuf,
    /// Environment variable that receives the target port
    pub port_env: String,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            command: "make".to_string(),
            args: vec!["flash".to_string()],
            working_dir: PathBuf::from("."),
            port_env: "ESPPORT".to_string(),
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when `RUST_LOG` is unset and `--verbose` is off
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Multi-line format with colors
    Pretty,
    /// Compact format
    #[default]
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.serial.port_a, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud, 115_200);
        assert_eq!(config.timing.short_output_timeout(), Duration::from_millis(250));
        assert_eq!(config.timing.testcase_timeout(), Duration::from_secs(60));
        assert_eq!(config.timing.reset_retries, 10);
        assert_eq!(config.flash.args, vec!["flash"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialization() {
        let toml_str = r#"
            [serial]
            port_a = "/dev/cu.usbserial-1"

            [timing]
            testcase_timeout_ms = 5000
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.serial.port_a, "/dev/cu.usbserial-1");
        assert_eq!(config.serial.port_b, "/dev/ttyUSB1");
        assert_eq!(config.timing.testcase_timeout_ms, 5000);
        assert_eq!(config.timing.poll_interval_ms, 100);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut config = Config::default();
        config.timing.reset_retries = 0;
        match config.validate() {
            Err(ConfigError::ValidationError { key, .. }) => {
                assert_eq!(key, "timing.reset_retries")
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = Config::default();
        config.timing.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.serial.baud = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_format_names() {
        let config: LoggingConfig = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(config.format, LogFormat::Json);
    }
}
