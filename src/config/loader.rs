//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "TEST_RUNNER";

/// Config file name in the working directory
const LOCAL_CONFIG_FILE: &str = "test_runner.toml";

/// Config file name under the user config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory under the user config directory
const APP_DIR: &str = "hil-test-runner";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "TEST_RUNNER_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `TEST_RUNNER_CONFIG` environment variable (explicit path)
    /// 2. `./test_runner.toml` (current directory)
    /// 3. `$XDG_CONFIG_HOME/hil-test-runner/config.toml` or `~/.config/...`
    ///    (`%APPDATA%\hil-test-runner\config.toml` on Windows)
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file, no overrides).
    pub fn with_defaults() -> Self {
        Self {
            config_path: None,
            config: Config::default(),
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Parse an override variable into `target` if it is set.
fn override_parsed<T: FromStr>(var: &str, what: &str, target: &mut T) -> ConfigResult<()> {
    if let Ok(val) = std::env::var(var) {
        *target = val
            .trim()
            .parse()
            .map_err(|_| ConfigError::env_parse(var, format!("Invalid {what}")))?;
    }
    Ok(())
}

/// Apply environment variable overrides to the configuration.
///
/// Variables follow the pattern `TEST_RUNNER_<SECTION>_<KEY>`, e.g.
/// `TEST_RUNNER_SERIAL_PORT_A=/dev/ttyUSB3`. The legacy `ESPPORT` variable
/// used by the firmware build also selects board A's port.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Ok(val) = std::env::var(format!("{ENV_PREFIX}_SERIAL_PORT_A"))
        .or_else(|_| std::env::var("ESPPORT"))
    {
        config.serial.port_a = val;
    }
    if let Ok(val) = std::env::var(format!("{ENV_PREFIX}_SERIAL_PORT_B")) {
        config.serial.port_b = val;
    }
    override_parsed(
        &format!("{ENV_PREFIX}_SERIAL_BAUD"),
        "baud rate",
        &mut config.serial.baud,
    )?;

    let timing = &mut config.timing;
    override_parsed(
        &format!("{ENV_PREFIX}_TIMING_SHORT_OUTPUT_TIMEOUT_MS"),
        "timeout",
        &mut timing.short_output_timeout_ms,
    )?;
    override_parsed(
        &format!("{ENV_PREFIX}_TIMING_TESTCASE_TIMEOUT_MS"),
        "timeout",
        &mut timing.testcase_timeout_ms,
    )?;
    override_parsed(
        &format!("{ENV_PREFIX}_TIMING_RESET_RETRIES"),
        "retry count",
        &mut timing.reset_retries,
    )?;

    if let Ok(val) = std::env::var(format!("{ENV_PREFIX}_LOGGING_LEVEL")) {
        config.logging.level = val;
    }

    Ok(())
}
