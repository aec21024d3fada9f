//! Configuration module for the test runner.
//!
//! TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `--config PATH` on the command line
//! 2. `TEST_RUNNER_CONFIG` environment variable (explicit path)
//! 3. `./test_runner.toml` (current directory)
//! 4. `~/.config/hil-test-runner/config.toml` (XDG on Linux/macOS)
//! 5. `%APPDATA%\hil-test-runner\config.toml` (Windows)
//! 6. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is `TEST_RUNNER_<SECTION>_<KEY>`:
//! - `TEST_RUNNER_SERIAL_PORT_A=/dev/ttyUSB2`
//! - `TEST_RUNNER_TIMING_TESTCASE_TIMEOUT_MS=120000`
//! - `TEST_RUNNER_LOGGING_LEVEL=debug`
//!
//! The firmware build's `ESPPORT` is honored for board A as well.
//!
//! # Example
//!
//! ```toml
//! [serial]
//! port_a = "/dev/ttyUSB0"
//! port_b = "/dev/ttyUSB1"
//! baud = 115200
//!
//! [timing]
//! testcase_timeout_ms = 60000
//! reset_retries = 10
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{resolve_config_path, ConfigLoader};
pub use schema::{Config, FlashConfig, LogFormat, LoggingConfig, SerialConfig, TimingConfig};
