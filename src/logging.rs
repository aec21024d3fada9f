//! Tracing subscriber setup for the binary.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{RunnerError, RunnerResult};
use tracing_subscriber::EnvFilter;

/// Level directive in effect when `RUST_LOG` is not set.
pub fn default_directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else {
        config.level.clone()
    }
}

/// Install the global subscriber. Logs go to stderr so progress output on
/// stdout stays clean.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> RunnerResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(config, verbose)))
        .map_err(|e| RunnerError::Logging(e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    installed.map_err(|e| RunnerError::Logging(e.to_string()))
}
