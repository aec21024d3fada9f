//! Building and flashing the test image.
//!
//! This is an opaque external step: the configured command (by default
//! `make flash`) runs with the target port in its environment and either
//! succeeds or fails the run.

use crate::config::FlashConfig;
use crate::error::{RunnerError, RunnerResult};
use std::process::{Command, Stdio};
use tracing::info;

/// The command that flashes the image onto `port`.
pub fn flash_command(port: &str, config: &FlashConfig) -> Command {
    let mut command = Command::new(&config.command);
    command
        .args(&config.args)
        .current_dir(&config.working_dir)
        .env(&config.port_env, port);
    command
}

/// Human-readable form used in logs and errors, e.g. `make flash ESPPORT=/dev/ttyUSB0`.
pub fn describe(port: &str, config: &FlashConfig) -> String {
    let mut parts = vec![config.command.clone()];
    parts.extend(config.args.iter().cloned());
    parts.push(format!("{}={}", config.port_env, port));
    parts.join(" ")
}

/// Build and flash the test image onto the board at `port`.
///
/// Tool output is shown only when `verbose` is set.
pub fn flash_image(port: &str, config: &FlashConfig, verbose: bool) -> RunnerResult<()> {
    let description = describe(port, config);
    info!("building and flashing test image: {description}");

    let mut command = flash_command(port, config);
    if !verbose {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    }

    let status = command.status().map_err(|source| RunnerError::FlashLaunch {
        command: description.clone(),
        source,
    })?;

    if !status.success() {
        return Err(RunnerError::Flash {
            command: description,
            code: status.code().unwrap_or(-1),
        });
    }
    info!(port, "flashing successful");
    Ok(())
}
