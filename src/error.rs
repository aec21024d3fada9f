//! Fatal, run-level errors.
//!
//! Per-case outcomes (failures, crashes, timeouts) are never errors; they are
//! recorded as [`TestResult`](crate::model::TestResult)s. Everything in here
//! aborts the run with exit code 2.

use crate::config::ConfigError;
use crate::model::{Instance, TestCase};
use crate::port::PortError;
use std::path::PathBuf;
use thiserror::Error;

/// Specialized `Result` for orchestration operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that stop the whole run.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The board never printed the test runner banner after being reset.
    #[error("Port {port} failed to present test runner banner after {attempts} reset attempts")]
    ResetFailed { port: String, attempts: u32 },

    /// The enumeration never reached the command prompt.
    #[error("Port {port} failed to read test list")]
    TestListUnavailable { port: String },

    /// The board did not return to its prompt before a case could be started.
    #[error("Port {port} failed to read test runner prompt")]
    PromptUnavailable { port: String },

    /// Paired boards run different test images.
    #[error("Test cases on units A & B don't match")]
    CaseListMismatch { a: Vec<TestCase>, b: Vec<TestCase> },

    /// The external flash step ran and failed.
    #[error("'{command}' failed with exit code {code}")]
    Flash { command: String, code: i32 },

    /// The external flash step could not be started.
    #[error("Failed to launch '{command}': {source}")]
    FlashLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The thread watching a running case could not be started.
    #[error("Failed to start monitor for unit {instance}: {source}")]
    MonitorSpawn {
        instance: Instance,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The JSON report could not be written.
    #[error("Failed to write report '{path}': {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode report: {0}")]
    ReportEncoding(#[from] serde_json::Error),

    /// Progress output could not be written.
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

impl RunnerError {
    /// Process exit code for any fatal orchestration error.
    pub const EXIT_CODE: u8 = 2;

    /// True for errors caused by a board not following the serial protocol.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::ResetFailed { .. } | Self::TestListUnavailable { .. } | Self::PromptUnavailable { .. }
        )
    }
}
