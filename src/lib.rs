//! Hardware-in-the-loop test runner library.
//!
//! Drives one board (or a pair) running an on-device test image over serial,
//! starts each enumerated test case, classifies the streamed output into a
//! verdict and tallies the run.
//!
//! # Modules
//!
//! - `port`: raw serial I/O, the scripted mock board, and line framing
//! - `model`: test case descriptors and severity-ranked results
//! - `environment`: reset handshake, enumeration and case launch for one board
//! - `monitor`: background classification of a running case
//! - `orchestrator`: pairs boards, cross-cancels, aggregates results
//! - `flash`: the external build/flash step
//! - `config`: TOML configuration with environment overrides
//! - `logging`: tracing subscriber setup
//! - `report`: JSON run report
//! - `error`: fatal run-level errors

pub mod config;
pub mod environment;
pub mod error;
pub mod flash;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod orchestrator;
pub mod port;
pub mod report;

pub use config::{Config, ConfigError, ConfigLoader, ConfigResult, TimingConfig};
pub use environment::{DeviceEnvironment, EnvState, PROMPT_MARKER, TESTRUNNER_BANNER};
pub use error::{RunnerError, RunnerResult};
pub use model::{CaseKind, Instance, TestCase, TestResult, TestStatus};
pub use monitor::TestMonitor;
pub use orchestrator::{Orchestrator, RunOptions, RunSummary};
pub use port::{LineTransport, MockSerialPort, PortError, SerialPortAdapter, SyncSerialPort};
pub use report::RunReport;
