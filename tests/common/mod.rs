//! Shared test utilities for the runner's integration tests.
//!
//! This module provides:
//! - Scripted boards built on `MockSerialPort`
//! - Boot output builders for a given case list
//! - Fast timing so timeouts resolve in milliseconds

#![allow(dead_code)]

use hil_test_runner::config::TimingConfig;
use hil_test_runner::orchestrator::{Orchestrator, RunOptions};
use hil_test_runner::port::{LineTransport, MockSerialPort};
use hil_test_runner::{DeviceEnvironment, Instance, TESTRUNNER_BANNER};
use std::time::Duration;

/// Timing small enough that a silent board times out quickly.
///
/// `testcase_timeout_ms` bounds how long a case that never finishes can run.
pub fn fast_timing(testcase_timeout_ms: u64) -> TimingConfig {
    TimingConfig {
        short_output_timeout_ms: 40,
        testcase_timeout_ms,
        reset_retries: 3,
        reset_pulse_ms: 1,
        poll_interval_ms: 5,
    }
}

/// What the test image prints after a reset, ending at the `> ` prompt.
///
/// # Arguments
/// * `cases` - `(name, kind)` pairs, numbered in order
pub fn boot_output(cases: &[(&str, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b" ets Jan  8 2013,rst cause:2, boot mode:(3,6)\r\n\r\n");
    out.extend_from_slice(TESTRUNNER_BANNER.as_bytes());
    out.extend_from_slice(format!("\n{} test cases are defined:\n\n", cases.len()).as_bytes());
    for (i, (name, kind)) in cases.iter().enumerate() {
        out.extend_from_slice(format!("CASE {i} = {name} {kind}\n").as_bytes());
    }
    out.extend_from_slice(b"Enter A or B then number of test case to run, ie A0.\n> ");
    out
}

/// A board that boots into `cases` on every reset.
pub fn scripted_board(name: &str, cases: &[(&str, &str)]) -> MockSerialPort {
    let mock = MockSerialPort::new(name);
    mock.on_every_reset(&boot_output(cases));
    mock
}

pub fn environment(mock: &MockSerialPort, instance: Instance, timing: TimingConfig) -> DeviceEnvironment {
    DeviceEnvironment::new(LineTransport::new(mock.clone()), instance, timing)
}

/// Orchestrator writing its progress into a buffer.
pub fn orchestrator(
    board_a: &MockSerialPort,
    board_b: Option<&MockSerialPort>,
    timing: TimingConfig,
    verbose: bool,
) -> Orchestrator<Vec<u8>> {
    let env_a = environment(board_a, Instance::A, timing);
    let env_b = board_b.map(|mock| environment(mock, Instance::B, timing));
    Orchestrator::new(env_a, env_b, RunOptions::new(&timing, verbose), Vec::new())
}

/// The case start command for `instance`, as written to the board.
pub fn command(instance: Instance, index: u32) -> Vec<u8> {
    instance.command(index).into_bytes()
}

/// Generous upper bound for anything that should finish "immediately".
pub const PROMPT_LIMIT: Duration = Duration::from_secs(2);
