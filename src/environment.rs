//! Host-side proxy for one board running the test image.
//!
//! Every operation starts from a fresh reset, so a board left in any state by
//! the previous case is usable again. The reset is bounded by the retry budget
//! in [`TimingConfig`].

use crate::config::TimingConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::model::{Instance, TestCase};
use crate::monitor::TestMonitor;
use crate::port::{LineTransport, PortConfiguration, SyncSerialPort};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// First line the test image prints after boot.
pub const TESTRUNNER_BANNER: &str = "esp-open-rtos test runner.";

/// Start of the line the image prints while waiting for a command.
pub const PROMPT_MARKER: &str = ">";

/// Where an environment is in its reset/run cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvState {
    /// Port open, board not yet reset.
    Disconnected,
    Resetting,
    /// Board is at its banner or prompt.
    Ready,
    /// A case has been started and a monitor is reading the port.
    Running,
}

/// One board and the serial link to it.
#[derive(Debug)]
pub struct DeviceEnvironment {
    instance: Instance,
    port_name: String,
    transport: Arc<Mutex<LineTransport>>,
    timing: TimingConfig,
    state: EnvState,
    /// Monitor of the case started last; it owns the transport until done.
    active: Option<TestMonitor>,
}

impl DeviceEnvironment {
    /// Open `port_name` at `baud` and wrap it.
    pub fn open(
        port_name: &str,
        baud: u32,
        instance: Instance,
        timing: TimingConfig,
    ) -> RunnerResult<Self> {
        let port = SyncSerialPort::open(port_name, PortConfiguration::with_baud(baud))?;
        info!(%instance, port = port_name, baud, "opened serial port");
        Ok(Self::new(LineTransport::new(port), instance, timing))
    }

    pub fn new(transport: LineTransport, instance: Instance, timing: TimingConfig) -> Self {
        let transport = transport.with_reset_pulse(timing.reset_pulse());
        Self {
            instance,
            port_name: transport.name().to_string(),
            transport: Arc::new(Mutex::new(transport)),
            timing,
            state: EnvState::Disconnected,
            active: None,
        }
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// A running case reports `Ready` again once its monitor has a verdict.
    pub fn state(&self) -> EnvState {
        match &self.active {
            Some(monitor) if self.state == EnvState::Running && monitor.is_done() => {
                EnvState::Ready
            }
            _ => self.state,
        }
    }

    /// Reboot the board and wait for the test runner banner.
    pub fn reset(&mut self) -> RunnerResult<()> {
        self.state = EnvState::Resetting;
        self.active = None;
        let mut transport = self.transport.lock();
        let attempts = self.timing.reset_retries;

        for attempt in 1..=attempts {
            transport.pulse_reset()?;
            debug!(instance = %self.instance, attempt, "waiting for test runner startup");
            let banner = transport.wait_line(self.timing.short_output_timeout(), |line| {
                (line == TESTRUNNER_BANNER).then_some(())
            })?;
            if banner.is_some() {
                self.state = EnvState::Ready;
                return Ok(());
            }
            debug!(instance = %self.instance, attempt, "retrying board reset");
        }

        Err(RunnerError::ResetFailed {
            port: self.port_name.clone(),
            attempts,
        })
    }

    /// Reset the board and collect the cases it enumerates.
    pub fn get_testlist(&mut self) -> RunnerResult<Vec<TestCase>> {
        self.reset()?;
        debug!(instance = %self.instance, "enumerating tests");

        let mut cases = Vec::new();
        let mut transport = self.transport.lock();
        let prompt = transport.wait_line(self.timing.short_output_timeout(), |line| {
            if line.starts_with(PROMPT_MARKER) {
                return Some(());
            }
            if let Some(case) = TestCase::parse_record(line) {
                debug!(instance = %self.instance, "found {case}");
                cases.push(case);
            }
            None
        })?;

        if prompt.is_none() {
            return Err(RunnerError::TestListUnavailable {
                port: self.port_name.clone(),
            });
        }
        info!(port = %self.port_name, count = cases.len(), "enumerated test cases");
        Ok(cases)
    }

    /// Reset the board, start `case` in this board's role and return the
    /// monitor watching it.
    ///
    /// Only the reset and prompt handshake block; the case itself runs in the
    /// background.
    pub fn start_testcase(&mut self, case: &TestCase) -> RunnerResult<TestMonitor> {
        self.reset()?;
        {
            let mut transport = self.transport.lock();
            let prompt = transport.wait_line(self.timing.short_output_timeout(), |line| {
                line.starts_with(PROMPT_MARKER).then_some(())
            })?;
            if prompt.is_none() {
                return Err(RunnerError::PromptUnavailable {
                    port: self.port_name.clone(),
                });
            }

            let command = self.instance.command(case.index());
            debug!(instance = %self.instance, command = command.trim_end(), "starting {case}");
            transport.write(command.as_bytes())?;
        }

        let monitor = TestMonitor::spawn(Arc::clone(&self.transport), self.instance, &self.timing)?;
        self.state = EnvState::Running;
        self.active = Some(monitor.clone());
        Ok(monitor)
    }
}
