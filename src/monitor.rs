//! Background classification of a running test case.
//!
//! A [`TestMonitor`] owns a thread that reads the board's output line by line
//! until it sees a verdict, is cancelled, or runs out of time. The
//! orchestrator never joins that thread; it polls [`TestMonitor::get_result`].

use crate::config::TimingConfig;
use crate::environment::TESTRUNNER_BANNER;
use crate::error::{RunnerError, RunnerResult};
use crate::model::{Instance, TestResult};
use crate::port::LineTransport;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const CRASH_MESSAGE: &str = "Test caused crash and reset";
pub const TIMED_OUT_MESSAGE: &str = "Test timed out";
pub const CANCELLED_MESSAGE: &str = "Cancelled";

/// Classify one raw line of test output, terminator included.
///
/// Returns `None` for ordinary log output.
pub fn classify_line(raw: &str) -> Option<TestResult> {
    let terminated = raw
        .strip_suffix('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line));

    if terminated.is_some_and(|line| line.ends_with(":PASS")) {
        Some(TestResult::passed())
    } else if raw.contains(":FAIL:") {
        Some(TestResult::failed(raw.trim_end_matches(['\r', '\n'])))
    } else if raw.trim_end_matches(['\r', '\n']) == TESTRUNNER_BANNER {
        Some(TestResult::error(CRASH_MESSAGE))
    } else {
        None
    }
}

#[derive(Debug, Default)]
struct MonitorShared {
    cancelled: AtomicBool,
    result: OnceCell<TestResult>,
    output: Mutex<String>,
}

/// Handle to one monitored (case, device) execution.
///
/// Clones share the same worker: cancelling one cancels all.
#[derive(Debug, Clone)]
pub struct TestMonitor {
    instance: Instance,
    shared: Arc<MonitorShared>,
}

impl TestMonitor {
    /// Start monitoring `transport` on a new thread.
    ///
    /// The thread holds the transport lock until it reaches a verdict, so the
    /// environment cannot issue another command while a case is running.
    pub fn spawn(
        transport: Arc<Mutex<LineTransport>>,
        instance: Instance,
        timing: &TimingConfig,
    ) -> RunnerResult<Self> {
        let shared = Arc::new(MonitorShared::default());
        let read_timeout = timing.short_output_timeout();
        let budget = timing.testcase_timeout();

        let worker = Arc::clone(&shared);
        thread::Builder::new()
            .name(format!("monitor-{instance}"))
            .spawn(move || {
                let result = watch(&transport, instance, &worker, read_timeout, budget);
                debug!(%instance, status = %result.status(), "test case finished");
                // Only this thread ever sets the result.
                let _ = worker.result.set(result);
            })
            .map_err(|source| RunnerError::MonitorSpawn { instance, source })?;

        Ok(Self { instance, shared })
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    /// Ask the monitor to stop. Repeated calls have no further effect.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// The verdict, or `None` while the case is still running.
    pub fn get_result(&self) -> Option<TestResult> {
        self.shared.result.get().cloned()
    }

    pub fn is_done(&self) -> bool {
        self.shared.result.get().is_some()
    }

    /// Everything the board printed so far, one timestamped line per entry.
    pub fn output(&self) -> String {
        self.shared.output.lock().clone()
    }
}

fn watch(
    transport: &Mutex<LineTransport>,
    instance: Instance,
    shared: &MonitorShared,
    read_timeout: Duration,
    budget: Duration,
) -> TestResult {
    let mut guard = transport.lock();
    let mut port = guard.override_timeout(Some(read_timeout));
    let started = Instant::now();

    while !shared.cancelled.load(Ordering::Acquire) && started.elapsed() < budget {
        let raw = match port.read_line() {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(e) => {
                warn!(%instance, port = port.name(), "read failed mid-test: {e}");
                return TestResult::error(format!("Serial port error: {e}"));
            }
        };
        let line = String::from_utf8_lossy(&raw);

        {
            let mut output = shared.output.lock();
            output.push_str(&format!(
                "{instance}+{:4.2}s {line}",
                started.elapsed().as_secs_f64()
            ));
            if !line.ends_with('\n') {
                output.push('\n');
            }
        }
        debug!(target: "device", %instance, "{}", line.trim_end());

        if let Some(result) = classify_line(&line) {
            return result;
        }
    }

    if shared.cancelled.load(Ordering::Acquire) {
        TestResult::error(TIMED_OUT_MESSAGE)
    } else {
        TestResult::cancelled(CANCELLED_MESSAGE)
    }
}
