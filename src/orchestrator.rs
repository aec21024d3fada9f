//! Runs enumerated test cases on one board or a pair and tallies the results.
//!
//! Control flow per case: start the case on every participating board, poll
//! the monitors until all have a verdict (cancelling a board's peer as soon
//! as one side fails), then record the more severe verdict.

use crate::config::TimingConfig;
use crate::environment::DeviceEnvironment;
use crate::error::{RunnerError, RunnerResult};
use crate::model::{Instance, TestCase, TestResult, TestStatus};
use crate::monitor::TestMonitor;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

pub const DUAL_SKIPPED_MESSAGE: &str = "Dual test case skipped";

/// Width the case name is padded to on a progress line.
const PROGRESS_NAME_WIDTH: usize = 40;

/// Knobs for a run that don't belong to a single board.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Put the case header on its own line; device output is logged as it
    /// arrives instead of a padded progress line.
    pub verbose: bool,
    /// How often running monitors are checked.
    pub poll_interval: Duration,
}

impl RunOptions {
    pub fn new(timing: &TimingConfig, verbose: bool) -> Self {
        Self {
            verbose,
            poll_interval: timing.poll_interval(),
        }
    }
}

/// What one board printed while running a case.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub instance: Instance,
    pub output: String,
}

/// Final verdict for one case.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub case: TestCase,
    pub result: TestResult,
    pub transcripts: Vec<Transcript>,
}

/// Tally of a whole run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    counts: BTreeMap<TestStatus, usize>,
    outcomes: Vec<CaseOutcome>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: CaseOutcome) {
        *self.counts.entry(outcome.result.status()).or_default() += 1;
        self.outcomes.push(outcome);
    }

    pub fn count(&self, status: TestStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn outcomes(&self) -> &[CaseOutcome] {
        &self.outcomes
    }

    /// True if any case Failed or Errored. Cancelled and Skipped don't count.
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.result.is_failure())
    }

    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{:>20}: {}", "Total tests", self.total())?;
        writeln!(out)?;
        for status in TestStatus::ALL {
            writeln!(out, "{:>20}: {}", status.name(), self.count(status))?;
        }
        Ok(())
    }
}

/// Keep only the cases whose index was asked for; no indices means all.
pub fn select_cases(cases: Vec<TestCase>, indices: &[u32]) -> Vec<TestCase> {
    if indices.is_empty() {
        return cases;
    }
    cases
        .into_iter()
        .filter(|case| indices.contains(&case.index()))
        .collect()
}

/// Drop whatever precedes the first `/` in a failure line, so the message
/// starts at the source path.
pub fn trim_failure_message(message: &str) -> &str {
    match message.find('/') {
        Some(pos) => &message[pos..],
        None => message,
    }
}

/// Paired boards must run the same image.
pub fn ensure_same_cases(a: &[TestCase], b: &[TestCase]) -> RunnerResult<()> {
    if a == b {
        Ok(())
    } else {
        Err(RunnerError::CaseListMismatch {
            a: a.to_vec(),
            b: b.to_vec(),
        })
    }
}

/// Poll until every monitor has a verdict and return the most severe one.
///
/// Once either side of a pair has failed, the other is cancelled.
pub fn await_verdict(
    primary: &TestMonitor,
    peer: Option<&TestMonitor>,
    poll_interval: Duration,
) -> TestResult {
    loop {
        let first = primary.get_result();
        match peer {
            None => {
                if let Some(result) = first {
                    return result;
                }
            }
            Some(peer) => match (first, peer.get_result()) {
                (Some(a), Some(b)) => return a.worse(b),
                (Some(a), None) if a.is_failure() => cancel_peer(peer, primary.instance()),
                (None, Some(b)) if b.is_failure() => cancel_peer(primary, peer.instance()),
                _ => {}
            },
        }
        thread::sleep(poll_interval);
    }
}

fn cancel_peer(monitor: &TestMonitor, failed: Instance) {
    if !monitor.is_cancelled() {
        info!(failed = %failed, cancelling = %monitor.instance(), "peer failed, stopping its partner");
        monitor.cancel();
    }
}

/// Drives board A and, for paired runs, board B through a list of cases.
pub struct Orchestrator<W> {
    env_a: DeviceEnvironment,
    env_b: Option<DeviceEnvironment>,
    options: RunOptions,
    out: W,
}

impl<W: Write> Orchestrator<W> {
    pub fn new(
        env_a: DeviceEnvironment,
        env_b: Option<DeviceEnvironment>,
        options: RunOptions,
        out: W,
    ) -> Self {
        Self {
            env_a,
            env_b,
            options,
            out,
        }
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    /// Enumerate cases on every board; a pair must agree.
    pub fn discover(&mut self) -> RunnerResult<Vec<TestCase>> {
        let cases = self.env_a.get_testlist()?;
        if let Some(env_b) = self.env_b.as_mut() {
            let cases_b = env_b.get_testlist()?;
            ensure_same_cases(&cases, &cases_b)?;
        }
        Ok(cases)
    }

    pub fn list(&mut self, cases: &[TestCase]) -> RunnerResult<()> {
        writeln!(self.out, "List of test cases:")?;
        for case in cases {
            writeln!(self.out, "{case}")?;
        }
        Ok(())
    }

    /// Run `cases` in order and print the tally.
    ///
    /// Only protocol-level problems abort the run; every per-case outcome is
    /// recorded in the summary.
    pub fn run(&mut self, cases: &[TestCase]) -> RunnerResult<RunSummary> {
        let mut summary = RunSummary::default();
        for case in cases {
            let outcome = self.run_case(case)?;
            summary.record(outcome);
        }
        summary.write_to(&mut self.out)?;
        Ok(summary)
    }

    pub fn run_case(&mut self, case: &TestCase) -> RunnerResult<CaseOutcome> {
        self.write_header(case)?;

        let (result, transcripts) = if case.is_dual() && self.env_b.is_none() {
            debug!("{case} needs two boards, skipping");
            (TestResult::skipped(DUAL_SKIPPED_MESSAGE), Vec::new())
        } else {
            self.execute(case)?
        };

        self.write_verdict(&result)?;
        Ok(CaseOutcome {
            case: case.clone(),
            result,
            transcripts,
        })
    }

    fn execute(&mut self, case: &TestCase) -> RunnerResult<(TestResult, Vec<Transcript>)> {
        let monitor_a = self.env_a.start_testcase(case)?;
        let monitor_b = match self.env_b.as_mut() {
            Some(env_b) if case.is_dual() => match env_b.start_testcase(case) {
                Ok(monitor) => Some(monitor),
                Err(e) => {
                    monitor_a.cancel();
                    return Err(e);
                }
            },
            _ => None,
        };

        let result = await_verdict(&monitor_a, monitor_b.as_ref(), self.options.poll_interval);
        let transcripts = std::iter::once(&monitor_a)
            .chain(monitor_b.as_ref())
            .map(|monitor| Transcript {
                instance: monitor.instance(),
                output: monitor.output(),
            })
            .collect();
        Ok((result, transcripts))
    }

    fn write_header(&mut self, case: &TestCase) -> io::Result<()> {
        if self.options.verbose {
            writeln!(self.out, "Running test case '{}'...", case.name())?;
        } else {
            let padding = PROGRESS_NAME_WIDTH.saturating_sub(case.name().len());
            write!(self.out, "Running test case '{}'...{}", case.name(), " ".repeat(padding))?;
        }
        self.out.flush()
    }

    fn write_verdict(&mut self, result: &TestResult) -> io::Result<()> {
        writeln!(self.out, "{}", result.status())?;
        if result.is_failure() {
            writeln!(
                self.out,
                "FAILURE MESSAGE:\n{}\n",
                trim_failure_message(result.message())
            )?;
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CaseKind;
    use pretty_assertions::assert_eq;

    fn case(index: u32, name: &str, kind: CaseKind) -> TestCase {
        TestCase::new(index, name, kind)
    }

    #[test]
    fn test_select_cases() {
        let cases = vec![
            case(0, "a", CaseKind::Solo),
            case(1, "b", CaseKind::Dual),
            case(2, "c", CaseKind::Solo),
        ];
        assert_eq!(select_cases(cases.clone(), &[]), cases);
        assert_eq!(
            select_cases(cases.clone(), &[2, 0, 9]),
            vec![case(0, "a", CaseKind::Solo), case(2, "c", CaseKind::Solo)]
        );
    }

    #[test]
    fn test_trim_failure_message() {
        assert_eq!(
            trim_failure_message("\rcases/04_wifi.c:33:wifi:FAIL: Expected TRUE"),
            "/04_wifi.c:33:wifi:FAIL: Expected TRUE"
        );
        assert_eq!(trim_failure_message("no path here"), "no path here");
    }

    #[test]
    fn test_ensure_same_cases_detects_mismatch() {
        let a = vec![case(0, "x", CaseKind::Dual), case(1, "y", CaseKind::Solo)];
        let b = vec![case(0, "x", CaseKind::Dual)];

        assert!(ensure_same_cases(&a, &a.clone()).is_ok());
        match ensure_same_cases(&a, &b) {
            Err(RunnerError::CaseListMismatch { a: got_a, b: got_b }) => {
                assert_eq!(got_a.len(), 2);
                assert_eq!(got_b.len(), 1);
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_summary_tally_and_output() {
        let mut summary = RunSummary::default();
        for (i, result) in [
            TestResult::passed(),
            TestResult::passed(),
            TestResult::skipped(DUAL_SKIPPED_MESSAGE),
            TestResult::cancelled("Cancelled"),
        ]
        .into_iter()
        .enumerate()
        {
            summary.record(CaseOutcome {
                case: case(i as u32, "t", CaseKind::Solo),
                result,
                transcripts: Vec::new(),
            });
        }

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.count(TestStatus::Passed), 2);
        assert_eq!(summary.count(TestStatus::Error), 0);
        assert!(!summary.has_failures());

        let mut out = Vec::new();
        summary.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            concat!(
                "         Total tests: 4\n",
                "\n",
                "           Cancelled: 1\n",
                "             Skipped: 1\n",
                "              Passed: 2\n",
                "              Failed: 0\n",
                "               Error: 0\n",
            )
        );
    }

    #[test]
    fn test_summary_failure_flag() {
        let mut summary = RunSummary::default();
        summary.record(CaseOutcome {
            case: case(0, "t", CaseKind::Solo),
            result: TestResult::failed("x.c:1:t:FAIL:"),
            transcripts: Vec::new(),
        });
        assert!(summary.has_failures());
    }
}
