//! Machine-readable record of a run, written with `--report`.

use crate::error::{RunnerError, RunnerResult};
use crate::orchestrator::{RunSummary, Transcript};
use crate::model::TestStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub index: u32,
    pub name: String,
    pub kind: String,
    pub status: TestStatus,
    pub message: String,
    pub transcripts: Vec<Transcript>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Hardware setup the run used (`solo`, `dual`, ...).
    pub hardware: String,
    pub total: usize,
    pub counts: BTreeMap<String, usize>,
    pub success: bool,
    pub cases: Vec<CaseReport>,
}

impl RunReport {
    pub fn new(
        summary: &RunSummary,
        hardware: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let counts = TestStatus::ALL
            .iter()
            .map(|status| (status.name().to_string(), summary.count(*status)))
            .collect();
        let cases = summary
            .outcomes()
            .iter()
            .map(|outcome| CaseReport {
                index: outcome.case.index(),
                name: outcome.case.name().to_string(),
                kind: outcome.case.kind().to_string(),
                status: outcome.result.status(),
                message: outcome.result.message().to_string(),
                transcripts: outcome.transcripts.clone(),
            })
            .collect();

        Self {
            started_at,
            finished_at,
            hardware: hardware.into(),
            total: summary.total(),
            counts,
            success: !summary.has_failures(),
            cases,
        }
    }

    pub fn to_json(&self) -> RunnerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> RunnerResult<()> {
        std::fs::write(path, self.to_json()?).map_err(|source| RunnerError::Report {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CaseKind, Instance, TestCase, TestResult};
    use crate::orchestrator::CaseOutcome;

    fn summary() -> RunSummary {
        let mut summary = RunSummary::default();
        summary.record(CaseOutcome {
            case: TestCase::new(0, "timers", CaseKind::Solo),
            result: TestResult::passed(),
            transcripts: vec![Transcript {
                instance: Instance::A,
                output: "A+0.01s timers.c:3:timers:PASS\r\n".to_string(),
            }],
        });
        summary.record(CaseOutcome {
            case: TestCase::new(1, "uart_loop", CaseKind::Dual),
            result: TestResult::error("Test timed out"),
            transcripts: Vec::new(),
        });
        summary
    }

    #[test]
    fn test_report_contents() {
        let now = Utc::now();
        let report = RunReport::new(&summary(), "dual", now, now);

        assert_eq!(report.total, 2);
        assert!(!report.success);
        assert_eq!(report.counts["Passed"], 1);
        assert_eq!(report.counts["Error"], 1);
        assert_eq!(report.counts["Cancelled"], 0);
        assert_eq!(report.cases[1].kind, "dual");
    }

    #[test]
    fn test_report_json_shape() {
        let now = Utc::now();
        let json = RunReport::new(&summary(), "solo", now, now).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["hardware"], "solo");
        assert_eq!(value["cases"][0]["status"], "Passed");
        assert_eq!(value["cases"][0]["transcripts"][0]["instance"], "A");
        assert_eq!(value["cases"][1]["message"], "Test timed out");
    }

    #[test]
    fn test_report_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let now = Utc::now();

        RunReport::new(&summary(), "solo", now, now).write_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"uart_loop\""));
    }

    #[test]
    fn test_report_write_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        let now = Utc::now();

        let err = RunReport::new(&summary(), "solo", now, now)
            .write_to(&path)
            .unwrap_err();
        assert!(matches!(err, RunnerError::Report { .. }));
    }
}
