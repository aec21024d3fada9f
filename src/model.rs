//! Test case descriptors and results.
//!
//! Both are plain values: cases are parsed once from the device's enumeration
//! output, results are produced once per case and device and never change.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Enumeration record: `CASE <index> = <name> <KIND>`.
// The kind is the whole upper-case token the image prints for the case's
// requirements (`SOLO`, `DUAL`, `EYORE_TEST`), so it may contain `_` and
// nothing may follow it.
static CASE_RECORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^CASE (\d+) = (\S+) ([A-Z_]+)\s*$").expect("case record pattern is valid")
});

/// Which board of a pair an environment drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instance {
    A,
    B,
}

impl Instance {
    /// Command that starts case `index` in this role, e.g. `A3\r\n`.
    pub fn command(self, index: u32) -> String {
        format!("{self}{index}\r\n")
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::B => "B",
        })
    }
}

/// Hardware a test case needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseKind {
    /// Runs on board A alone.
    Solo,
    /// Runs on A and B together, each in its own role.
    Dual,
    /// Any other fixture the image knows about (stored lowercased).
    Other(String),
}

impl CaseKind {
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "solo" => Self::Solo,
            "dual" => Self::Dual,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for CaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solo => f.write_str("solo"),
            Self::Dual => f.write_str("dual"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

/// One enumerated test case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestCase {
    index: u32,
    name: String,
    kind: CaseKind,
}

impl TestCase {
    pub fn new(index: u32, name: impl Into<String>, kind: CaseKind) -> Self {
        Self {
            index,
            name: name.into(),
            kind,
        }
    }

    /// Parse an enumeration line, ignoring anything that isn't a case record.
    pub fn parse_record(line: &str) -> Option<Self> {
        let caps = CASE_RECORD.captures(line)?;
        let index = caps[1].parse().ok()?;
        Some(Self::new(index, &caps[2], CaseKind::from_label(&caps[3])))
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &CaseKind {
        &self.kind
    }

    pub fn is_dual(&self) -> bool {
        self.kind == CaseKind::Dual
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}: {} ({})", self.index, self.name, self.kind)
    }
}

/// Outcome of one case on one device, in ascending severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TestStatus {
    Cancelled = 0,
    Skipped = 1,
    Passed = 2,
    Failed = 3,
    Error = 4,
}

impl TestStatus {
    /// Every status, least severe first.
    pub const ALL: [TestStatus; 5] = [
        Self::Cancelled,
        Self::Skipped,
        Self::Passed,
        Self::Failed,
        Self::Error,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Cancelled => "Cancelled",
            Self::Skipped => "Skipped",
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::Error => "Error",
        }
    }

    pub fn severity(self) -> u8 {
        self as u8
    }

    pub fn is_failure(self) -> bool {
        self >= Self::Failed
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal verdict for one (case, device) execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    status: TestStatus,
    message: String,
}

impl TestResult {
    pub fn new(status: TestStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn passed() -> Self {
        Self::new(TestStatus::Passed, "Test passed.")
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(TestStatus::Failed, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(TestStatus::Error, message)
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::new(TestStatus::Skipped, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(TestStatus::Cancelled, message)
    }

    pub fn status(&self) -> TestStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// The more severe of two results. On a tie `self` wins.
    pub fn worse(self, other: TestResult) -> TestResult {
        if other.status > self.status {
            other
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = TestStatus> {
        prop::sample::select(TestStatus::ALL.to_vec())
    }

    #[test]
    fn test_severity_order() {
        assert!(TestStatus::Cancelled < TestStatus::Skipped);
        assert!(TestStatus::Skipped < TestStatus::Passed);
        assert!(TestStatus::Passed < TestStatus::Failed);
        assert!(TestStatus::Failed < TestStatus::Error);
        let severities: Vec<u8> = TestStatus::ALL.iter().map(|s| s.severity()).collect();
        assert_eq!(severities, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_is_failure_per_status() {
        let failing: Vec<_> = TestStatus::ALL
            .iter()
            .filter(|s| TestResult::new(**s, "").is_failure())
            .copied()
            .collect();
        assert_eq!(failing, vec![TestStatus::Failed, TestStatus::Error]);
    }

    #[test]
    fn test_worse_keeps_message_of_winner() {
        let a = TestResult::failed("a.c:3:t:FAIL: expected 1");
        let b = TestResult::error("Test timed out");
        assert_eq!(a.clone().worse(b.clone()), b);
        assert_eq!(b.clone().worse(a), b);
    }

    #[test]
    fn test_worse_tie_prefers_self() {
        let first = TestResult::failed("first");
        let second = TestResult::failed("second");
        assert_eq!(first.clone().worse(second), first);
    }

    proptest! {
        #[test]
        fn worse_picks_higher_severity(a in any_status(), b in any_status()) {
            let picked = TestResult::new(a, "a").worse(TestResult::new(b, "b"));
            prop_assert_eq!(picked.status(), a.max(b));
            prop_assert_eq!(picked.status().severity(), a.severity().max(b.severity()));
        }

        #[test]
        fn is_failure_iff_at_least_failed(s in any_status()) {
            prop_assert_eq!(TestResult::new(s, "").is_failure(), s >= TestStatus::Failed);
        }
    }

    #[test]
    fn test_parse_record() {
        let case = TestCase::parse_record("CASE 4 = wifi_scan DUAL").unwrap();
        assert_eq!(case, TestCase::new(4, "wifi_scan", CaseKind::Dual));
        assert!(case.is_dual());

        let case = TestCase::parse_record("CASE 0 = timers SOLO").unwrap();
        assert_eq!(case.kind(), &CaseKind::Solo);
    }

    #[test]
    fn test_parse_record_other_kind() {
        let case = TestCase::parse_record("CASE 7 = i2c_bus EYORE_TEST").unwrap();
        assert_eq!(case.kind(), &CaseKind::Other("eyore_test".to_string()));
        assert_eq!(case.to_string(), "#7: i2c_bus (eyore_test)");
    }

    #[test]
    fn test_parse_record_rejects_noise() {
        assert!(TestCase::parse_record("3 test cases are defined:").is_none());
        assert!(TestCase::parse_record("CASE x = foo SOLO").is_none());
        assert!(TestCase::parse_record("> ").is_none());
        assert!(TestCase::parse_record("CASE 1 = foo solo").is_none());
        assert!(TestCase::parse_record("CASE 1 = foo SOLO trailing").is_none());
    }

    #[test]
    fn test_case_equality_is_structural() {
        let a = TestCase::new(1, "x", CaseKind::Dual);
        assert_eq!(a, TestCase::new(1, "x", CaseKind::Dual));
        assert_ne!(a, TestCase::new(1, "x", CaseKind::Solo));
        assert_ne!(a, TestCase::new(2, "x", CaseKind::Dual));
        assert_ne!(a, TestCase::new(1, "y", CaseKind::Dual));
    }

    #[test]
    fn test_instance_command() {
        assert_eq!(Instance::A.command(0), "A0\r\n");
        assert_eq!(Instance::B.command(12), "B12\r\n");
    }
}
