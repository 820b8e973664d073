//! Outcome ledger
//!
//! One record per executed or skipped declaration, appended in execution
//! order and never modified afterwards.

use std::time::Duration;

use crate::common::Result;

/// Reason recorded when an operation expected to fail succeeds
pub const UNEXPECTED_PASS: &str = "test passed but was expected to fail";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    Skip,
}

impl Verdict {
    /// Interpret an operation outcome, inverted for FailTest declarations
    pub fn judge<T>(outcome: &Result<T>, fail_test: bool) -> (Verdict, Option<String>) {
        match (outcome, fail_test) {
            (Ok(_), false) => (Verdict::Pass, None),
            (Ok(_), true) => (Verdict::Fail, Some(UNEXPECTED_PASS.to_string())),
            (Err(_), true) => (Verdict::Pass, None),
            (Err(e), false) => (Verdict::Fail, Some(e.to_string())),
        }
    }
}

/// An immutable ledger entry
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub fail_test: bool,
    pub verdict: Verdict,
    /// Phase and kind, e.g. `Create User`
    pub label: String,
    pub duration: Duration,
    pub set_name: String,
    /// 1-based position within the declaration list
    pub index: usize,
    pub target: String,
    pub reason: Option<String>,
}

/// Totals per verdict
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

#[derive(Debug, Default)]
pub struct Ledger {
    records: Vec<OutcomeRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: OutcomeRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[OutcomeRecord] {
        &self.records
    }

    pub fn summary(&self) -> Summary {
        self.records
            .iter()
            .fold(Summary::default(), |mut summary, record| {
                match record.verdict {
                    Verdict::Pass => summary.passed += 1,
                    Verdict::Fail => summary.failed += 1,
                    Verdict::Skip => summary.skipped += 1,
                }
                summary
            })
    }

    /// The run must exit non-zero iff this holds
    pub fn has_failures(&self) -> bool {
        self.records.iter().any(|r| r.verdict == Verdict::Fail)
    }
}
