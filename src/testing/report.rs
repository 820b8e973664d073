//! Per-test log lines and the end-of-run summary

use std::io::{self, Write};
use std::time::Duration;

use colored::Colorize;

use super::ledger::{Ledger, OutcomeRecord, Verdict};

fn seconds(duration: Duration) -> String {
    format!("{:.3}s", duration.as_secs_f64())
}

fn test_word(fail_test: bool) -> &'static str {
    if fail_test {
        "FailTest"
    } else {
        "Test"
    }
}

pub fn log_start(label: &str, set_name: &str, index: usize, target: &str) {
    tracing::info!("");
    tracing::info!("Starting {} Test '{}' #{} - {}", label, set_name, index, target);
}

/// Log a record the way its verdict demands
pub fn log_outcome(record: &OutcomeRecord) {
    let elapsed = seconds(record.duration);
    match record.verdict {
        Verdict::Pass => tracing::info!(
            "PASS [{}]: {} {} '{}' #{} ({})",
            elapsed,
            record.label,
            test_word(record.fail_test),
            record.set_name,
            record.index,
            record.target
        ),
        Verdict::Fail => tracing::error!(
            "FAIL [{}]: {} {} '{}' #{} ({}) - {}",
            elapsed,
            record.label,
            test_word(record.fail_test),
            record.set_name,
            record.index,
            record.target,
            record.reason.as_deref().unwrap_or_default()
        ),
        Verdict::Skip => tracing::warn!(
            "SKIP [{}]: {} Test '{}' #{} - {}",
            elapsed,
            record.label,
            record.set_name,
            record.index,
            record.reason.as_deref().unwrap_or_default()
        ),
    }
}

/// Summary line for one record, without the verdict tag
pub fn summary_line(record: &OutcomeRecord) -> String {
    format!("{} - {}: {}", record.set_name, record.label, record.target)
}

/// Write every record followed by the totals
///
/// Totals with a zero count are left out, except for `Ran N tests`.
pub fn print_summary<W: Write>(out: &mut W, ledger: &Ledger) -> io::Result<()> {
    tracing::info!("Test result summary:");

    for record in ledger.records() {
        let tag = match record.verdict {
            Verdict::Pass => "PASS".green(),
            Verdict::Fail => "FAIL".red().bold(),
            Verdict::Skip => "SKIP".yellow(),
        };
        writeln!(out, "{} {}", tag, summary_line(record))?;
    }

    let summary = ledger.summary();
    writeln!(out)?;
    writeln!(out, "Ran {} tests", summary.total())?;
    if summary.failed > 0 {
        writeln!(out, "{}", format!("FAILED {} tests", summary.failed).red().bold())?;
    }
    if summary.skipped > 0 {
        writeln!(out, "{}", format!("SKIPPED {} tests", summary.skipped).yellow())?;
    }
    if summary.passed > 0 {
        writeln!(out, "{}", format!("PASSED {} tests", summary.passed).green())?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_have_three_decimals() {
        assert_eq!(seconds(Duration::from_millis(1500)), "1.500s");
        assert_eq!(seconds(Duration::from_micros(1234)), "0.001s");
    }

    fn record(verdict: Verdict, label: &str, target: &str) -> OutcomeRecord {
        OutcomeRecord {
            fail_test: false,
            verdict,
            label: label.to_string(),
            duration: Duration::ZERO,
            set_name: "identity".to_string(),
            index: 1,
            target: target.to_string(),
            reason: None,
        }
    }

    fn summary_text(ledger: &Ledger) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        print_summary(&mut out, ledger).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_summary_of_clean_run_lists_only_passes() {
        let mut ledger = Ledger::new();
        ledger.push(record(Verdict::Pass, "Create Group", "/g1"));
        ledger.push(record(Verdict::Pass, "Create User", "u1 (u1@x.com)"));

        assert_eq!(
            summary_text(&ledger),
            "PASS identity - Create Group: /g1\n\
             PASS identity - Create User: u1 (u1@x.com)\n\
             \n\
             Ran 2 tests\n\
             PASSED 2 tests\n"
        );
    }

    #[test]
    fn test_summary_of_mixed_run_lists_every_total() {
        let mut ledger = Ledger::new();
        ledger.push(record(Verdict::Fail, "Read User", "u1 ()"));
        ledger.push(record(Verdict::Skip, "Update User", "u1 ()"));
        ledger.push(record(Verdict::Pass, "Create Group", "/g1"));

        assert_eq!(
            summary_text(&ledger),
            "FAIL identity - Read User: u1 ()\n\
             SKIP identity - Update User: u1 ()\n\
             PASS identity - Create Group: /g1\n\
             \n\
             Ran 3 tests\n\
             FAILED 1 tests\n\
             SKIPPED 1 tests\n\
             PASSED 1 tests\n"
        );
    }

    #[test]
    fn test_summary_of_empty_run() {
        assert_eq!(summary_text(&Ledger::new()), "\nRan 0 tests\n");
    }

    #[test]
    fn test_summary_line() {
        let record = OutcomeRecord {
            fail_test: true,
            verdict: Verdict::Pass,
            label: "Delete Project".to_string(),
            duration: Duration::ZERO,
            set_name: "projects".to_string(),
            index: 3,
            target: "p1".to_string(),
            reason: None,
        };
        assert_eq!(summary_line(&record), "projects - Delete Project: p1");
        assert_eq!(test_word(record.fail_test), "FailTest");
    }
}
