//! CLI command handling
//!
//! Loads the test document, connects to the tenant and hands over to the
//! runner. Load and connection errors are returned; test failures only
//! show up in the exit code.

use std::path::Path;
use std::process::ExitCode;

use colored::Colorize;

use crate::client::HttpClient;
use crate::commands::Commands;
use crate::common::config::{parse_log_level, ConnectionOverrides, ConnectionSettings};
use crate::common::logging::LoggingHandle;
use crate::common::Result;
use crate::testing::{self, EntityKind, Ledger, Phase, TestDocument};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, logging: &LoggingHandle) -> Result<ExitCode> {
    match command {
        Commands::Run {
            document,
            api_key,
            connection,
            log_file: _,
        } => run(&document, &api_key, connection.into(), logging).await,

        Commands::Check { document } => {
            let document = testing::load_document(&document)?;
            print_plan(&document);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(
    path: &Path,
    api_key: &str,
    overrides: ConnectionOverrides,
    logging: &LoggingHandle,
) -> Result<ExitCode> {
    let mut document = testing::load_document(path)?;
    if let Some(level) = parse_log_level(&document.log_level)? {
        logging.set_level(level)?;
    }

    let settings = ConnectionSettings::resolve(&document, &overrides)?;
    let client = HttpClient::connect(settings, api_key).await?;
    tracing::info!("Created client for {}", client);

    let ledger = testing::run_tests(&mut document.tests, &client).await;
    testing::print_summary(&mut std::io::stdout().lock(), &ledger)?;

    Ok(ExitCode::from(exit_status(&ledger)))
}

/// Process exit status for a finished run: 1 when any test failed
fn exit_status(ledger: &Ledger) -> u8 {
    u8::from(ledger.has_failures())
}

/// Print what a run of the document would do
fn print_plan(document: &TestDocument) {
    println!(
        "{} {} ({} test sets)",
        "Test document:".blue().bold(),
        document.path.display(),
        document.tests.len()
    );

    for (index, set) in document.tests.iter().enumerate() {
        println!();
        print!("{} {}", format!("#{}", index + 1).dimmed(), set.name.white().bold());
        if set.wait > 0 {
            print!(" {}", format!("(waits {}s)", set.wait).yellow());
        }
        println!();

        let mut empty = true;
        for kind in EntityKind::ORDER {
            let phases = set.phase_strings(kind);
            if phases.is_empty() {
                continue;
            }
            empty = false;

            let selected: Vec<String> = phases
                .iter()
                .map(|test| {
                    let letters: String = Phase::ALL
                        .iter()
                        .filter(|p| p.is_selected(test))
                        .map(|p| p.letter())
                        .collect();
                    if letters.is_empty() {
                        "-".to_string()
                    } else {
                        letters
                    }
                })
                .collect();
            println!(
                "  {} {:>3}  {}",
                format!("{:<12}", kind.name()).cyan(),
                set.count(kind),
                selected.join(" ")
            );
        }
        if empty {
            println!("  {}", "no declarations".dimmed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::testing::{OutcomeRecord, Verdict};

    fn ledger(verdicts: &[Verdict]) -> Ledger {
        let mut ledger = Ledger::new();
        for (position, verdict) in verdicts.iter().enumerate() {
            ledger.push(OutcomeRecord {
                fail_test: false,
                verdict: *verdict,
                label: "Create Group".to_string(),
                duration: Duration::ZERO,
                set_name: "groups".to_string(),
                index: position + 1,
                target: format!("/g{}", position + 1),
                reason: None,
            });
        }
        ledger
    }

    #[test]
    fn test_exit_status_success_without_failures() {
        assert_eq!(exit_status(&ledger(&[])), 0);
        assert_eq!(exit_status(&ledger(&[Verdict::Pass, Verdict::Pass])), 0);
        // Skips are not failures.
        assert_eq!(exit_status(&ledger(&[Verdict::Pass, Verdict::Skip])), 0);
    }

    #[test]
    fn test_exit_status_failure_on_any_fail() {
        assert_eq!(
            exit_status(&ledger(&[Verdict::Pass, Verdict::Skip, Verdict::Fail])),
            1
        );
    }
}
