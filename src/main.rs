//! CRUD E2E - declarative end-to-end tests for a multi-entity management API
//!
//! Runs a test document against a tenant and exits non-zero when any test
//! failed.

use std::process::ExitCode;

use clap::Parser;
use crud_e2e::commands::Commands;
use crud_e2e::{cli, common::logging};

#[derive(Parser)]
#[command(name = "crud-e2e", about = "Declarative CRUD end-to-end test runner")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Run { log_file, .. } => log_file.clone(),
        Commands::Check { .. } => None,
    };

    let result = match logging::init_cli(log_file.as_deref()) {
        Ok(logging) => cli::dispatch(cli.command, &logging).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
