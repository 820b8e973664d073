//! CLI command definitions
//!
//! Defines the clap commands for the test runner CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::ConnectionOverrides;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a test document against a tenant
    Run {
        /// Path to the YAML (or .toml) test document
        document: PathBuf,

        /// API key used to authenticate against the tenant
        api_key: String,

        #[command(flatten)]
        connection: ConnectionArgs,

        /// Also write the run log to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Load a test document and print the execution plan without running it
    Check {
        /// Path to the YAML (or .toml) test document
        document: PathBuf,
    },
}

/// Overrides for the document's connection fields
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Platform base URL (overrides Cx1URL)
    #[arg(long)]
    pub cx1_url: Option<String>,

    /// IAM base URL (overrides IAMURL)
    #[arg(long)]
    pub iam_url: Option<String>,

    /// Tenant name (overrides Tenant)
    #[arg(long)]
    pub tenant: Option<String>,

    /// HTTP proxy (overrides ProxyURL)
    #[arg(long)]
    pub proxy: Option<String>,
}

impl From<ConnectionArgs> for ConnectionOverrides {
    fn from(args: ConnectionArgs) -> Self {
        Self {
            cx1_url: args.cx1_url,
            iam_url: args.iam_url,
            tenant: args.tenant,
            proxy_url: args.proxy,
        }
    }
}
