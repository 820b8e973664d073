//! CRUD test orchestration
//!
//! Loads a test document, drives every declaration through the phases it
//! selects against a [`RemoteClient`](crate::client::RemoteClient) and
//! records the outcome of each step in a [`Ledger`].

mod config;
mod entities;
mod entity;
mod ledger;
mod loader;
mod phase;
mod reconcile;
mod report;
mod runner;

pub use config::*;
pub use entity::{run_phase, skip_reason, EntityTest};
pub use ledger::{Ledger, OutcomeRecord, Summary, Verdict, UNEXPECTED_PASS};
pub use loader::{load_document, parse_document};
pub use phase::{label, EntityKind, Phase};
pub use reconcile::{diff, MembershipDiff};
pub use report::{log_outcome, log_start, print_summary, summary_line};
pub use runner::run_tests;
