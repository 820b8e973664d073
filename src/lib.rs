//! CRUD E2E - declarative end-to-end tests for a multi-entity management API
//!
//! A test document lists groups, users, applications, projects, roles,
//! queries, presets, scans and results, each with the lifecycle phases to
//! exercise. The runner drives a remote tenant through those phases and
//! reports a pass/fail/skip tally.

pub mod cli;
pub mod client;
pub mod commands;
pub mod common;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
