//! Common utilities shared by the loader, the client and the runner

pub mod archive;
pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};
