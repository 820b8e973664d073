//! Error types for the CRUD test runner
//!
//! Load-time errors abort a run before any remote call is made. Everything
//! else is raised by a single test operation and ends up in the outcome
//! ledger instead of propagating.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the test runner
#[derive(Error, Debug)]
pub enum Error {
    // === Document Errors ===
    #[error("Failed to read test document '{path}': {error}")]
    DocumentRead { path: String, error: String },

    #[error("Failed to parse test document '{path}': {message}")]
    DocumentParse { path: String, message: String },

    #[error("Unable to find file '{file}' (also tried relative to '{base}')")]
    FileNotFound { file: String, base: String },

    #[error("error loading sub-test {file}: {source}")]
    SubDocument {
        file: String,
        #[source]
        source: Box<Error>,
    },

    #[error("error locating scan zipfile {0}")]
    ScanArchive(String),

    #[error("Test document '{0}' is delegated to from within its own delegation chain")]
    DelegationCycle(String),

    // === Connection Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    // === Remote Operation Errors ===
    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} '{key}' already exists")]
    Conflict { kind: &'static str, key: String },

    #[error("Invalid {kind}: {message}")]
    Validation { kind: &'static str, message: String },

    #[error("{method} {path} failed with status {status}: {message}")]
    Remote {
        method: String,
        path: String,
        status: u16,
        message: String,
    },

    #[error("failed to find {kind} {name}: {source}")]
    Resolution {
        kind: &'static str,
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{operation} is not supported for {kind} tests")]
    Unsupported {
        kind: &'static str,
        operation: &'static str,
    },

    #[error("Scan {id} finished with status {status}")]
    ScanFailed { id: String, status: String },

    #[error("Query compilation failed: {0}")]
    Compile(String),

    #[error("Archive error: {0}")]
    Archive(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a not found error for a remote entity
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Create a conflict error for a remote entity
    pub fn conflict(kind: &'static str, key: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            key: key.into(),
        }
    }

    /// Create a validation error
    pub fn validation(kind: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            kind,
            message: message.into(),
        }
    }

    /// Wrap a failed name lookup for a relational reference
    pub fn resolution(kind: &'static str, name: &str, source: Error) -> Self {
        Self::Resolution {
            kind,
            name: name.to_string(),
            source: Box::new(source),
        }
    }

    /// Wrap an error raised while loading a delegated document
    pub fn sub_document(file: &str, source: Error) -> Self {
        Self::SubDocument {
            file: file.to_string(),
            source: Box::new(source),
        }
    }

    /// Create an error for an operation a kind does not offer
    pub fn unsupported(kind: &'static str, operation: &'static str) -> Self {
        Self::Unsupported { kind, operation }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_message_carries_source() {
        let err = Error::resolution("group", "g1", Error::not_found("Group", "g1"));
        assert_eq!(err.to_string(), "failed to find group g1: Group 'g1' not found");
    }

    #[test]
    fn test_sub_document_message() {
        let err = Error::sub_document(
            "nested.yaml",
            Error::FileNotFound {
                file: "scan.zip".to_string(),
                base: "/tmp".to_string(),
            },
        );
        assert!(err.to_string().starts_with("error loading sub-test nested.yaml:"));
    }
}
