//! Resolution of file references found in test documents
//!
//! A reference is tried as written first (relative to the working
//! directory), then relative to the directory of the document that
//! mentions it. The first candidate that exists wins.

use std::path::{Path, PathBuf};

use super::{Error, Result};

/// Resolve `file` against the directory of the referencing document
///
/// Returns the canonical (absolute) path of the first existing candidate.
pub fn resolve_reference(base_dir: &Path, file: &str) -> Result<PathBuf> {
    tracing::debug!(
        "Trying to find file {}, current root is {}",
        file,
        base_dir.display()
    );

    for candidate in candidates(base_dir, file) {
        if candidate.exists() {
            return candidate.canonicalize().map_err(Error::from);
        }
        tracing::debug!("File doesn't exist: {}", candidate.display());
    }

    Err(Error::FileNotFound {
        file: file.to_string(),
        base: base_dir.display().to_string(),
    })
}

/// Candidate locations for a file reference, in lookup order
fn candidates(base_dir: &Path, file: &str) -> Vec<PathBuf> {
    let literal = PathBuf::from(file);
    if literal.is_absolute() {
        return vec![literal];
    }
    vec![literal, base_dir.join(file)]
}

/// Directory of a document, falling back to the working directory
pub fn document_dir(document: &Path) -> PathBuf {
    match document.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_reference_resolves_against_document_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("nested-only-here.yaml"), "Tests: []").unwrap();

        let resolved = resolve_reference(dir.path(), "nested-only-here.yaml").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("nested-only-here.yaml"));
    }

    #[test]
    fn test_absolute_reference_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("abs.yaml");
        std::fs::write(&file, "Tests: []").unwrap();

        let other = tempfile::tempdir().unwrap();
        let resolved = resolve_reference(other.path(), file.to_str().unwrap()).unwrap();
        assert_eq!(resolved, file.canonicalize().unwrap());
    }

    #[test]
    fn test_missing_reference_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_reference(dir.path(), "does-not-exist.yaml").unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_document_dir_of_bare_file_name() {
        assert_eq!(document_dir(Path::new("tests.yaml")), PathBuf::from("."));
        assert_eq!(
            document_dir(Path::new("suite/tests.yaml")),
            PathBuf::from("suite")
        );
    }
}
