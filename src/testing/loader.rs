//! Test document loader
//!
//! Reads a root document and expands delegating sets into the sets of the
//! documents they point to, depth-first and in order, so the runner only
//! ever sees one flat list. Scan archive references are rewritten to
//! absolute paths on the way.

use std::path::{Path, PathBuf};

use crate::common::paths::{document_dir, resolve_reference};
use crate::common::{Error, Result};

use super::config::{TestDocument, TestSet};

/// Load a document and flatten all delegations
///
/// Every failure here is fatal for the run: nothing has been sent to the
/// remote yet.
pub fn load_document(path: &Path) -> Result<TestDocument> {
    let mut chain = Vec::new();
    load_nested(path, &mut chain)
}

fn load_nested(path: &Path, chain: &mut Vec<PathBuf>) -> Result<TestDocument> {
    let canonical = path.canonicalize().map_err(|e| Error::DocumentRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    if chain.contains(&canonical) {
        return Err(Error::DelegationCycle(canonical.display().to_string()));
    }

    let content = std::fs::read_to_string(&canonical).map_err(|e| Error::DocumentRead {
        path: canonical.display().to_string(),
        error: e.to_string(),
    })?;
    let mut document = parse_document(&canonical, &content)?;
    document.path = canonical.clone();

    let base = document_dir(&canonical);
    chain.push(canonical);
    let flattened = flatten(std::mem::take(&mut document.tests), &base, chain);
    chain.pop();

    document.tests = flattened?;
    Ok(document)
}

fn flatten(sets: Vec<TestSet>, base: &Path, chain: &mut Vec<PathBuf>) -> Result<Vec<TestSet>> {
    let mut flattened = Vec::with_capacity(sets.len());

    for mut set in sets {
        if !set.file.is_empty() {
            if has_inline_entities(&set) {
                tracing::warn!(
                    "Test set '{}' delegates to {}; its inline declarations are ignored",
                    set.name,
                    set.file
                );
            }
            let sub_path = resolve_reference(base, &set.file)?;
            let sub = load_nested(&sub_path, chain).map_err(|e| Error::sub_document(&set.file, e))?;
            tracing::debug!("Loaded sub-config from {}", sub.path.display());
            flattened.extend(sub.tests);
            continue;
        }

        for warning in ignored_fields(&set) {
            tracing::warn!("{}", warning);
        }

        for scan in set.scans.iter_mut().filter(|s| !s.zip_file.is_empty()) {
            let archive = resolve_reference(base, &scan.zip_file)
                .map_err(|_| Error::ScanArchive(scan.zip_file.clone()))?;
            scan.zip_file = archive.display().to_string();
        }
        flattened.push(set);
    }

    Ok(flattened)
}

fn has_inline_entities(set: &TestSet) -> bool {
    !(set.groups.is_empty()
        && set.users.is_empty()
        && set.applications.is_empty()
        && set.projects.is_empty()
        && set.roles.is_empty()
        && set.queries.is_empty()
        && set.presets.is_empty()
        && set.scans.is_empty()
        && set.results.is_empty())
}

/// Declared fields the runner accepts but does not act on
fn ignored_fields(set: &TestSet) -> Vec<String> {
    set.applications
        .iter()
        .enumerate()
        .filter(|(_, app)| !app.groups.is_empty())
        .map(|(position, app)| {
            format!(
                "Test set '{}' application #{} ({}) lists Groups; applications have no group access, ignoring {:?}",
                set.name,
                position + 1,
                app.name,
                app.groups
            )
        })
        .collect()
}

/// Parse document text; a `.toml` extension selects TOML, anything else YAML
pub fn parse_document(path: &Path, content: &str) -> Result<TestDocument> {
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let parsed = if is_toml {
        toml::from_str(content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| Error::DocumentParse {
        path: path.display().to_string(),
        message,
    })
}
