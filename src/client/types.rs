//! Remote entity models
//!
//! These are the objects handed out by a [`RemoteClient`](super::RemoteClient)
//! and attached to test declarations as live handles. Field names follow the
//! platform's JSON representation (camelCase).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An IAM group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_groups: Vec<Group>,
}

/// An IAM user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

fn enabled() -> bool {
    true
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.email)
    }
}

/// An IAM role (client role or composite permission)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub composite: bool,
}

/// A rule that assigns projects to an application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type")]
    pub rule_type: String,
    pub value: String,
}

impl fmt::Display for ApplicationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rule_type, self.value)
    }
}

/// An application grouping several projects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub criticality: u32,
    #[serde(default)]
    pub rules: Vec<ApplicationRule>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub project_ids: Vec<String>,
}

/// A project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    /// Group IDs with access to the project
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub application_ids: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub criticality: u32,
}

/// A query from the product's query catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "queryId")]
    pub id: u64,
    #[serde(rename = "lang")]
    pub language: String,
    pub group: String,
    pub name: String,
    #[serde(default)]
    pub severity: String,
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} -> {}", self.language, self.group, self.name)
    }
}

/// Level at which a query override is stored
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryScope {
    Tenant,
    /// Project ID
    Project(String),
    /// Application ID
    Application(String),
}

impl QueryScope {
    /// Level name used by the audit API
    pub fn level(&self) -> &'static str {
        match self {
            QueryScope::Tenant => "Corp",
            QueryScope::Project(_) => "Project",
            QueryScope::Application(_) => "Application",
        }
    }

    /// Identifier of the level's owner
    pub fn level_id(&self) -> &str {
        match self {
            QueryScope::Tenant => "Corp",
            QueryScope::Project(id) | QueryScope::Application(id) => id,
        }
    }
}

impl fmt::Display for QueryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryScope::Tenant => write!(f, "Tenant"),
            QueryScope::Project(id) => write!(f, "Project {}", id),
            QueryScope::Application(id) => write!(f, "Application {}", id),
        }
    }
}

/// A query override stored at a specific scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditQuery {
    pub scope: QueryScope,
    pub language: String,
    pub group: String,
    pub name: String,
    pub source: String,
    pub severity: String,
}

impl AuditQuery {
    /// Catalog path of the query, `language/group/name`
    pub fn path(&self) -> String {
        format!("{}/{}/{}", self.language, self.group, self.name)
    }
}

/// A preset: a named set of catalog queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub query_ids: Vec<u64>,
}

/// Scan states that end a scan
pub const SCAN_TERMINAL_STATES: &[&str] = &["Completed", "Failed", "Partial", "Canceled"];

/// A scan of a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
    pub id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub engines: Vec<String>,
}

impl Scan {
    pub fn is_finished(&self) -> bool {
        SCAN_TERMINAL_STATES.contains(&self.status.as_str())
    }

    pub fn is_successful(&self) -> bool {
        self.status == "Completed"
    }
}

/// Where a scan takes its sources from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanSource {
    /// Zip archive contents
    Archive(Vec<u8>),
    /// Git repository URL
    Repository(String),
}

/// Parameters for starting a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub project_id: String,
    pub branch: String,
    pub source: ScanSource,
    pub engines: Vec<String>,
    pub incremental: bool,
    pub preset: Option<String>,
}

/// A single finding produced by a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub id: String,
    pub hash: String,
    pub similarity_id: i64,
    pub query_id: u64,
    pub language: String,
    pub group: String,
    pub query_name: String,
    pub state: String,
    pub severity: String,
}

/// Triage change for a finding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPredicate {
    pub state: String,
    pub severity: String,
    pub comment: String,
}
