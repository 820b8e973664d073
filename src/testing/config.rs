//! Test document types
//!
//! Defines the data structures deserialized from a test document. Keys are
//! PascalCase. Every entity declaration carries a `Test` phase string and a
//! `FailTest` flag next to its desired-state fields, plus a live handle that
//! is never read from the document.

use std::path::PathBuf;

use serde::Deserialize;

use crate::client::{Application, AuditQuery, Group, Preset, Project, Role, Scan, ScanResult, User};

/// A complete test document
#[derive(Deserialize, Debug, Default)]
pub struct TestDocument {
    /// Base URL of the platform API
    #[serde(rename = "Cx1URL", default)]
    pub cx1_url: String,
    /// Base URL of the identity provider
    #[serde(rename = "IAMURL", default)]
    pub iam_url: String,
    #[serde(rename = "Tenant", default)]
    pub tenant: String,
    #[serde(rename = "ProxyURL", default)]
    pub proxy_url: String,
    /// TRACE, DEBUG, INFO, WARNING, ERROR or FATAL
    #[serde(rename = "LogLevel", default)]
    pub log_level: String,
    /// Test sets in execution order
    #[serde(rename = "Tests", default)]
    pub tests: Vec<TestSet>,
    /// Canonical path the document was loaded from
    #[serde(skip)]
    pub path: PathBuf,
}

/// A named group of entity test declarations
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct TestSet {
    pub name: String,
    /// Delegate to another document instead of declaring entities inline
    pub file: String,
    /// Seconds to sleep before the set runs
    pub wait: u64,
    pub groups: Vec<GroupTest>,
    pub users: Vec<UserTest>,
    pub applications: Vec<ApplicationTest>,
    pub projects: Vec<ProjectTest>,
    pub roles: Vec<RoleTest>,
    pub queries: Vec<QueryTest>,
    pub presets: Vec<PresetTest>,
    pub scans: Vec<ScanTest>,
    pub results: Vec<ResultTest>,
}

/// A key/value tag
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Client roles a group should hold for one IAM client
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ClientRoles {
    pub client: String,
    pub roles: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct GroupTest {
    pub name: String,
    /// Name of the parent group, created as a child when set
    pub parent: String,
    pub client_roles: Vec<ClientRoles>,
    pub test: String,
    pub fail_test: bool,
    #[serde(skip)]
    pub group: Option<Group>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserTest {
    /// Username
    pub name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Group names the user should belong to
    pub groups: Vec<String>,
    /// Role names the user should hold
    pub roles: Vec<String>,
    pub test: String,
    pub fail_test: bool,
    #[serde(skip)]
    pub user: Option<User>,
}

/// Rule assigning projects to an application
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct RuleDeclaration {
    #[serde(rename = "Type")]
    pub rule_type: String,
    pub value: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApplicationTest {
    pub name: String,
    pub description: String,
    /// 1 to 5, 0 selects the default of 3
    pub criticality: u32,
    pub rules: Vec<RuleDeclaration>,
    pub tags: Vec<Tag>,
    /// Accepted for older documents; applications carry no group access
    pub groups: Vec<String>,
    pub test: String,
    pub fail_test: bool,
    #[serde(skip)]
    pub application: Option<Application>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProjectTest {
    pub name: String,
    /// Names of groups with access to the project
    pub groups: Vec<String>,
    /// Name of the application the project belongs to
    pub application: String,
    pub tags: Vec<Tag>,
    pub test: String,
    pub fail_test: bool,
    #[serde(skip)]
    pub project: Option<Project>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct RoleTest {
    pub name: String,
    pub description: String,
    /// Names of the roles this role is composed of
    pub permissions: Vec<String>,
    pub test: String,
    pub fail_test: bool,
    #[serde(skip)]
    pub role: Option<Role>,
}

/// Level a query override is stored at
///
/// Project wins over Application; with neither set the override is stored
/// for the whole tenant.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ScopeDeclaration {
    pub tenant: bool,
    /// Project name
    pub project: String,
    /// Application name
    pub application: String,
}

/// A query override (CxQL source) at some scope
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct QueryTest {
    pub language: String,
    pub group: String,
    pub name: String,
    pub source: String,
    pub scope: ScopeDeclaration,
    pub severity: String,
    /// Compile the source before saving it
    pub compile: bool,
    pub test: String,
    pub fail_test: bool,
    #[serde(skip)]
    pub query: Option<AuditQuery>,
}

/// Reference to a catalog query, by ID or by language/group/name
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct QuerySelector {
    #[serde(rename = "ID")]
    pub id: u64,
    pub language: String,
    pub group: String,
    pub name: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct PresetTest {
    pub name: String,
    pub description: String,
    pub queries: Vec<QuerySelector>,
    pub test: String,
    pub fail_test: bool,
    #[serde(skip)]
    pub preset: Option<Preset>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ScanTest {
    /// Project name
    pub project: String,
    pub branch: String,
    /// Git repository to scan
    pub repository: String,
    /// Comma-separated engine list, `sast` when empty
    pub engine: String,
    pub incremental: bool,
    /// Poll until the scan reaches a terminal status
    pub wait_for_end: bool,
    /// Zip file or source directory to upload; rewritten to an absolute
    /// path by the loader
    pub zip_file: String,
    /// Preset name
    pub preset: String,
    pub test: String,
    pub fail_test: bool,
    #[serde(skip)]
    pub scan: Option<Scan>,
}

/// A finding in the latest scan of a project
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ResultTest {
    #[serde(rename = "ID")]
    pub query_id: u64,
    pub language: String,
    pub group: String,
    pub name: String,
    /// Project name
    pub project: String,
    /// 1-based index among matching findings, 0 picks the first
    pub finding_number: u64,
    #[serde(rename = "SimilarityID")]
    pub similarity_id: i64,
    pub result_hash: String,
    pub state: String,
    pub severity: String,
    pub comment: String,
    pub test: String,
    pub fail_test: bool,
    #[serde(skip)]
    pub result: Option<ScanResult>,
    #[serde(skip)]
    pub project_handle: Option<Project>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let yaml = r#"
Cx1URL: https://eu.ast.example.net
Tenant: acme
LogLevel: debug
Tests:
  - Name: identity
    Wait: 2
    Groups:
      - Name: g1
        Test: C
        ClientRoles:
          - Client: ast-app
            Roles: [ast-viewer]
    Users:
      - Name: u1
        Email: u1@x.com
        Test: CRUD
        Groups: [g1]
        FailTest: true
  - Name: delegated
    File: sub.yaml
"#;
        let doc: TestDocument = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(doc.tenant, "acme");
        assert_eq!(doc.iam_url, "");
        assert_eq!(doc.log_level, "debug");
        assert_eq!(doc.tests.len(), 2);

        let set = &doc.tests[0];
        assert_eq!(set.wait, 2);
        assert_eq!(set.groups[0].client_roles[0].roles, vec!["ast-viewer"]);
        assert!(set.groups[0].group.is_none());
        assert_eq!(set.users[0].groups, vec!["g1"]);
        assert!(set.users[0].fail_test);
        assert_eq!(doc.tests[1].file, "sub.yaml");
        assert!(doc.tests[1].users.is_empty());
    }

    #[test]
    fn test_parse_irregular_keys() {
        let yaml = r#"
Tests:
  - Name: results
    Results:
      - Project: p1
        ID: 42
        SimilarityID: -1234
        ResultHash: abc
        FindingNumber: 2
        Test: RU
    Presets:
      - Name: preset
        Queries:
          - ID: 7
          - Language: Java
            Group: Java_High_Risk
            Name: SQL_Injection
    Applications:
      - Name: app
        Rules:
          - Type: project.name.in
            Value: p1;p2
"#;
        let doc: TestDocument = serde_yaml::from_str(yaml).unwrap();
        let set = &doc.tests[0];
        assert_eq!(set.results[0].query_id, 42);
        assert_eq!(set.results[0].similarity_id, -1234);
        assert_eq!(set.results[0].finding_number, 2);
        assert_eq!(set.presets[0].queries[0].id, 7);
        assert_eq!(set.presets[0].queries[1].name, "SQL_Injection");
        assert_eq!(set.applications[0].rules[0].rule_type, "project.name.in");
    }
}
