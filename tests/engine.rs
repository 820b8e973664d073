//! End-to-end tests for the CRUD test engine
//!
//! These tests drive the full runner against the in-memory backend:
//! 1. Parse or load a test document
//! 2. Run every set through the phase scheduler
//! 3. Check the outcome ledger and the state left behind remotely

use std::path::{Path, PathBuf};
use std::time::Duration;

use crud_e2e::client::{InMemoryClient, QueryScope, RemoteClient, ScanResult};
use crud_e2e::testing::{
    load_document, parse_document, run_tests, Ledger, TestSet, Verdict, UNEXPECTED_PASS,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn parse(yaml: &str) -> Vec<TestSet> {
    parse_document(Path::new("inline.yaml"), yaml).unwrap().tests
}

async fn run(yaml: &str, client: &InMemoryClient) -> (Ledger, Vec<TestSet>) {
    let mut sets = parse(yaml);
    let ledger = run_tests(&mut sets, client).await;
    (ledger, sets)
}

/// (label, verdict) for every record, in ledger order
fn outcomes(ledger: &Ledger) -> Vec<(String, Verdict)> {
    ledger
        .records()
        .iter()
        .map(|r| (r.label.clone(), r.verdict))
        .collect()
}

fn outcome(label: &str, verdict: Verdict) -> (String, Verdict) {
    (label.to_string(), verdict)
}

fn finding(id: &str, query: &str, similarity_id: i64) -> ScanResult {
    ScanResult {
        id: id.to_string(),
        hash: format!("hash-{}", id),
        similarity_id,
        query_id: 101,
        language: "Java".to_string(),
        group: "Java_High_Risk".to_string(),
        query_name: query.to_string(),
        state: "TO_VERIFY".to_string(),
        severity: "High".to_string(),
    }
}

fn platform_backend() -> InMemoryClient {
    InMemoryClient::new()
        .with_query(101, "Java", "Java_High_Risk", "SQL_Injection")
        .with_query(102, "Java", "Java_High_Risk", "XSS")
        .with_findings(
            "storefront",
            vec![
                finding("r1", "XSS", 111),
                finding("r2", "SQL_Injection", 222),
            ],
        )
}

// ============== Phase scheduling ==============

#[tokio::test]
async fn test_user_lifecycle_with_group_created_first() {
    let client = InMemoryClient::new();
    let (ledger, sets) = run(
        r#"
Tests:
  - Name: lifecycle
    Users:
      - Name: u1
        Email: u1@x.com
        Test: CRUD
        Groups: [g1]
    Groups:
      - Name: g1
        Test: C
"#,
        &client,
    )
    .await;

    assert_eq!(
        outcomes(&ledger),
        vec![
            outcome("Create Group", Verdict::Pass),
            outcome("Create User", Verdict::Pass),
            outcome("Read User", Verdict::Pass),
            outcome("Update User", Verdict::Pass),
            outcome("Delete User", Verdict::Pass),
        ]
    );
    assert!(!ledger.has_failures());

    let user = &ledger.records()[1];
    assert_eq!(user.set_name, "lifecycle");
    assert_eq!(user.index, 1);
    assert_eq!(user.target, "u1 (u1@x.com)");

    // Delete cleared the handle and the user is gone remotely.
    assert!(sets[0].users[0].user.is_none());
    assert!(client.get_user_by_name("u1").await.is_err());
    assert!(sets[0].groups[0].group.is_some());
}

#[tokio::test]
async fn test_update_and_delete_without_handle_are_skipped() {
    let client = InMemoryClient::new();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: no-create
    Users:
      - Name: u1
        Email: u1@x.com
        Test: RUD
        Groups: [g1]
"#,
        &client,
    )
    .await;

    let records = ledger.records();
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].label, "Read User");
    assert_eq!(records[0].verdict, Verdict::Fail);
    assert_eq!(records[0].reason.as_deref(), Some("User 'u1' not found"));

    assert_eq!(records[1].verdict, Verdict::Skip);
    assert_eq!(
        records[1].reason.as_deref(),
        Some("invalid test (must read before updating)")
    );
    assert_eq!(records[2].verdict, Verdict::Skip);
    assert_eq!(
        records[2].reason.as_deref(),
        Some("invalid test (must read before deleting)")
    );
    assert!(ledger.has_failures());
}

#[tokio::test]
async fn test_missing_identity_is_skipped_even_for_fail_tests() {
    let client = InMemoryClient::new();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: invalid
    Users:
      - Name: no-email
        Test: C
        FailTest: true
    Groups:
      - Test: CR
"#,
        &client,
    )
    .await;

    let summary = ledger.summary();
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.total(), 3);
    assert!(!ledger.has_failures());

    let reasons: Vec<_> = ledger
        .records()
        .iter()
        .map(|r| r.reason.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(
        reasons,
        vec![
            "invalid test (missing name)",
            "invalid test (missing name or email)",
            "invalid test (missing name)",
        ]
    );
    assert_eq!(client.mutations(), 0);
}

#[tokio::test]
async fn test_phase_letters_are_case_sensitive() {
    let client = InMemoryClient::new();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: lower
    Groups:
      - Name: g1
        Test: crud
"#,
        &client,
    )
    .await;

    assert!(ledger.records().is_empty());
    assert!(client.group_names().is_empty());
}

#[tokio::test]
async fn test_sets_run_in_order_and_share_remote_state() {
    let client = InMemoryClient::new();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: first
    Groups:
      - Name: shared
        Test: C
  - Name: second
    Groups:
      - Name: shared
        Test: RD
"#,
        &client,
    )
    .await;

    let sets: Vec<_> = ledger.records().iter().map(|r| r.set_name.as_str()).collect();
    assert_eq!(sets, vec!["first", "second", "second"]);
    assert!(!ledger.has_failures());
    assert!(client.group_names().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_wait_delays_the_set() {
    let client = InMemoryClient::new();
    let start = tokio::time::Instant::now();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: delayed
    Wait: 30
    Groups:
      - Name: g1
        Test: C
"#,
        &client,
    )
    .await;

    assert!(start.elapsed() >= Duration::from_secs(30));
    assert_eq!(ledger.summary().passed, 1);
}

// ============== FailTest inversion ==============

#[tokio::test]
async fn test_expected_failure_passes() {
    let client = InMemoryClient::new();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: duplicates
    Groups:
      - Name: g1
        Test: C
      - Name: g1
        Test: C
        FailTest: true
"#,
        &client,
    )
    .await;

    assert_eq!(
        outcomes(&ledger),
        vec![
            outcome("Create Group", Verdict::Pass),
            outcome("Create Group", Verdict::Pass),
        ]
    );
    assert!(ledger.records()[1].fail_test);
    assert!(ledger.records()[1].reason.is_none());
}

#[tokio::test]
async fn test_unexpected_success_fails() {
    let client = InMemoryClient::new();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: surprise
    Groups:
      - Name: g1
        Test: C
        FailTest: true
"#,
        &client,
    )
    .await;

    let record = &ledger.records()[0];
    assert_eq!(record.verdict, Verdict::Fail);
    assert_eq!(record.reason.as_deref(), Some(UNEXPECTED_PASS));
    assert!(ledger.has_failures());
    // The remote call still happened.
    assert_eq!(client.group_names(), vec!["g1"]);
}

#[tokio::test]
async fn test_unsupported_operations_are_operation_errors() {
    let client = InMemoryClient::new();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: results
    Results:
      - Project: p1
        Test: C
      - Project: p1
        Test: C
        FailTest: true
"#,
        &client,
    )
    .await;

    let records = ledger.records();
    assert_eq!(records[0].verdict, Verdict::Fail);
    assert_eq!(
        records[0].reason.as_deref(),
        Some("Create is not supported for Result tests")
    );
    assert_eq!(records[1].verdict, Verdict::Pass);
}

// ============== Relational references ==============

#[tokio::test]
async fn test_reference_to_later_set_fails_with_resolution_error() {
    let client = InMemoryClient::new();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: early
    Projects:
      - Name: p1
        Groups: [late-group]
        Test: C
  - Name: late
    Groups:
      - Name: late-group
        Test: C
"#,
        &client,
    )
    .await;

    let records = ledger.records();
    assert_eq!(records[0].label, "Create Project");
    assert_eq!(records[0].verdict, Verdict::Fail);
    assert_eq!(
        records[0].reason.as_deref(),
        Some("failed to find group late-group: Group 'late-group' not found")
    );
    assert_eq!(records[1].verdict, Verdict::Pass);
    assert!(client.get_project_by_name("p1").await.is_err());
}

#[tokio::test]
async fn test_parent_group_must_be_declared_first() {
    let client = InMemoryClient::new();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: tree
    Groups:
      - Name: child
        Parent: parent
        Test: C
      - Name: parent
        Test: C
      - Name: second-child
        Parent: parent
        Test: C
"#,
        &client,
    )
    .await;

    let verdicts: Vec<_> = ledger.records().iter().map(|r| r.verdict).collect();
    assert_eq!(verdicts, vec![Verdict::Fail, Verdict::Pass, Verdict::Pass]);
    assert_eq!(ledger.records()[2].target, "/parent/second-child");
}

#[tokio::test]
async fn test_role_created_in_same_set_resolves_for_user() {
    let client = InMemoryClient::new().with_role("view-results");
    let (ledger, _) = run(
        r#"
Tests:
  - Name: roles
    Users:
      - Name: u1
        Email: u1@x.com
        Roles: [auditor]
        Test: C
    Roles:
      - Name: auditor
        Permissions: [view-results]
        Test: C
"#,
        &client,
    )
    .await;

    assert_eq!(
        outcomes(&ledger),
        vec![
            outcome("Create Role", Verdict::Pass),
            outcome("Create User", Verdict::Pass),
        ]
    );
}

#[tokio::test]
async fn test_missing_permission_fails_role_create() {
    let client = InMemoryClient::new();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: roles
    Roles:
      - Name: auditor
        Permissions: [does-not-exist]
        Test: C
"#,
        &client,
    )
    .await;

    let record = &ledger.records()[0];
    assert_eq!(record.verdict, Verdict::Fail);
    assert!(record
        .reason
        .as_deref()
        .unwrap_or_default()
        .starts_with("failed to find permission does-not-exist"));
}

// ============== Reconciliation ==============

const MEMBERSHIP_SETUP: &str = r#"
Tests:
  - Name: setup
    Groups:
      - Name: g1
        Test: C
      - Name: g2
        Test: C
      - Name: g3
        Test: C
    Users:
      - Name: u1
        Email: u1@x.com
        Groups: [g1, g2]
        Roles: [r1]
        Test: C
"#;

#[tokio::test]
async fn test_update_reconciliation_is_idempotent() {
    let client = InMemoryClient::new().with_role("r1").with_role("r2");
    let (ledger, _) = run(MEMBERSHIP_SETUP, &client).await;
    assert!(!ledger.has_failures());

    let update = r#"
Tests:
  - Name: update
    Users:
      - Name: u1
        Email: u1@x.com
        Groups: [g2, g3]
        Roles: [r2]
        Test: RU
"#;

    // g3 added, g1 removed, one batched role grant, one batched revoke.
    let before = client.membership_mutations();
    let (ledger, _) = run(update, &client).await;
    assert!(!ledger.has_failures());
    assert_eq!(client.membership_mutations() - before, 4);

    let mut groups = client.user_group_names("u1");
    groups.sort();
    assert_eq!(groups, vec!["g2", "g3"]);

    let before = client.membership_mutations();
    let (ledger, _) = run(update, &client).await;
    assert!(!ledger.has_failures());
    assert_eq!(client.membership_mutations(), before);
}

#[tokio::test]
async fn test_create_reconciles_memberships_once() {
    let client = InMemoryClient::new().with_role("r1");
    let (ledger, _) = run(MEMBERSHIP_SETUP, &client).await;
    assert_eq!(ledger.summary().passed, 4);

    // Two group joins and one batched role grant.
    assert_eq!(client.membership_mutations(), 3);
    let mut groups = client.user_group_names("u1");
    groups.sort();
    assert_eq!(groups, vec!["g1", "g2"]);
}

#[tokio::test]
async fn test_failed_create_still_leaves_handle_for_delete() {
    let client = InMemoryClient::new();
    let (ledger, sets) = run(
        r#"
Tests:
  - Name: bad-group
    Users:
      - Name: u1
        Email: u1@x.com
        Groups: [nowhere]
        Test: CD
"#,
        &client,
    )
    .await;

    assert_eq!(
        outcomes(&ledger),
        vec![
            outcome("Create User", Verdict::Fail),
            outcome("Delete User", Verdict::Pass),
        ]
    );
    assert!(sets[0].users[0].user.is_none());
}

#[tokio::test]
async fn test_group_client_roles() {
    let client = InMemoryClient::new()
        .with_client_role("ast-app", "ast-viewer")
        .with_client_role("ast-app", "ast-scanner");
    let (ledger, sets) = run(
        r#"
Tests:
  - Name: client-roles
    Groups:
      - Name: g1
        ClientRoles:
          - Client: ast-app
            Roles: [ast-viewer, ast-scanner]
        Test: CU
"#,
        &client,
    )
    .await;

    assert!(!ledger.has_failures());
    let group = sets[0].groups[0].group.as_ref().unwrap();
    let roles = client.get_group_client_roles(group, "ast-app").await.unwrap();
    assert_eq!(roles.len(), 2);
    // Create added both in one call; the update found nothing to change.
    assert_eq!(client.membership_mutations(), 1);
}

// ============== Platform entities ==============

#[tokio::test]
async fn test_query_override_lifecycle() {
    let client = InMemoryClient::new();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: queries
    Queries:
      - Language: Java
        Group: Java_High_Risk
        Name: SQL_Injection
        Source: "result = All.NewCxList();"
        Compile: true
        Test: CRUD
      - Language: Java
        Group: Java_High_Risk
        Name: XSS
        Source: "return nothing;"
        Compile: true
        Test: C
        FailTest: true
"#,
        &client,
    )
    .await;

    assert!(!ledger.has_failures());
    // The override that doesn't compile is never saved.
    let scope = QueryScope::Tenant;
    assert!(client
        .get_audit_query(&scope, "Java", "Java_High_Risk", "XSS")
        .await
        .is_err());
    assert_eq!(
        ledger.records()[0].target,
        "Tenant: Java -> Java_High_Risk -> SQL_Injection"
    );
    assert_eq!(ledger.summary().total(), 5);
}

#[tokio::test]
async fn test_duplicate_query_override_conflicts() {
    let client = InMemoryClient::new();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: queries
    Queries:
      - Language: Go
        Group: Go_Medium_Threats
        Name: Log_Forging
        Source: "result = base.Log_Forging();"
        Test: C
      - Language: Go
        Group: Go_Medium_Threats
        Name: Log_Forging
        Source: "result = base.Log_Forging();"
        Test: C
"#,
        &client,
    )
    .await;

    let verdicts: Vec<_> = ledger.records().iter().map(|r| r.verdict).collect();
    assert_eq!(verdicts, vec![Verdict::Pass, Verdict::Fail]);
}

#[tokio::test]
async fn test_preset_with_unknown_query_fails() {
    let client = platform_backend();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: presets
    Presets:
      - Name: broken
        Queries:
          - ID: 999
        Test: C
"#,
        &client,
    )
    .await;

    let record = &ledger.records()[0];
    assert_eq!(record.verdict, Verdict::Fail);
    assert!(record
        .reason
        .as_deref()
        .unwrap_or_default()
        .starts_with("failed to find query QueryID#999"));
}

#[tokio::test]
async fn test_scan_update_is_not_supported() {
    let client = platform_backend();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: scans
    Projects:
      - Name: storefront
        Test: C
    Scans:
      - Project: storefront
        Repository: https://git.example.net/storefront.git
        Branch: main
        Test: CUD
"#,
        &client,
    )
    .await;

    assert_eq!(
        outcomes(&ledger),
        vec![
            outcome("Create Project", Verdict::Pass),
            outcome("Create Scan", Verdict::Pass),
            outcome("Update Scan", Verdict::Fail),
            outcome("Delete Scan", Verdict::Pass),
        ]
    );
}

#[tokio::test]
async fn test_missing_project_reads_the_same_for_scans_and_results() {
    let client = platform_backend();
    let (ledger, _) = run(
        r#"
Tests:
  - Name: orphans
    Scans:
      - Project: nowhere
        Test: R
    Results:
      - Project: nowhere
        Test: R
"#,
        &client,
    )
    .await;

    let reasons: Vec<_> = ledger
        .records()
        .iter()
        .map(|r| (r.label.as_str(), r.reason.as_deref().unwrap_or_default()))
        .collect();
    let expected = "failed to find project nowhere: Project 'nowhere' not found";
    assert_eq!(
        reasons,
        vec![("Read Scan", expected), ("Read Result", expected)]
    );
}

// ============== Whole documents ==============

#[tokio::test]
async fn test_fixture_document_runs_clean() {
    let mut document = load_document(&fixtures_dir().join("root.yaml")).unwrap();

    // Root set #2 delegates to a document with two sets.
    let names: Vec<_> = document.tests.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["identity", "projects", "scanning", "cleanup"]);
    assert_eq!(document.tenant, "acme");
    assert!(Path::new(&document.tests[2].scans[0].zip_file).is_absolute());

    let client = platform_backend();
    let ledger = run_tests(&mut document.tests, &client).await;

    let failures: Vec<_> = ledger
        .records()
        .iter()
        .filter(|r| r.verdict != Verdict::Pass)
        .map(|r| format!("{} #{}: {:?}", r.label, r.index, r.reason))
        .collect();
    assert!(failures.is_empty(), "unexpected outcomes: {:?}", failures);
    assert_eq!(ledger.summary().total(), 28);

    // The Result update triaged the SQL injection finding.
    let predicates = client.predicates();
    assert_eq!(predicates.len(), 1);
    assert_eq!(predicates[0].0, "222");
    assert_eq!(predicates[0].1.state, "CONFIRMED");

    // Cleanup removed the identity objects again.
    assert!(client.group_names().is_empty());
    assert!(client.get_user_by_name("dev1").await.is_err());
}
