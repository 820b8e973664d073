//! Remote Entity Client
//!
//! The runner only talks to the remote system through [`RemoteClient`].
//! [`HttpClient`] speaks the real REST APIs. With the `test-support`
//! feature, `InMemoryClient` adds an in-process backend for the test suite.

pub mod http;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod types;

use async_trait::async_trait;

use crate::common::Result;

pub use http::HttpClient;
#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryClient;
pub use types::*;

/// One operation per entity action, plus membership queries and mutations
///
/// Every call either returns a value or an error carrying a readable
/// message. Lookups by name fail with `Error::NotFound` when nothing
/// matches exactly.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    // === Groups ===
    async fn get_group_by_name(&self, name: &str) -> Result<Group>;
    async fn create_group(&self, name: &str, parent: Option<&Group>) -> Result<Group>;
    async fn update_group(&self, group: &Group) -> Result<()>;
    async fn delete_group(&self, group: &Group) -> Result<()>;
    async fn get_client_role_by_name(&self, client_id: &str, name: &str) -> Result<Role>;
    async fn get_group_client_roles(&self, group: &Group, client_id: &str) -> Result<Vec<Role>>;
    async fn add_group_client_roles(
        &self,
        group: &Group,
        client_id: &str,
        roles: &[Role],
    ) -> Result<()>;
    async fn remove_group_client_roles(
        &self,
        group: &Group,
        client_id: &str,
        roles: &[Role],
    ) -> Result<()>;

    // === Users ===
    async fn create_user(&self, user: &User) -> Result<User>;
    async fn get_user_by_name(&self, username: &str) -> Result<User>;
    async fn get_user_by_email(&self, email: &str) -> Result<User>;
    async fn update_user(&self, user: &User) -> Result<()>;
    async fn delete_user(&self, user: &User) -> Result<()>;
    async fn get_user_groups(&self, user: &User) -> Result<Vec<Group>>;
    async fn add_user_to_group(&self, user: &User, group_id: &str) -> Result<()>;
    async fn remove_user_from_group(&self, user: &User, group_id: &str) -> Result<()>;
    async fn get_user_roles(&self, user: &User) -> Result<Vec<Role>>;
    async fn add_user_roles(&self, user: &User, roles: &[Role]) -> Result<()>;
    async fn remove_user_roles(&self, user: &User, roles: &[Role]) -> Result<()>;

    // === Roles ===
    async fn create_role(&self, name: &str, description: &str) -> Result<Role>;
    async fn get_role_by_name(&self, name: &str) -> Result<Role>;
    async fn update_role(&self, role: &Role) -> Result<()>;
    async fn delete_role(&self, role: &Role) -> Result<()>;
    async fn get_role_composites(&self, role: &Role) -> Result<Vec<Role>>;
    async fn add_role_composites(&self, role: &Role, composites: &[Role]) -> Result<()>;
    async fn remove_role_composites(&self, role: &Role, composites: &[Role]) -> Result<()>;

    // === Applications ===
    async fn create_application(&self, application: &Application) -> Result<Application>;
    async fn get_application_by_name(&self, name: &str) -> Result<Application>;
    async fn update_application(&self, application: &Application) -> Result<()>;
    async fn delete_application(&self, application: &Application) -> Result<()>;

    // === Projects ===
    async fn create_project(&self, project: &Project) -> Result<Project>;
    async fn get_project_by_name(&self, name: &str) -> Result<Project>;
    async fn update_project(&self, project: &Project) -> Result<()>;
    async fn delete_project(&self, project: &Project) -> Result<()>;

    // === Queries ===
    async fn get_query_by_id(&self, id: u64) -> Result<Query>;
    async fn get_query_by_name(&self, language: &str, group: &str, name: &str) -> Result<Query>;
    async fn get_audit_query(
        &self,
        scope: &QueryScope,
        language: &str,
        group: &str,
        name: &str,
    ) -> Result<AuditQuery>;
    async fn save_audit_query(&self, query: &AuditQuery) -> Result<AuditQuery>;
    async fn compile_audit_query(&self, query: &AuditQuery) -> Result<()>;
    async fn delete_audit_query(&self, query: &AuditQuery) -> Result<()>;

    // === Presets ===
    async fn create_preset(&self, preset: &Preset) -> Result<Preset>;
    async fn get_preset_by_name(&self, name: &str) -> Result<Preset>;
    async fn update_preset(&self, preset: &Preset) -> Result<()>;
    async fn delete_preset(&self, preset: &Preset) -> Result<()>;

    // === Scans ===
    async fn start_scan(&self, request: &ScanRequest) -> Result<Scan>;
    async fn get_scan_by_id(&self, id: &str) -> Result<Scan>;
    async fn get_last_scan(&self, project: &Project, branch: Option<&str>) -> Result<Scan>;
    async fn delete_scan(&self, scan: &Scan) -> Result<()>;

    // === Results ===
    async fn get_scan_results(&self, scan: &Scan) -> Result<Vec<ScanResult>>;
    async fn add_result_predicate(
        &self,
        project: &Project,
        result: &ScanResult,
        predicate: &ResultPredicate,
    ) -> Result<()>;
}
