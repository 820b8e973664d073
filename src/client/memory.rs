//! In-process remote backend
//!
//! Behaves like the real platform where the runner can observe it: names
//! are unique per kind, lookups miss with `NotFound`, memberships live in
//! their own tables and scans finish immediately. Every mutating call is
//! counted so tests can assert on reconciliation traffic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::types::*;
use super::RemoteClient;
use crate::common::{Error, Result};

const SEVERITIES: &[&str] = &["Info", "Low", "Medium", "High", "Critical"];
const RESULT_STATES: &[&str] = &[
    "TO_VERIFY",
    "NOT_EXPLOITABLE",
    "PROPOSED_NOT_EXPLOITABLE",
    "CONFIRMED",
    "URGENT",
];
const ENGINES: &[&str] = &["sast", "sca", "kics", "apisec"];

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    groups: Vec<Group>,
    /// (group id, client id) -> role names
    group_client_roles: HashMap<(String, String), Vec<String>>,
    /// client id -> roles the client offers
    client_roles: HashMap<String, Vec<Role>>,
    users: Vec<User>,
    /// user id -> group ids
    user_groups: HashMap<String, Vec<String>>,
    /// user id -> role ids
    user_roles: HashMap<String, Vec<String>>,
    roles: Vec<Role>,
    /// role id -> composite role ids
    role_composites: HashMap<String, Vec<String>>,
    applications: Vec<Application>,
    projects: Vec<Project>,
    catalog: Vec<Query>,
    audit_queries: Vec<AuditQuery>,
    presets: Vec<Preset>,
    scans: Vec<Scan>,
    /// project name -> findings every scan of that project produces
    findings: HashMap<String, Vec<ScanResult>>,
    /// scan id -> findings
    scan_results: HashMap<String, Vec<ScanResult>>,
    predicates: Vec<(String, ResultPredicate)>,
    mutations: usize,
    membership_mutations: usize,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn mutated(&mut self) {
        self.mutations += 1;
    }

    fn membership_mutated(&mut self) {
        self.mutations += 1;
        self.membership_mutations += 1;
    }

    fn group_index(&self, id: &str) -> Result<usize> {
        self.groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| Error::not_found("Group", id))
    }

    fn user_index(&self, id: &str) -> Result<usize> {
        self.users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| Error::not_found("User", id))
    }

    fn role_index(&self, id: &str) -> Result<usize> {
        self.roles
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::not_found("Role", id))
    }

    fn application_index(&self, id: &str) -> Result<usize> {
        self.applications
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| Error::not_found("Application", id))
    }

    fn project_index(&self, id: &str) -> Result<usize> {
        self.projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::not_found("Project", id))
    }

    fn preset_index(&self, id: u64) -> Result<usize> {
        self.presets
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::not_found("Preset", id.to_string()))
    }

    fn roles_by_ids(&self, ids: &[String]) -> Vec<Role> {
        ids.iter()
            .filter_map(|id| self.roles.iter().find(|r| &r.id == id).cloned())
            .collect()
    }

    fn validate_project(&self, project: &Project) -> Result<()> {
        if project.name.is_empty() {
            return Err(Error::validation("project", "name must not be empty"));
        }
        for group in &project.groups {
            self.group_index(group)?;
        }
        for application in &project.application_ids {
            self.application_index(application)?;
        }
        Ok(())
    }

    /// Keep application membership lists in line with a project's links
    fn link_project(&mut self, project: &Project) {
        for app in &mut self.applications {
            let linked = project.application_ids.contains(&app.id);
            let listed = app.project_ids.contains(&project.id);
            if linked && !listed {
                app.project_ids.push(project.id.clone());
            } else if !linked && listed {
                app.project_ids.retain(|id| id != &project.id);
            }
        }
    }
}

/// In-memory implementation of [`RemoteClient`]
#[derive(Default)]
pub struct InMemoryClient {
    state: Mutex<MemoryState>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query to the catalog
    pub fn with_query(self, id: u64, language: &str, group: &str, name: &str) -> Self {
        self.state().catalog.push(Query {
            id,
            language: language.to_string(),
            group: group.to_string(),
            name: name.to_string(),
            severity: "High".to_string(),
        });
        self
    }

    /// Register a role offered by an IAM client
    pub fn with_client_role(self, client_id: &str, name: &str) -> Self {
        {
            let mut state = self.state();
            let id = state.next_id("client-role");
            state
                .client_roles
                .entry(client_id.to_string())
                .or_default()
                .push(Role {
                    id,
                    name: name.to_string(),
                    description: String::new(),
                    composite: false,
                });
        }
        self
    }

    /// Register an existing IAM role
    pub fn with_role(self, name: &str) -> Self {
        {
            let mut state = self.state();
            let id = state.next_id("role");
            state.roles.push(Role {
                id,
                name: name.to_string(),
                description: String::new(),
                composite: false,
            });
        }
        self
    }

    /// Findings produced by every scan of the named project
    pub fn with_findings(self, project_name: &str, findings: Vec<ScanResult>) -> Self {
        self.state()
            .findings
            .insert(project_name.to_string(), findings);
        self
    }

    /// Total number of mutating calls served
    pub fn mutations(&self) -> usize {
        self.state().mutations
    }

    /// Number of group, role and composite membership add/remove calls served
    pub fn membership_mutations(&self) -> usize {
        self.state().membership_mutations
    }

    /// Names of all groups currently present
    pub fn group_names(&self) -> Vec<String> {
        self.state().groups.iter().map(|g| g.name.clone()).collect()
    }

    /// Group names the named user belongs to
    pub fn user_group_names(&self, username: &str) -> Vec<String> {
        let state = self.state();
        let Some(user) = state.users.iter().find(|u| u.username == username) else {
            return Vec::new();
        };
        state
            .user_groups
            .get(&user.id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.groups.iter().find(|g| &g.id == id))
                    .map(|g| g.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Predicates recorded so far, keyed by finding similarity id
    pub fn predicates(&self) -> Vec<(String, ResultPredicate)> {
        self.state().predicates.clone()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_severity(value: &str) -> bool {
    value.is_empty() || SEVERITIES.iter().any(|s| s.eq_ignore_ascii_case(value))
}

#[async_trait]
impl RemoteClient for InMemoryClient {
    // === Groups ===

    async fn get_group_by_name(&self, name: &str) -> Result<Group> {
        self.state()
            .groups
            .iter()
            .find(|g| g.name == name)
            .cloned()
            .ok_or_else(|| Error::not_found("Group", name))
    }

    async fn create_group(&self, name: &str, parent: Option<&Group>) -> Result<Group> {
        let mut state = self.state();
        if name.is_empty() {
            return Err(Error::validation("group", "name must not be empty"));
        }
        if state.groups.iter().any(|g| g.name == name) {
            return Err(Error::conflict("Group", name));
        }
        let path = match parent {
            Some(parent) => {
                let index = state.group_index(&parent.id)?;
                format!("{}/{}", state.groups[index].path, name)
            }
            None => format!("/{}", name),
        };
        let group = Group {
            id: state.next_id("group"),
            name: name.to_string(),
            path,
            parent_id: parent.map(|p| p.id.clone()),
            sub_groups: Vec::new(),
        };
        state.groups.push(group.clone());
        state.mutated();
        Ok(group)
    }

    async fn update_group(&self, group: &Group) -> Result<()> {
        let mut state = self.state();
        let index = state.group_index(&group.id)?;
        state.groups[index].name = group.name.clone();
        state.mutated();
        Ok(())
    }

    async fn delete_group(&self, group: &Group) -> Result<()> {
        let mut state = self.state();
        let index = state.group_index(&group.id)?;
        let prefix = format!("{}/", state.groups[index].path);
        let removed: Vec<String> = state
            .groups
            .iter()
            .filter(|g| g.id == group.id || g.path.starts_with(&prefix))
            .map(|g| g.id.clone())
            .collect();
        state.groups.retain(|g| !removed.contains(&g.id));
        for memberships in state.user_groups.values_mut() {
            memberships.retain(|id| !removed.contains(id));
        }
        state
            .group_client_roles
            .retain(|(group_id, _), _| !removed.contains(group_id));
        state.mutated();
        Ok(())
    }

    async fn get_client_role_by_name(&self, client_id: &str, name: &str) -> Result<Role> {
        self.state()
            .client_roles
            .get(client_id)
            .and_then(|roles| roles.iter().find(|r| r.name == name))
            .cloned()
            .ok_or_else(|| Error::not_found("Client role", format!("{}/{}", client_id, name)))
    }

    async fn get_group_client_roles(&self, group: &Group, client_id: &str) -> Result<Vec<Role>> {
        let state = self.state();
        state.group_index(&group.id)?;
        let names = state
            .group_client_roles
            .get(&(group.id.clone(), client_id.to_string()))
            .cloned()
            .unwrap_or_default();
        let offered = state.client_roles.get(client_id);
        Ok(names
            .iter()
            .filter_map(|n| offered.and_then(|roles| roles.iter().find(|r| &r.name == n)))
            .cloned()
            .collect())
    }

    async fn add_group_client_roles(
        &self,
        group: &Group,
        client_id: &str,
        roles: &[Role],
    ) -> Result<()> {
        let mut state = self.state();
        state.group_index(&group.id)?;
        for role in roles {
            let offered = state
                .client_roles
                .get(client_id)
                .is_some_and(|r| r.iter().any(|r| r.name == role.name));
            if !offered {
                return Err(Error::not_found(
                    "Client role",
                    format!("{}/{}", client_id, role.name),
                ));
            }
        }
        let mapping = state
            .group_client_roles
            .entry((group.id.clone(), client_id.to_string()))
            .or_default();
        for role in roles {
            if !mapping.contains(&role.name) {
                mapping.push(role.name.clone());
            }
        }
        state.membership_mutated();
        Ok(())
    }

    async fn remove_group_client_roles(
        &self,
        group: &Group,
        client_id: &str,
        roles: &[Role],
    ) -> Result<()> {
        let mut state = self.state();
        state.group_index(&group.id)?;
        if let Some(mapping) = state
            .group_client_roles
            .get_mut(&(group.id.clone(), client_id.to_string()))
        {
            mapping.retain(|name| !roles.iter().any(|r| &r.name == name));
        }
        state.membership_mutated();
        Ok(())
    }

    // === Users ===

    async fn create_user(&self, user: &User) -> Result<User> {
        let mut state = self.state();
        if user.username.is_empty() {
            return Err(Error::validation("user", "username must not be empty"));
        }
        if !user.email.contains('@') {
            return Err(Error::validation(
                "user",
                format!("'{}' is not a valid email address", user.email),
            ));
        }
        if state.users.iter().any(|u| u.username == user.username) {
            return Err(Error::conflict("User", &user.username));
        }
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(Error::conflict("User", &user.email));
        }
        let mut created = user.clone();
        created.id = state.next_id("user");
        state.users.push(created.clone());
        state.mutated();
        Ok(created)
    }

    async fn get_user_by_name(&self, username: &str) -> Result<User> {
        self.state()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| Error::not_found("User", username))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.state()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| Error::not_found("User", email))
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut state = self.state();
        let index = state.user_index(&user.id)?;
        if !user.email.contains('@') {
            return Err(Error::validation(
                "user",
                format!("'{}' is not a valid email address", user.email),
            ));
        }
        state.users[index] = user.clone();
        state.mutated();
        Ok(())
    }

    async fn delete_user(&self, user: &User) -> Result<()> {
        let mut state = self.state();
        let index = state.user_index(&user.id)?;
        state.users.remove(index);
        state.user_groups.remove(&user.id);
        state.user_roles.remove(&user.id);
        state.mutated();
        Ok(())
    }

    async fn get_user_groups(&self, user: &User) -> Result<Vec<Group>> {
        let state = self.state();
        state.user_index(&user.id)?;
        Ok(state
            .user_groups
            .get(&user.id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.groups.iter().find(|g| &g.id == id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add_user_to_group(&self, user: &User, group_id: &str) -> Result<()> {
        let mut state = self.state();
        state.user_index(&user.id)?;
        state.group_index(group_id)?;
        let groups = state.user_groups.entry(user.id.clone()).or_default();
        if !groups.iter().any(|id| id == group_id) {
            groups.push(group_id.to_string());
        }
        state.membership_mutated();
        Ok(())
    }

    async fn remove_user_from_group(&self, user: &User, group_id: &str) -> Result<()> {
        let mut state = self.state();
        state.user_index(&user.id)?;
        if let Some(groups) = state.user_groups.get_mut(&user.id) {
            groups.retain(|id| id != group_id);
        }
        state.membership_mutated();
        Ok(())
    }

    async fn get_user_roles(&self, user: &User) -> Result<Vec<Role>> {
        let state = self.state();
        state.user_index(&user.id)?;
        let ids = state.user_roles.get(&user.id).cloned().unwrap_or_default();
        Ok(state.roles_by_ids(&ids))
    }

    async fn add_user_roles(&self, user: &User, roles: &[Role]) -> Result<()> {
        let mut state = self.state();
        state.user_index(&user.id)?;
        for role in roles {
            state.role_index(&role.id)?;
        }
        let assigned = state.user_roles.entry(user.id.clone()).or_default();
        for role in roles {
            if !assigned.contains(&role.id) {
                assigned.push(role.id.clone());
            }
        }
        state.membership_mutated();
        Ok(())
    }

    async fn remove_user_roles(&self, user: &User, roles: &[Role]) -> Result<()> {
        let mut state = self.state();
        state.user_index(&user.id)?;
        if let Some(assigned) = state.user_roles.get_mut(&user.id) {
            assigned.retain(|id| !roles.iter().any(|r| &r.id == id));
        }
        state.membership_mutated();
        Ok(())
    }

    // === Roles ===

    async fn create_role(&self, name: &str, description: &str) -> Result<Role> {
        let mut state = self.state();
        if name.is_empty() {
            return Err(Error::validation("role", "name must not be empty"));
        }
        if state.roles.iter().any(|r| r.name == name) {
            return Err(Error::conflict("Role", name));
        }
        let role = Role {
            id: state.next_id("role"),
            name: name.to_string(),
            description: description.to_string(),
            composite: false,
        };
        state.roles.push(role.clone());
        state.mutated();
        Ok(role)
    }

    async fn get_role_by_name(&self, name: &str) -> Result<Role> {
        self.state()
            .roles
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| Error::not_found("Role", name))
    }

    async fn update_role(&self, role: &Role) -> Result<()> {
        let mut state = self.state();
        let index = state.role_index(&role.id)?;
        state.roles[index].description = role.description.clone();
        state.mutated();
        Ok(())
    }

    async fn delete_role(&self, role: &Role) -> Result<()> {
        let mut state = self.state();
        let index = state.role_index(&role.id)?;
        state.roles.remove(index);
        state.role_composites.remove(&role.id);
        for composites in state.role_composites.values_mut() {
            composites.retain(|id| id != &role.id);
        }
        for assigned in state.user_roles.values_mut() {
            assigned.retain(|id| id != &role.id);
        }
        state.mutated();
        Ok(())
    }

    async fn get_role_composites(&self, role: &Role) -> Result<Vec<Role>> {
        let state = self.state();
        state.role_index(&role.id)?;
        let ids = state
            .role_composites
            .get(&role.id)
            .cloned()
            .unwrap_or_default();
        Ok(state.roles_by_ids(&ids))
    }

    async fn add_role_composites(&self, role: &Role, composites: &[Role]) -> Result<()> {
        let mut state = self.state();
        let index = state.role_index(&role.id)?;
        for composite in composites {
            state.role_index(&composite.id)?;
        }
        state.roles[index].composite = true;
        let existing = state.role_composites.entry(role.id.clone()).or_default();
        for composite in composites {
            if !existing.contains(&composite.id) {
                existing.push(composite.id.clone());
            }
        }
        state.membership_mutated();
        Ok(())
    }

    async fn remove_role_composites(&self, role: &Role, composites: &[Role]) -> Result<()> {
        let mut state = self.state();
        let index = state.role_index(&role.id)?;
        let remaining = match state.role_composites.get_mut(&role.id) {
            Some(existing) => {
                existing.retain(|id| !composites.iter().any(|c| &c.id == id));
                existing.len()
            }
            None => 0,
        };
        state.roles[index].composite = remaining > 0;
        state.membership_mutated();
        Ok(())
    }

    // === Applications ===

    async fn create_application(&self, application: &Application) -> Result<Application> {
        let mut state = self.state();
        if application.name.is_empty() {
            return Err(Error::validation("application", "name must not be empty"));
        }
        if application.criticality > 5 {
            return Err(Error::validation(
                "application",
                format!("criticality {} is out of range 1-5", application.criticality),
            ));
        }
        if state.applications.iter().any(|a| a.name == application.name) {
            return Err(Error::conflict("Application", &application.name));
        }
        let mut created = application.clone();
        created.id = state.next_id("application");
        if created.criticality == 0 {
            created.criticality = 3;
        }
        state.applications.push(created.clone());
        state.mutated();
        Ok(created)
    }

    async fn get_application_by_name(&self, name: &str) -> Result<Application> {
        self.state()
            .applications
            .iter()
            .find(|a| a.name == name)
            .cloned()
            .ok_or_else(|| Error::not_found("Application", name))
    }

    async fn update_application(&self, application: &Application) -> Result<()> {
        let mut state = self.state();
        let index = state.application_index(&application.id)?;
        if application.criticality > 5 {
            return Err(Error::validation(
                "application",
                format!("criticality {} is out of range 1-5", application.criticality),
            ));
        }
        let project_ids = state.applications[index].project_ids.clone();
        state.applications[index] = Application {
            project_ids,
            ..application.clone()
        };
        state.mutated();
        Ok(())
    }

    async fn delete_application(&self, application: &Application) -> Result<()> {
        let mut state = self.state();
        let index = state.application_index(&application.id)?;
        state.applications.remove(index);
        for project in &mut state.projects {
            project.application_ids.retain(|id| id != &application.id);
        }
        state.mutated();
        Ok(())
    }

    // === Projects ===

    async fn create_project(&self, project: &Project) -> Result<Project> {
        let mut state = self.state();
        state.validate_project(project)?;
        if state.projects.iter().any(|p| p.name == project.name) {
            return Err(Error::conflict("Project", &project.name));
        }
        let mut created = project.clone();
        created.id = state.next_id("project");
        state.projects.push(created.clone());
        state.link_project(&created);
        state.mutated();
        Ok(created)
    }

    async fn get_project_by_name(&self, name: &str) -> Result<Project> {
        self.state()
            .projects
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| Error::not_found("Project", name))
    }

    async fn update_project(&self, project: &Project) -> Result<()> {
        let mut state = self.state();
        let index = state.project_index(&project.id)?;
        state.validate_project(project)?;
        state.projects[index] = project.clone();
        state.link_project(project);
        state.mutated();
        Ok(())
    }

    async fn delete_project(&self, project: &Project) -> Result<()> {
        let mut state = self.state();
        let index = state.project_index(&project.id)?;
        state.projects.remove(index);
        for app in &mut state.applications {
            app.project_ids.retain(|id| id != &project.id);
        }
        state.mutated();
        Ok(())
    }

    // === Queries ===

    async fn get_query_by_id(&self, id: u64) -> Result<Query> {
        self.state()
            .catalog
            .iter()
            .find(|q| q.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("Query", format!("#{}", id)))
    }

    async fn get_query_by_name(&self, language: &str, group: &str, name: &str) -> Result<Query> {
        self.state()
            .catalog
            .iter()
            .find(|q| q.language == language && q.group == group && q.name == name)
            .cloned()
            .ok_or_else(|| {
                Error::not_found("Query", format!("{} -> {} -> {}", language, group, name))
            })
    }

    async fn get_audit_query(
        &self,
        scope: &QueryScope,
        language: &str,
        group: &str,
        name: &str,
    ) -> Result<AuditQuery> {
        self.state()
            .audit_queries
            .iter()
            .find(|q| {
                &q.scope == scope && q.language == language && q.group == group && q.name == name
            })
            .cloned()
            .ok_or_else(|| {
                Error::not_found(
                    "Query",
                    format!("{}: {} -> {} -> {}", scope, language, group, name),
                )
            })
    }

    async fn save_audit_query(&self, query: &AuditQuery) -> Result<AuditQuery> {
        let mut state = self.state();
        if !is_severity(&query.severity) {
            return Err(Error::validation(
                "query",
                format!("unknown severity '{}'", query.severity),
            ));
        }
        match &query.scope {
            QueryScope::Tenant => {}
            QueryScope::Project(id) => {
                state.project_index(id)?;
            }
            QueryScope::Application(id) => {
                state.application_index(id)?;
            }
        }
        let existing = state.audit_queries.iter().position(|q| {
            q.scope == query.scope
                && q.language == query.language
                && q.group == query.group
                && q.name == query.name
        });
        match existing {
            Some(index) => state.audit_queries[index] = query.clone(),
            None => state.audit_queries.push(query.clone()),
        }
        state.mutated();
        Ok(query.clone())
    }

    async fn compile_audit_query(&self, query: &AuditQuery) -> Result<()> {
        // A query must assign its findings to `result` to compile.
        if query.source.contains("result") {
            Ok(())
        } else {
            Err(Error::Compile(format!(
                "{} does not assign a result",
                query.path()
            )))
        }
    }

    async fn delete_audit_query(&self, query: &AuditQuery) -> Result<()> {
        let mut state = self.state();
        let index = state
            .audit_queries
            .iter()
            .position(|q| {
                q.scope == query.scope
                    && q.language == query.language
                    && q.group == query.group
                    && q.name == query.name
            })
            .ok_or_else(|| Error::not_found("Query", query.path()))?;
        state.audit_queries.remove(index);
        state.mutated();
        Ok(())
    }

    // === Presets ===

    async fn create_preset(&self, preset: &Preset) -> Result<Preset> {
        let mut state = self.state();
        if preset.name.is_empty() {
            return Err(Error::validation("preset", "name must not be empty"));
        }
        if state.presets.iter().any(|p| p.name == preset.name) {
            return Err(Error::conflict("Preset", &preset.name));
        }
        if let Some(missing) = preset
            .query_ids
            .iter()
            .find(|id| !state.catalog.iter().any(|q| q.id == **id))
        {
            return Err(Error::validation(
                "preset",
                format!("query #{} does not exist", missing),
            ));
        }
        state.next_id += 1;
        let mut created = preset.clone();
        created.id = state.next_id;
        state.presets.push(created.clone());
        state.mutated();
        Ok(created)
    }

    async fn get_preset_by_name(&self, name: &str) -> Result<Preset> {
        self.state()
            .presets
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| Error::not_found("Preset", name))
    }

    async fn update_preset(&self, preset: &Preset) -> Result<()> {
        let mut state = self.state();
        let index = state.preset_index(preset.id)?;
        if let Some(missing) = preset
            .query_ids
            .iter()
            .find(|id| !state.catalog.iter().any(|q| q.id == **id))
        {
            return Err(Error::validation(
                "preset",
                format!("query #{} does not exist", missing),
            ));
        }
        state.presets[index] = preset.clone();
        state.mutated();
        Ok(())
    }

    async fn delete_preset(&self, preset: &Preset) -> Result<()> {
        let mut state = self.state();
        let index = state.preset_index(preset.id)?;
        state.presets.remove(index);
        state.mutated();
        Ok(())
    }

    // === Scans ===

    async fn start_scan(&self, request: &ScanRequest) -> Result<Scan> {
        let mut state = self.state();
        let project_index = state.project_index(&request.project_id)?;
        match &request.source {
            ScanSource::Archive(bytes) if bytes.is_empty() => {
                return Err(Error::validation("scan", "source archive is empty"));
            }
            ScanSource::Repository(url) if url.is_empty() => {
                return Err(Error::validation("scan", "repository URL is empty"));
            }
            _ => {}
        }
        if let Some(engine) = request.engines.iter().find(|e| !ENGINES.contains(&e.as_str())) {
            return Err(Error::validation("scan", format!("unknown engine '{}'", engine)));
        }
        if let Some(preset) = &request.preset {
            if !state.presets.iter().any(|p| &p.name == preset) {
                return Err(Error::not_found("Preset", preset));
            }
        }

        let project_name = state.projects[project_index].name.clone();
        let scan = Scan {
            id: state.next_id("scan"),
            project_id: request.project_id.clone(),
            branch: request.branch.clone(),
            status: "Completed".to_string(),
            engines: request.engines.clone(),
        };
        let findings = state.findings.get(&project_name).cloned().unwrap_or_default();
        state.scan_results.insert(scan.id.clone(), findings);
        state.scans.push(scan.clone());
        state.mutated();
        Ok(scan)
    }

    async fn get_scan_by_id(&self, id: &str) -> Result<Scan> {
        self.state()
            .scans
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("Scan", id))
    }

    async fn get_last_scan(&self, project: &Project, branch: Option<&str>) -> Result<Scan> {
        self.state()
            .scans
            .iter()
            .rev()
            .find(|s| s.project_id == project.id && branch.map_or(true, |b| s.branch == b))
            .cloned()
            .ok_or_else(|| Error::not_found("Scan", format!("last scan of {}", project.name)))
    }

    async fn delete_scan(&self, scan: &Scan) -> Result<()> {
        let mut state = self.state();
        let index = state
            .scans
            .iter()
            .position(|s| s.id == scan.id)
            .ok_or_else(|| Error::not_found("Scan", &scan.id))?;
        state.scans.remove(index);
        state.scan_results.remove(&scan.id);
        state.mutated();
        Ok(())
    }

    // === Results ===

    async fn get_scan_results(&self, scan: &Scan) -> Result<Vec<ScanResult>> {
        self.state()
            .scan_results
            .get(&scan.id)
            .cloned()
            .ok_or_else(|| Error::not_found("Scan", &scan.id))
    }

    async fn add_result_predicate(
        &self,
        project: &Project,
        result: &ScanResult,
        predicate: &ResultPredicate,
    ) -> Result<()> {
        let mut state = self.state();
        state.project_index(&project.id)?;
        if !predicate.state.is_empty() && !RESULT_STATES.contains(&predicate.state.as_str()) {
            return Err(Error::validation(
                "result",
                format!("unknown state '{}'", predicate.state),
            ));
        }
        if !is_severity(&predicate.severity) {
            return Err(Error::validation(
                "result",
                format!("unknown severity '{}'", predicate.severity),
            ));
        }

        let scan_ids: Vec<String> = state
            .scans
            .iter()
            .filter(|s| s.project_id == project.id)
            .map(|s| s.id.clone())
            .collect();
        for scan_id in scan_ids {
            if let Some(results) = state.scan_results.get_mut(&scan_id) {
                for finding in results
                    .iter_mut()
                    .filter(|f| f.similarity_id == result.similarity_id)
                {
                    if !predicate.state.is_empty() {
                        finding.state = predicate.state.clone();
                    }
                    if !predicate.severity.is_empty() {
                        finding.severity = predicate.severity.clone();
                    }
                }
            }
        }
        state
            .predicates
            .push((result.similarity_id.to_string(), predicate.clone()));
        state.mutated();
        Ok(())
    }
}
