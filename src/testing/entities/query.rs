use async_trait::async_trait;

use crate::client::{AuditQuery, QueryScope, RemoteClient};
use crate::common::{Error, Result};
use crate::testing::config::{QueryTest, ScopeDeclaration};
use crate::testing::entity::EntityTest;
use crate::testing::phase::{EntityKind, Phase};

impl ScopeDeclaration {
    /// Resolve the declared scope to the level the override is stored at
    pub async fn resolve(&self, client: &dyn RemoteClient) -> Result<QueryScope> {
        if !self.project.is_empty() {
            let project = client
                .get_project_by_name(&self.project)
                .await
                .map_err(|e| Error::resolution("project", &self.project, e))?;
            return Ok(QueryScope::Project(project.id));
        }
        if !self.application.is_empty() {
            let application = client
                .get_application_by_name(&self.application)
                .await
                .map_err(|e| Error::resolution("application", &self.application, e))?;
            return Ok(QueryScope::Application(application.id));
        }
        Ok(QueryScope::Tenant)
    }

    fn describe(&self) -> String {
        if !self.project.is_empty() {
            format!("Project {}", self.project)
        } else if !self.application.is_empty() {
            format!("Application {}", self.application)
        } else {
            "Tenant".to_string()
        }
    }
}

impl QueryTest {
    async fn compile_if_requested(&self, client: &dyn RemoteClient, query: &AuditQuery) -> Result<()> {
        if self.compile {
            tracing::debug!("Compiling {}", query.path());
            client.compile_audit_query(query).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EntityTest for QueryTest {
    const KIND: EntityKind = EntityKind::Query;

    fn phases(&self) -> &str {
        &self.test
    }

    fn fail_test(&self) -> bool {
        self.fail_test
    }

    fn describe(&self) -> String {
        format!(
            "{}: {} -> {} -> {}",
            self.scope.describe(),
            self.language,
            self.group,
            self.name
        )
    }

    fn has_handle(&self) -> bool {
        self.query.is_some()
    }

    fn detach(&mut self) {
        self.query = None;
    }

    fn check_identity(&self, _phase: Phase) -> std::result::Result<(), &'static str> {
        if self.language.is_empty() || self.group.is_empty() || self.name.is_empty() {
            return Err("language, group or name");
        }
        Ok(())
    }

    async fn create(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let scope = self.scope.resolve(client).await?;

        let existing = client
            .get_audit_query(&scope, &self.language, &self.group, &self.name)
            .await;
        match existing {
            Ok(query) => return Err(Error::conflict("Query", format!("{}: {}", scope, query.path()))),
            Err(Error::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let query = AuditQuery {
            scope,
            language: self.language.clone(),
            group: self.group.clone(),
            name: self.name.clone(),
            source: self.source.clone(),
            severity: self.severity.clone(),
        };
        self.compile_if_requested(client, &query).await?;
        self.query = Some(client.save_audit_query(&query).await?);
        Ok(())
    }

    async fn read(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let scope = self.scope.resolve(client).await?;
        let query = client
            .get_audit_query(&scope, &self.language, &self.group, &self.name)
            .await?;
        self.query = Some(query);
        Ok(())
    }

    async fn update(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let Some(mut query) = self.query.clone() else {
            return Ok(());
        };
        if !self.source.is_empty() {
            query.source = self.source.clone();
        }
        if !self.severity.is_empty() {
            query.severity = self.severity.clone();
        }
        self.compile_if_requested(client, &query).await?;
        self.query = Some(client.save_audit_query(&query).await?);
        Ok(())
    }

    async fn delete(&mut self, client: &dyn RemoteClient) -> Result<()> {
        match &self.query {
            Some(query) => client.delete_audit_query(query).await,
            None => Ok(()),
        }
    }
}
