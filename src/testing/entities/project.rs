use async_trait::async_trait;

use crate::client::{Project, RemoteClient};
use crate::common::{Error, Result};
use crate::testing::config::ProjectTest;
use crate::testing::entity::EntityTest;
use crate::testing::phase::{EntityKind, Phase};

impl ProjectTest {
    /// Resolve the declared relations and overwrite them on `project`
    async fn apply(&self, client: &dyn RemoteClient, project: &mut Project) -> Result<()> {
        let mut group_ids = Vec::with_capacity(self.groups.len());
        for name in &self.groups {
            let group = client
                .get_group_by_name(name)
                .await
                .map_err(|e| Error::resolution("group", name, e))?;
            group_ids.push(group.id);
        }
        project.groups = group_ids;

        if !self.application.is_empty() {
            let application = client
                .get_application_by_name(&self.application)
                .await
                .map_err(|e| Error::resolution("application", &self.application, e))?;
            project.application_ids = vec![application.id];
        }

        project.name = self.name.clone();
        project.tags = self
            .tags
            .iter()
            .map(|t| (t.key.clone(), t.value.clone()))
            .collect();
        Ok(())
    }
}

#[async_trait]
impl EntityTest for ProjectTest {
    const KIND: EntityKind = EntityKind::Project;

    fn phases(&self) -> &str {
        &self.test
    }

    fn fail_test(&self) -> bool {
        self.fail_test
    }

    fn describe(&self) -> String {
        self.name.clone()
    }

    fn has_handle(&self) -> bool {
        self.project.is_some()
    }

    fn detach(&mut self) {
        self.project = None;
    }

    fn check_identity(&self, _phase: Phase) -> std::result::Result<(), &'static str> {
        if self.name.is_empty() {
            return Err("name");
        }
        Ok(())
    }

    async fn create(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let mut project = Project::default();
        self.apply(client, &mut project).await?;
        self.project = Some(client.create_project(&project).await?);
        Ok(())
    }

    async fn read(&mut self, client: &dyn RemoteClient) -> Result<()> {
        self.project = Some(client.get_project_by_name(&self.name).await?);
        Ok(())
    }

    async fn update(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let Some(mut project) = self.project.clone() else {
            return Ok(());
        };
        self.apply(client, &mut project).await?;
        client.update_project(&project).await?;
        self.project = Some(project);
        Ok(())
    }

    async fn delete(&mut self, client: &dyn RemoteClient) -> Result<()> {
        match &self.project {
            Some(project) => client.delete_project(project).await,
            None => Ok(()),
        }
    }
}
