use async_trait::async_trait;

use crate::client::RemoteClient;
use crate::common::{Error, Result};
use crate::testing::config::GroupTest;
use crate::testing::entity::EntityTest;
use crate::testing::phase::{EntityKind, Phase};
use crate::testing::reconcile;

impl GroupTest {
    /// Make the group's client roles match the declaration, per listed client
    async fn reconcile_client_roles(&self, client: &dyn RemoteClient) -> Result<()> {
        let Some(group) = &self.group else {
            return Ok(());
        };

        for wanted in &self.client_roles {
            let current = client.get_group_client_roles(group, &wanted.client).await?;
            let diff = reconcile::diff(&wanted.roles, &current, |r| r.name.as_str());

            let mut additions = Vec::with_capacity(diff.additions.len());
            for name in &diff.additions {
                let role = client
                    .get_client_role_by_name(&wanted.client, name)
                    .await
                    .map_err(|e| Error::resolution("role", name, e))?;
                additions.push(role);
            }
            if !additions.is_empty() {
                client
                    .add_group_client_roles(group, &wanted.client, &additions)
                    .await?;
            }

            let removals: Vec<_> = diff.removals.into_iter().cloned().collect();
            if !removals.is_empty() {
                client
                    .remove_group_client_roles(group, &wanted.client, &removals)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EntityTest for GroupTest {
    const KIND: EntityKind = EntityKind::Group;

    fn phases(&self) -> &str {
        &self.test
    }

    fn fail_test(&self) -> bool {
        self.fail_test
    }

    fn describe(&self) -> String {
        match &self.group {
            Some(group) if !group.path.is_empty() => group.path.clone(),
            _ => self.name.clone(),
        }
    }

    fn has_handle(&self) -> bool {
        self.group.is_some()
    }

    fn detach(&mut self) {
        self.group = None;
    }

    fn check_identity(&self, _phase: Phase) -> std::result::Result<(), &'static str> {
        if self.name.is_empty() {
            return Err("name");
        }
        Ok(())
    }

    async fn create(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let parent = if self.parent.is_empty() {
            None
        } else {
            Some(
                client
                    .get_group_by_name(&self.parent)
                    .await
                    .map_err(|e| Error::resolution("group", &self.parent, e))?,
            )
        };

        let group = client.create_group(&self.name, parent.as_ref()).await?;
        self.group = Some(group);
        self.reconcile_client_roles(client).await
    }

    async fn read(&mut self, client: &dyn RemoteClient) -> Result<()> {
        self.group = Some(client.get_group_by_name(&self.name).await?);
        Ok(())
    }

    async fn update(&mut self, client: &dyn RemoteClient) -> Result<()> {
        self.reconcile_client_roles(client).await?;

        if let Some(group) = self.group.as_mut() {
            group.name = self.name.clone();
            client.update_group(group).await?;
        }
        Ok(())
    }

    async fn delete(&mut self, client: &dyn RemoteClient) -> Result<()> {
        match &self.group {
            Some(group) => client.delete_group(group).await,
            None => Ok(()),
        }
    }
}
