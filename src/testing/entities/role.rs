use async_trait::async_trait;

use crate::client::RemoteClient;
use crate::common::{Error, Result};
use crate::testing::config::RoleTest;
use crate::testing::entity::EntityTest;
use crate::testing::phase::{EntityKind, Phase};
use crate::testing::reconcile;

impl RoleTest {
    /// Make the role's composites match `Permissions`, one batched add and
    /// one batched remove
    async fn reconcile_permissions(&self, client: &dyn RemoteClient) -> Result<()> {
        let Some(role) = &self.role else {
            return Ok(());
        };

        let current = client.get_role_composites(role).await?;
        let diff = reconcile::diff(&self.permissions, &current, |r| r.name.as_str());

        let mut additions = Vec::with_capacity(diff.additions.len());
        for name in &diff.additions {
            let permission = client
                .get_role_by_name(name)
                .await
                .map_err(|e| Error::resolution("permission", name, e))?;
            additions.push(permission);
        }
        if !additions.is_empty() {
            client.add_role_composites(role, &additions).await?;
        }

        let removals: Vec<_> = diff.removals.into_iter().cloned().collect();
        if !removals.is_empty() {
            client.remove_role_composites(role, &removals).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EntityTest for RoleTest {
    const KIND: EntityKind = EntityKind::Role;

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
        self.role.is_some()
    }

    fn detach(&mut self) {
        self.role = None;
    }

    fn check_identity(&self, _phase: Phase) -> std::result::Result<(), &'static str> {
        if self.name.is_empty() {
            return Err("name");
        }
        Ok(())
    }

    async fn create(&mut self, client: &dyn RemoteClient) -> Result<()> {
        self.role = Some(client.create_role(&self.name, &self.description).await?);
        self.reconcile_permissions(client).await
    }

    async fn read(&mut self, client: &dyn RemoteClient) -> Result<()> {
        self.role = Some(client.get_role_by_name(&self.name).await?);
        Ok(())
    }

    async fn update(&mut self, client: &dyn RemoteClient) -> Result<()> {
        if let Some(role) = self.role.as_mut() {
            role.description = self.description.clone();
            client.update_role(role).await?;
        }
        self.reconcile_permissions(client).await
    }

    async fn delete(&mut self, client: &dyn RemoteClient) -> Result<()> {
        match &self.role {
            Some(role) => client.delete_role(role).await,
            None => Ok(()),
        }
    }
}
