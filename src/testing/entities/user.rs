use async_trait::async_trait;

use crate::client::{RemoteClient, User};
use crate::common::{Error, Result};
use crate::testing::config::UserTest;
use crate::testing::entity::EntityTest;
use crate::testing::phase::{EntityKind, Phase};
use crate::testing::reconcile;

impl UserTest {
    /// Bring group membership and role assignment in line with the
    /// declaration
    ///
    /// Groups change one call per membership; roles go out as one batched
    /// add and one batched remove.
    async fn reconcile(&self, client: &dyn RemoteClient) -> Result<()> {
        let Some(user) = &self.user else {
            return Ok(());
        };

        let current_groups = client.get_user_groups(user).await?;
        let groups = reconcile::diff(&self.groups, &current_groups, |g| g.name.as_str());
        for name in &groups.additions {
            let group = client
                .get_group_by_name(name)
                .await
                .map_err(|e| Error::resolution("group", name, e))?;
            client.add_user_to_group(user, &group.id).await?;
        }
        for group in &groups.removals {
            client.remove_user_from_group(user, &group.id).await?;
        }

        let current_roles = client.get_user_roles(user).await?;
        let roles = reconcile::diff(&self.roles, &current_roles, |r| r.name.as_str());
        let mut grants = Vec::with_capacity(roles.additions.len());
        for name in &roles.additions {
            let role = client
                .get_role_by_name(name)
                .await
                .map_err(|e| Error::resolution("role", name, e))?;
            grants.push(role);
        }
        if !grants.is_empty() {
            client.add_user_roles(user, &grants).await?;
        }

        let revokes: Vec<_> = roles.removals.into_iter().cloned().collect();
        if !revokes.is_empty() {
            client.remove_user_roles(user, &revokes).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EntityTest for UserTest {
    const KIND: EntityKind = EntityKind::User;

    fn phases(&self) -> &str {
        &self.test
    }

    fn fail_test(&self) -> bool {
        self.fail_test
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.name, self.email)
    }

    fn has_handle(&self) -> bool {
        self.user.is_some()
    }

    fn detach(&mut self) {
        self.user = None;
    }

    fn check_identity(&self, phase: Phase) -> std::result::Result<(), &'static str> {
        let missing = match phase {
            Phase::Create => self.name.is_empty() || self.email.is_empty(),
            _ => self.name.is_empty() && self.email.is_empty(),
        };
        if missing {
            return Err("name or email");
        }
        Ok(())
    }

    async fn create(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let user = User {
            id: String::new(),
            username: self.name.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            enabled: true,
        };
        self.user = Some(client.create_user(&user).await?);
        self.reconcile(client).await
    }

    async fn read(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let user = if self.name.is_empty() {
            client.get_user_by_email(&self.email).await?
        } else {
            client.get_user_by_name(&self.name).await?
        };
        self.user = Some(user);
        Ok(())
    }

    async fn update(&mut self, client: &dyn RemoteClient) -> Result<()> {
        self.reconcile(client).await?;

        if let Some(user) = self.user.as_mut() {
            for (field, wanted) in [
                (&mut user.email, &self.email),
                (&mut user.first_name, &self.first_name),
                (&mut user.last_name, &self.last_name),
            ] {
                if !wanted.is_empty() {
                    field.clone_from(wanted);
                }
            }
            client.update_user(user).await?;
        }
        Ok(())
    }

    async fn delete(&mut self, client: &dyn RemoteClient) -> Result<()> {
        match &self.user {
            Some(user) => client.delete_user(user).await,
            None => Ok(()),
        }
    }
}
