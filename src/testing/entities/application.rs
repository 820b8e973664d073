use async_trait::async_trait;

use crate::client::{Application, ApplicationRule, RemoteClient};
use crate::common::Result;
use crate::testing::config::ApplicationTest;
use crate::testing::entity::EntityTest;
use crate::testing::phase::{EntityKind, Phase};

const DEFAULT_CRITICALITY: u32 = 3;

impl ApplicationTest {
    /// Overwrite the declared fields of `application`
    fn apply(&self, application: &mut Application) {
        application.name = self.name.clone();
        application.description = self.description.clone();
        application.criticality = if self.criticality == 0 {
            DEFAULT_CRITICALITY
        } else {
            self.criticality
        };
        application.rules = self
            .rules
            .iter()
            .map(|r| ApplicationRule {
                id: String::new(),
                rule_type: r.rule_type.clone(),
                value: r.value.clone(),
            })
            .collect();
        application.tags = self
            .tags
            .iter()
            .map(|t| (t.key.clone(), t.value.clone()))
            .collect();
    }
}

#[async_trait]
impl EntityTest for ApplicationTest {
    const KIND: EntityKind = EntityKind::Application;

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
        self.application.is_some()
    }

    fn detach(&mut self) {
        self.application = None;
    }

    fn check_identity(&self, _phase: Phase) -> std::result::Result<(), &'static str> {
        if self.name.is_empty() {
            return Err("name");
        }
        Ok(())
    }

    async fn create(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let mut application = Application::default();
        self.apply(&mut application);
        self.application = Some(client.create_application(&application).await?);
        Ok(())
    }

    async fn read(&mut self, client: &dyn RemoteClient) -> Result<()> {
        self.application = Some(client.get_application_by_name(&self.name).await?);
        Ok(())
    }

    async fn update(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let Some(mut application) = self.application.clone() else {
            return Ok(());
        };
        self.apply(&mut application);
        client.update_application(&application).await?;
        self.application = Some(application);
        Ok(())
    }

    async fn delete(&mut self, client: &dyn RemoteClient) -> Result<()> {
        match &self.application {
            Some(application) => client.delete_application(application).await,
            None => Ok(()),
        }
    }
}
