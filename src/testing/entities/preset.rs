use async_trait::async_trait;

use crate::client::{Preset, Query, RemoteClient};
use crate::common::{Error, Result};
use crate::testing::config::{PresetTest, QuerySelector};
use crate::testing::entity::EntityTest;
use crate::testing::phase::{EntityKind, Phase};

impl QuerySelector {
    /// Look the query up in the catalog, by name when one is given
    pub async fn resolve(&self, client: &dyn RemoteClient) -> Result<Query> {
        let found = if !self.name.is_empty() {
            client
                .get_query_by_name(&self.language, &self.group, &self.name)
                .await
        } else if self.id != 0 {
            client.get_query_by_id(self.id).await
        } else {
            Err(Error::validation(
                "query reference",
                "an ID or a language, group and name are required",
            ))
        };
        found.map_err(|e| Error::resolution("query", &self.to_string(), e))
    }
}

impl std::fmt::Display for QuerySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "QueryID#{}", self.id)
        } else {
            write!(f, "{} -> {} -> {}", self.language, self.group, self.name)
        }
    }
}

impl PresetTest {
    async fn resolve_queries(&self, client: &dyn RemoteClient) -> Result<Vec<u64>> {
        let mut ids = Vec::with_capacity(self.queries.len());
        for selector in &self.queries {
            let query = selector.resolve(client).await?;
            if !ids.contains(&query.id) {
                ids.push(query.id);
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl EntityTest for PresetTest {
    const KIND: EntityKind = EntityKind::Preset;

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
        self.preset.is_some()
    }

    fn detach(&mut self) {
        self.preset = None;
    }

    fn check_identity(&self, _phase: Phase) -> std::result::Result<(), &'static str> {
        if self.name.is_empty() {
            return Err("name");
        }
        Ok(())
    }

    async fn create(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let preset = Preset {
            id: 0,
            name: self.name.clone(),
            description: self.description.clone(),
            query_ids: self.resolve_queries(client).await?,
        };
        self.preset = Some(client.create_preset(&preset).await?);
        Ok(())
    }

    async fn read(&mut self, client: &dyn RemoteClient) -> Result<()> {
        self.preset = Some(client.get_preset_by_name(&self.name).await?);
        Ok(())
    }

    async fn update(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let Some(mut preset) = self.preset.clone() else {
            return Ok(());
        };
        preset.description = self.description.clone();
        preset.query_ids = self.resolve_queries(client).await?;
        client.update_preset(&preset).await?;
        self.preset = Some(preset);
        Ok(())
    }

    async fn delete(&mut self, client: &dyn RemoteClient) -> Result<()> {
        match &self.preset {
            Some(preset) => client.delete_preset(preset).await,
            None => Ok(()),
        }
    }
}
