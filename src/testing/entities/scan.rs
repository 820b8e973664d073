use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{RemoteClient, Scan, ScanRequest, ScanSource};
use crate::common::archive::load_source_archive;
use crate::common::{Error, Result};
use crate::testing::config::ScanTest;
use crate::testing::entity::EntityTest;
use crate::testing::phase::{EntityKind, Phase};

const DEFAULT_ENGINE: &str = "sast";

/// Interval between status checks while waiting for a scan to end
const POLL_INTERVAL: Duration = Duration::from_secs(10);

impl ScanTest {
    fn engines(&self) -> Vec<String> {
        let engines: Vec<String> = self
            .engine
            .split(',')
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if engines.is_empty() {
            vec![DEFAULT_ENGINE.to_string()]
        } else {
            engines
        }
    }

    fn source(&self) -> Result<ScanSource> {
        if self.zip_file.is_empty() {
            Ok(ScanSource::Repository(self.repository.clone()))
        } else {
            Ok(ScanSource::Archive(load_source_archive(Path::new(
                &self.zip_file,
            ))?))
        }
    }

    async fn await_completion(&self, client: &dyn RemoteClient, mut scan: Scan) -> Result<Scan> {
        while !scan.is_finished() {
            tracing::debug!("Scan {} is {}, waiting", scan.id, scan.status);
            tokio::time::sleep(POLL_INTERVAL).await;
            scan = client.get_scan_by_id(&scan.id).await?;
        }
        tracing::info!("Scan {} finished with status {}", scan.id, scan.status);
        Ok(scan)
    }
}

#[async_trait]
impl EntityTest for ScanTest {
    const KIND: EntityKind = EntityKind::Scan;

    fn phases(&self) -> &str {
        &self.test
    }

    fn fail_test(&self) -> bool {
        self.fail_test
    }

    fn describe(&self) -> String {
        let source = if self.repository.is_empty() {
            &self.zip_file
        } else {
            &self.repository
        };
        format!("{}: {} branch {}", self.project, source, self.branch)
    }

    fn has_handle(&self) -> bool {
        self.scan.is_some()
    }

    fn detach(&mut self) {
        self.scan = None;
    }

    fn check_identity(&self, phase: Phase) -> std::result::Result<(), &'static str> {
        if self.project.is_empty() {
            return Err("project");
        }
        if phase == Phase::Create && self.zip_file.is_empty() && self.repository.is_empty() {
            return Err("zip file or repository");
        }
        Ok(())
    }

    async fn create(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let project = client
            .get_project_by_name(&self.project)
            .await
            .map_err(|e| Error::resolution("project", &self.project, e))?;

        let preset = if self.preset.is_empty() {
            None
        } else {
            let preset = client
                .get_preset_by_name(&self.preset)
                .await
                .map_err(|e| Error::resolution("preset", &self.preset, e))?;
            Some(preset.name)
        };

        let request = ScanRequest {
            project_id: project.id,
            branch: self.branch.clone(),
            source: self.source()?,
            engines: self.engines(),
            incremental: self.incremental,
            preset,
        };
        let scan = client.start_scan(&request).await?;
        tracing::info!("Started scan {} of project {}", scan.id, self.project);
        self.scan = Some(scan.clone());

        if self.wait_for_end {
            let scan = self.await_completion(client, scan).await?;
            self.scan = Some(scan.clone());
            if !scan.is_successful() {
                return Err(Error::ScanFailed {
                    id: scan.id,
                    status: scan.status,
                });
            }
        }
        Ok(())
    }

    async fn read(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let project = client
            .get_project_by_name(&self.project)
            .await
            .map_err(|e| Error::resolution("project", &self.project, e))?;
        let branch = (!self.branch.is_empty()).then_some(self.branch.as_str());
        self.scan = Some(client.get_last_scan(&project, branch).await?);
        Ok(())
    }

    async fn update(&mut self, _client: &dyn RemoteClient) -> Result<()> {
        Err(Error::unsupported("Scan", "Update"))
    }

    async fn delete(&mut self, client: &dyn RemoteClient) -> Result<()> {
        match &self.scan {
            Some(scan) => client.delete_scan(scan).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engines_default_to_sast() {
        let scan = ScanTest::default();
        assert_eq!(scan.engines(), vec!["sast"]);

        let scan = ScanTest {
            engine: "SAST, sca,,kics ".to_string(),
            ..Default::default()
        };
        assert_eq!(scan.engines(), vec!["sast", "sca", "kics"]);
    }

    #[test]
    fn test_create_needs_a_source() {
        let scan = ScanTest {
            project: "p1".to_string(),
            ..Default::default()
        };
        assert_eq!(
            scan.check_identity(Phase::Create),
            Err("zip file or repository")
        );
        assert_eq!(scan.check_identity(Phase::Read), Ok(()));
    }
}
