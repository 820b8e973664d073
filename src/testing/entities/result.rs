use async_trait::async_trait;

use crate::client::{RemoteClient, ResultPredicate, ScanResult};
use crate::common::{Error, Result};
use crate::testing::config::ResultTest;
use crate::testing::entity::EntityTest;
use crate::testing::phase::{EntityKind, Phase};

impl ResultTest {
    /// Whether a finding matches the declared selector
    ///
    /// The query name wins, then the similarity ID, then the hash, then the
    /// query ID. With none of them set every finding matches.
    fn matches(&self, finding: &ScanResult) -> bool {
        if !self.name.is_empty() {
            finding.language.eq_ignore_ascii_case(&self.language)
                && finding.group.eq_ignore_ascii_case(&self.group)
                && finding.query_name.eq_ignore_ascii_case(&self.name)
        } else if self.similarity_id != 0 {
            finding.similarity_id == self.similarity_id
        } else if !self.result_hash.is_empty() {
            finding.hash == self.result_hash
        } else if self.query_id != 0 {
            finding.query_id == self.query_id
        } else {
            true
        }
    }

    /// Pick the declared finding out of a scan's results
    fn select(&self, findings: Vec<ScanResult>) -> Option<ScanResult> {
        let skip = self.finding_number.saturating_sub(1);
        findings
            .into_iter()
            .filter(|f| self.matches(f))
            .nth(usize::try_from(skip).unwrap_or(usize::MAX))
    }
}

#[async_trait]
impl EntityTest for ResultTest {
    const KIND: EntityKind = EntityKind::Result;

    fn phases(&self) -> &str {
        &self.test
    }

    fn fail_test(&self) -> bool {
        self.fail_test
    }

    fn describe(&self) -> String {
        if !self.name.is_empty() {
            format!(
                "{}: {} -> {} -> {} finding #{}",
                self.project, self.language, self.group, self.name, self.finding_number
            )
        } else if self.similarity_id != 0 {
            format!("{}: finding with simID {}", self.project, self.similarity_id)
        } else if !self.result_hash.is_empty() {
            format!("{}: finding with hash {}", self.project, self.result_hash)
        } else if self.query_id != 0 {
            format!(
                "{}: QueryID #{} finding #{}",
                self.project, self.query_id, self.finding_number
            )
        } else {
            format!("{}: finding #{}", self.project, self.finding_number)
        }
    }

    fn has_handle(&self) -> bool {
        self.result.is_some() && self.project_handle.is_some()
    }

    fn detach(&mut self) {
        self.result = None;
    }

    fn check_identity(&self, _phase: Phase) -> std::result::Result<(), &'static str> {
        if self.project.is_empty() {
            return Err("project");
        }
        Ok(())
    }

    async fn create(&mut self, _client: &dyn RemoteClient) -> Result<()> {
        Err(Error::unsupported("Result", "Create"))
    }

    async fn read(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let project = client
            .get_project_by_name(&self.project)
            .await
            .map_err(|e| Error::resolution("project", &self.project, e))?;
        let scan = client.get_last_scan(&project, None).await?;
        let findings = client.get_scan_results(&scan).await?;
        tracing::debug!(
            "Scan {} of project {} has {} findings",
            scan.id,
            project.name,
            findings.len()
        );

        let finding = self
            .select(findings)
            .ok_or_else(|| Error::not_found("Result", self.describe()))?;
        self.result = Some(finding);
        self.project_handle = Some(project);
        Ok(())
    }

    async fn update(&mut self, client: &dyn RemoteClient) -> Result<()> {
        let (Some(project), Some(finding)) = (&self.project_handle, self.result.as_mut()) else {
            return Ok(());
        };
        let predicate = ResultPredicate {
            state: self.state.clone(),
            severity: self.severity.clone(),
            comment: self.comment.clone(),
        };
        client
            .add_result_predicate(project, finding, &predicate)
            .await?;

        if !predicate.state.is_empty() {
            finding.state = predicate.state;
        }
        if !predicate.severity.is_empty() {
            finding.severity = predicate.severity;
        }
        Ok(())
    }

    async fn delete(&mut self, _client: &dyn RemoteClient) -> Result<()> {
        Err(Error::unsupported("Result", "Delete"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(id: &str, query: &str, similarity_id: i64) -> ScanResult {
        ScanResult {
            id: id.to_string(),
            hash: format!("hash-{}", id),
            similarity_id,
            query_id: if query == "SQL_Injection" { 1 } else { 2 },
            language: "Java".to_string(),
            group: "Java_High_Risk".to_string(),
            query_name: query.to_string(),
            state: "TO_VERIFY".to_string(),
            severity: "High".to_string(),
        }
    }

    fn findings() -> Vec<ScanResult> {
        vec![
            finding("a", "SQL_Injection", 10),
            finding("b", "XSS", 20),
            finding("c", "SQL_Injection", 30),
        ]
    }

    #[test]
    fn test_select_by_query_name_and_number() {
        let test = ResultTest {
            language: "java".to_string(),
            group: "Java_High_Risk".to_string(),
            name: "SQL_Injection".to_string(),
            finding_number: 2,
            ..Default::default()
        };
        assert_eq!(test.select(findings()).map(|f| f.id), Some("c".to_string()));
    }

    #[test]
    fn test_finding_number_zero_is_first() {
        let test = ResultTest {
            query_id: 1,
            ..Default::default()
        };
        assert_eq!(test.select(findings()).map(|f| f.id), Some("a".to_string()));
    }

    #[test]
    fn test_selector_precedence() {
        // The similarity ID beats the hash when both are given.
        let test = ResultTest {
            similarity_id: 20,
            result_hash: "hash-c".to_string(),
            ..Default::default()
        };
        assert_eq!(test.select(findings()).map(|f| f.id), Some("b".to_string()));

        let test = ResultTest {
            result_hash: "hash-c".to_string(),
            ..Default::default()
        };
        assert_eq!(test.select(findings()).map(|f| f.id), Some("c".to_string()));
    }

    #[test]
    fn test_out_of_range_number_selects_nothing() {
        let test = ResultTest {
            finding_number: 4,
            ..Default::default()
        };
        assert!(test.select(findings()).is_none());
    }

    #[test]
    fn test_describe() {
        let test = ResultTest {
            project: "p1".to_string(),
            result_hash: "abc".to_string(),
            ..Default::default()
        };
        assert_eq!(test.describe(), "p1: finding with hash abc");
    }
}
