//! Generic entity test contract
//!
//! Every kind implements [`EntityTest`]; [`run_phase`] owns everything the
//! kinds have in common: phase selection, the skip rules, result logging,
//! FailTest inversion and clearing the live handle after a delete.

use std::time::Instant;

use async_trait::async_trait;

use super::ledger::{Ledger, OutcomeRecord, Verdict};
use super::phase::{label, EntityKind, Phase};
use super::report;
use crate::client::RemoteClient;
use crate::common::Result;

/// Four-phase CRUD contract for one declaration
#[async_trait]
pub trait EntityTest: Send {
    const KIND: EntityKind;

    /// The `Test` phase string
    fn phases(&self) -> &str;

    fn fail_test(&self) -> bool;

    /// Human readable target used in logs and the summary
    fn describe(&self) -> String;

    fn has_handle(&self) -> bool;

    /// Drop the live handle once the remote entity is gone
    fn detach(&mut self);

    /// Check the identity fields `phase` needs, naming the missing ones
    fn check_identity(&self, phase: Phase) -> std::result::Result<(), &'static str>;

    async fn create(&mut self, client: &dyn RemoteClient) -> Result<()>;
    async fn read(&mut self, client: &dyn RemoteClient) -> Result<()>;
    async fn update(&mut self, client: &dyn RemoteClient) -> Result<()>;
    async fn delete(&mut self, client: &dyn RemoteClient) -> Result<()>;
}

/// Reason a declaration can't run in `phase`, if any
pub fn skip_reason<T: EntityTest>(test: &T, phase: Phase) -> Option<String> {
    match phase {
        Phase::Create | Phase::Read => test
            .check_identity(phase)
            .err()
            .map(|missing| format!("invalid test (missing {})", missing)),
        Phase::Update if !test.has_handle() => {
            Some("invalid test (must read before updating)".to_string())
        }
        Phase::Delete if !test.has_handle() => {
            Some("invalid test (must read before deleting)".to_string())
        }
        _ => None,
    }
}

/// Run one phase over every declaration of a kind, in document order
pub async fn run_phase<T: EntityTest>(
    phase: Phase,
    set_name: &str,
    tests: &mut [T],
    client: &dyn RemoteClient,
    ledger: &mut Ledger,
) {
    let label = label(phase, T::KIND);

    for (position, test) in tests.iter_mut().enumerate() {
        if !phase.is_selected(test.phases()) {
            continue;
        }

        let start = Instant::now();
        let index = position + 1;
        let target = test.describe();

        if let Some(reason) = skip_reason(test, phase) {
            let record = OutcomeRecord {
                fail_test: test.fail_test(),
                verdict: Verdict::Skip,
                label: label.clone(),
                duration: start.elapsed(),
                set_name: set_name.to_string(),
                index,
                target,
                reason: Some(reason),
            };
            report::log_outcome(&record);
            ledger.push(record);
            continue;
        }

        report::log_start(&label, set_name, index, &target);

        let outcome = match phase {
            Phase::Create => test.create(client).await,
            Phase::Read => test.read(client).await,
            Phase::Update => test.update(client).await,
            Phase::Delete => test.delete(client).await,
        };
        if phase == Phase::Delete && outcome.is_ok() {
            test.detach();
        }
        if let Err(e) = &outcome {
            tracing::debug!("{} #{} returned: {}", label, index, e);
        }

        let (verdict, reason) = Verdict::judge(&outcome, test.fail_test());
        let record = OutcomeRecord {
            fail_test: test.fail_test(),
            verdict,
            label: label.clone(),
            duration: start.elapsed(),
            set_name: set_name.to_string(),
            index,
            // Create and Read may have filled in details
            target: test.describe(),
            reason,
        };
        report::log_outcome(&record);
        ledger.push(record);
    }
}
