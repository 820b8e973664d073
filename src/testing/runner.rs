//! Phase scheduler
//!
//! Runs test sets in document order. Within a set every kind's Create runs
//! first, then every kind's Read, Update and Delete, with kinds always in
//! [`EntityKind::ORDER`]. Remote calls are awaited one at a time, so a
//! declaration only sees entities created by the steps before it.

use std::time::Duration;

use crate::client::RemoteClient;

use super::config::TestSet;
use super::entity::run_phase;
use super::ledger::Ledger;
use super::phase::{EntityKind, Phase};

/// Run every set and return the outcome ledger
///
/// Per-test errors end up in the ledger; nothing here fails the run.
pub async fn run_tests(sets: &mut [TestSet], client: &dyn RemoteClient) -> Ledger {
    let mut ledger = Ledger::new();

    for set in sets.iter_mut() {
        if set.wait > 0 {
            tracing::info!("Waiting for {} seconds", set.wait);
            tokio::time::sleep(Duration::from_secs(set.wait)).await;
        }

        for phase in Phase::ALL {
            run_set_phase(phase, set, client, &mut ledger).await;
        }
    }

    ledger
}

async fn run_set_phase(
    phase: Phase,
    set: &mut TestSet,
    client: &dyn RemoteClient,
    ledger: &mut Ledger,
) {
    let name = set.name.as_str();

    for kind in EntityKind::ORDER {
        match kind {
            EntityKind::Group => run_phase(phase, name, &mut set.groups, client, ledger).await,
            EntityKind::Application => {
                run_phase(phase, name, &mut set.applications, client, ledger).await
            }
            EntityKind::Project => run_phase(phase, name, &mut set.projects, client, ledger).await,
            EntityKind::Role => run_phase(phase, name, &mut set.roles, client, ledger).await,
            EntityKind::User => run_phase(phase, name, &mut set.users, client, ledger).await,
            EntityKind::Query => run_phase(phase, name, &mut set.queries, client, ledger).await,
            EntityKind::Preset => run_phase(phase, name, &mut set.presets, client, ledger).await,
            EntityKind::Scan => run_phase(phase, name, &mut set.scans, client, ledger).await,
            EntityKind::Result => run_phase(phase, name, &mut set.results, client, ledger).await,
        }
    }
}

impl TestSet {
    /// Number of declarations of a kind
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Group => self.groups.len(),
            EntityKind::Application => self.applications.len(),
            EntityKind::Project => self.projects.len(),
            EntityKind::Role => self.roles.len(),
            EntityKind::User => self.users.len(),
            EntityKind::Query => self.queries.len(),
            EntityKind::Preset => self.presets.len(),
            EntityKind::Scan => self.scans.len(),
            EntityKind::Result => self.results.len(),
        }
    }

    /// `Test` strings of every declaration of a kind
    pub fn phase_strings(&self, kind: EntityKind) -> Vec<&str> {
        fn tests<T>(list: &[T], test: impl Fn(&T) -> &str) -> Vec<&str> {
            list.iter().map(test).collect()
        }
        match kind {
            EntityKind::Group => tests(&self.groups, |t| t.test.as_str()),
            EntityKind::Application => tests(&self.applications, |t| t.test.as_str()),
            EntityKind::Project => tests(&self.projects, |t| t.test.as_str()),
            EntityKind::Role => tests(&self.roles, |t| t.test.as_str()),
            EntityKind::User => tests(&self.users, |t| t.test.as_str()),
            EntityKind::Query => tests(&self.queries, |t| t.test.as_str()),
            EntityKind::Preset => tests(&self.presets, |t| t.test.as_str()),
            EntityKind::Scan => tests(&self.scans, |t| t.test.as_str()),
            EntityKind::Result => tests(&self.results, |t| t.test.as_str()),
        }
    }
}
