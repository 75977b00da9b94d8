//! Outcome of a full sync run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::SyncError;
use crate::model::Domain;

/// Rows moved in one domain cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub pushed: usize,
    pub pulled: usize,
}

/// Result of one domain within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DomainOutcome {
    Synced { pushed: usize, pulled: usize },
    Failed { error: String },
}

impl DomainOutcome {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Per-domain summary of a `sync_all` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// The run was skipped because the device was offline.
    pub skipped_offline: bool,
    pub outcomes: BTreeMap<Domain, DomainOutcome>,
}

impl SyncReport {
    /// A run that touched nothing because the device was offline.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            skipped_offline: true,
            outcomes: BTreeMap::new(),
        }
    }

    /// Record one domain's result.
    pub fn record(&mut self, domain: Domain, result: &Result<SyncCounts, SyncError>) {
        let outcome = match result {
            Ok(counts) => DomainOutcome::Synced {
                pushed: counts.pushed,
                pulled: counts.pulled,
            },
            Err(e) => DomainOutcome::Failed { error: e.to_string() },
        };
        self.outcomes.insert(domain, outcome);
    }

    #[must_use]
    pub fn outcome(&self, domain: Domain) -> Option<&DomainOutcome> {
        self.outcomes.get(&domain)
    }

    /// Domains whose cycle failed, in visit order.
    #[must_use]
    pub fn failed_domains(&self) -> Vec<Domain> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_failed())
            .map(|(domain, _)| *domain)
            .collect()
    }

    #[must_use]
    pub fn total_pushed(&self) -> usize {
        self.outcomes
            .values()
            .map(|o| match o {
                DomainOutcome::Synced { pushed, .. } => *pushed,
                DomainOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    #[must_use]
    pub fn total_pulled(&self) -> usize {
        self.outcomes
            .values()
            .map(|o| match o {
                DomainOutcome::Synced { pulled, .. } => *pulled,
                DomainOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    /// `Ok` when no domain failed, otherwise [`SyncError::Partial`] carrying
    /// this report.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Partial`] naming every failed domain.
    pub fn into_result(self) -> Result<Self, SyncError> {
        let failed = self.failed_domains();
        if failed.is_empty() {
            Ok(self)
        } else {
            Err(SyncError::Partial { failed, report: self })
        }
    }
}
