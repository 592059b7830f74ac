use std::sync::Arc;

use anyhow::Result;
use beacon_api::BeaconApi;
use duty_summary::EpochSummary;
use types::primitives::{Epoch, Slot};

use crate::{
    attestations::AttestationChecker, epoch_validators::EpochValidators,
    proposals::ProposeChecker, state::StateChecker, sync_committees::SyncChecker,
};

/// The duty checkers run for every epoch.
///
/// Each one writes its own group of fields of the epoch's summaries.
pub enum DutyChecker {
    State(StateChecker),
    Attestation(AttestationChecker),
    Sync(SyncChecker),
    Propose(ProposeChecker),
}

impl DutyChecker {
    #[must_use]
    pub fn all(validators: &Arc<EpochValidators>) -> [Self; 4] {
        [
            Self::State(StateChecker::new(Arc::clone(validators))),
            Self::Attestation(AttestationChecker::new(Arc::clone(validators))),
            Self::Sync(SyncChecker),
            Self::Propose(ProposeChecker),
        ]
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::State(_) => "state",
            Self::Attestation(_) => "attestation",
            Self::Sync(_) => "sync",
            Self::Propose(_) => "propose",
        }
    }

    pub async fn check(
        &self,
        api: &BeaconApi,
        epoch: Epoch,
        state_slot: Slot,
        summary: &EpochSummary,
    ) -> Result<()> {
        match self {
            Self::State(checker) => checker.check(api, epoch, summary).await,
            Self::Attestation(checker) => checker.check(api, epoch, state_slot, summary).await,
            Self::Sync(checker) => checker.check(api, epoch, state_slot, summary).await,
            Self::Propose(checker) => checker.check(api, epoch, summary).await,
        }
    }
}
