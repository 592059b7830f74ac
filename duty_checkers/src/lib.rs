pub use crate::{
    attestations::AttestationChecker,
    checker::DutyChecker,
    epoch_validators::EpochValidators,
    error::Error,
    proposals::ProposeChecker,
    state::{base_reward_per_increment, StateChecker, YIELD_EVERY},
    sync_committees::SyncChecker,
};

mod attestations;
mod checker;
mod epoch_validators;
mod error;
mod proposals;
mod state;
mod sync_committees;

#[cfg(test)]
mod test_utils;
