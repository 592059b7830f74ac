//! Rewards and penalties derived from the duties recorded in an [`EpochSummary`].
//!
//! The calculators must run after every duty checker has finished
//! and in the order attestations, sync committees, proposals.
//! Proposer rewards are derived from the per-block sums the other two record.
//!
//! [`EpochSummary`]: duty_summary::EpochSummary

pub use crate::{
    attestations::{attestation_reward, record_attestation_rewards, unweighted_attestation_reward},
    proposals::{proposer_reward, record_propose_rewards},
    sync_committees::{record_sync_rewards, sync_reward_per_block},
};

mod attestations;
mod proposals;
mod sync_committees;
