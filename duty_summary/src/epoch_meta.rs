use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use types::primitives::{Epoch, Gwei, Slot};

/// Epoch-wide aggregates shared by the reward calculators.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct EpochMeta {
    pub epoch: Epoch,
    pub active_validators: u64,
    pub total_active_increments: u64,
    pub base_reward: Gwei,
    pub correct_source: u64,
    pub correct_target: u64,
    pub correct_head: u64,
    /// Unweighted attestation rewards credited to each including block.
    pub attestation_block_rewards: BTreeMap<Slot, Gwei>,
    pub sync_block_rewards: BTreeMap<Slot, Gwei>,
    pub sync_participants: BTreeMap<Slot, u64>,
    /// Blocks expected to carry sync committee participation.
    pub sync_blocks: Vec<Slot>,
}

impl EpochMeta {
    #[must_use]
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            ..Self::default()
        }
    }

    pub fn credit_attestation_reward(&mut self, slot: Slot, reward: Gwei) {
        *self.attestation_block_rewards.entry(slot).or_default() += reward;
    }
}
