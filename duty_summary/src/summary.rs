use serde::{Deserialize, Serialize};
use types::{
    primitives::{Epoch, Gwei, PublicKeyBytes, Slot, ValidatorIndex},
    validator_status::ValidatorStatus,
};

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct Operator {
    pub index: u64,
    pub name: String,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct Proposal {
    pub slot: Slot,
    pub proposed: bool,
}

/// Everything known about one validator's duties in one epoch.
///
/// Checkers fill disjoint groups of fields through the patch types below.
/// Reward fields stay `None` until the reward calculators run.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct ValidatorDutySummary {
    pub epoch: Epoch,
    pub index: ValidatorIndex,

    // Identity
    pub pubkey: Option<PublicKeyBytes>,
    pub operator_index: Option<u64>,
    pub operator_name: Option<String>,

    // State
    pub status: Option<ValidatorStatus>,
    pub balance: Gwei,
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub withdrawn: Gwei,

    // Attestation
    pub att_slot: Option<Slot>,
    pub att_happened: bool,
    pub att_inc_delay: Option<u64>,
    pub att_valid_head: Option<bool>,
    pub att_valid_target: Option<bool>,
    pub att_valid_source: Option<bool>,

    // Sync committee
    pub is_sync: bool,
    pub synced_blocks: Vec<Slot>,
    pub sync_expected_blocks: u64,
    pub sync_percent: Option<f64>,

    // Proposals
    pub is_proposer: bool,
    pub proposals: Vec<Proposal>,

    // Rewards
    pub att_earned_reward: Option<Gwei>,
    pub att_missed_reward: Option<Gwei>,
    pub att_penalty: Option<Gwei>,
    pub sync_earned_reward: Option<Gwei>,
    pub sync_missed_reward: Option<Gwei>,
    pub sync_penalty: Option<Gwei>,
    pub propose_earned_reward: Option<Gwei>,
    pub propose_missed_reward: Option<Gwei>,
    pub propose_penalty: Option<Gwei>,
}

impl ValidatorDutySummary {
    #[must_use]
    pub const fn new(epoch: Epoch, index: ValidatorIndex) -> Self {
        Self {
            epoch,
            index,
            pubkey: None,
            operator_index: None,
            operator_name: None,
            status: None,
            balance: 0,
            effective_balance: 0,
            slashed: false,
            withdrawn: 0,
            att_slot: None,
            att_happened: false,
            att_inc_delay: None,
            att_valid_head: None,
            att_valid_target: None,
            att_valid_source: None,
            is_sync: false,
            synced_blocks: vec![],
            sync_expected_blocks: 0,
            sync_percent: None,
            is_proposer: false,
            proposals: vec![],
            att_earned_reward: None,
            att_missed_reward: None,
            att_penalty: None,
            sync_earned_reward: None,
            sync_missed_reward: None,
            sync_penalty: None,
            propose_earned_reward: None,
            propose_missed_reward: None,
            propose_penalty: None,
        }
    }

    #[must_use]
    pub fn block_proposed(&self) -> bool {
        self.proposals.iter().any(|proposal| proposal.proposed)
    }

    pub(crate) fn apply_state(&mut self, patch: StatePatch) {
        let StatePatch {
            pubkey,
            operator,
            status,
            balance,
            effective_balance,
            slashed,
            withdrawn,
        } = patch;

        self.pubkey = Some(pubkey);
        self.operator_index = operator.as_ref().map(|operator| operator.index);
        self.operator_name = operator.map(|operator| operator.name);
        self.status = Some(status);
        self.balance = balance;
        self.effective_balance = effective_balance;
        self.slashed = slashed;
        self.withdrawn = withdrawn;
    }

    // Returns `false` if an attestation was already recorded.
    pub(crate) fn apply_attestation(&mut self, patch: AttestationPatch) -> bool {
        if self.att_happened {
            return false;
        }

        let AttestationPatch {
            inclusion_delay,
            valid_head,
            valid_target,
            valid_source,
        } = patch;

        self.att_happened = true;
        self.att_inc_delay = Some(inclusion_delay);
        self.att_valid_head = Some(valid_head);
        self.att_valid_target = Some(valid_target);
        self.att_valid_source = Some(valid_source);

        true
    }

    #[expect(clippy::cast_precision_loss, clippy::float_arithmetic)]
    pub(crate) fn apply_sync(&mut self, patch: SyncPatch) {
        let SyncPatch {
            synced_blocks,
            expected_blocks,
        } = patch;

        self.is_sync = true;
        self.synced_blocks.extend(synced_blocks);
        self.sync_expected_blocks += expected_blocks;

        self.sync_percent = (self.sync_expected_blocks > 0).then(|| {
            self.synced_blocks.len() as f64 / self.sync_expected_blocks as f64 * 100.0
        });
    }

    pub(crate) fn apply_propose(&mut self, patch: ProposePatch) {
        let ProposePatch { slot, proposed } = patch;

        self.is_proposer = true;
        self.proposals.push(Proposal { slot, proposed });
        self.proposals.sort_by_key(|proposal| proposal.slot);
    }

    pub(crate) fn apply_attestation_reward(&mut self, patch: AttestationRewardPatch) {
        self.att_earned_reward = Some(patch.earned);
        self.att_missed_reward = Some(patch.missed);
        self.att_penalty = Some(patch.penalty);
    }

    pub(crate) fn apply_sync_reward(&mut self, patch: SyncRewardPatch) {
        self.sync_earned_reward = Some(patch.earned);
        self.sync_missed_reward = Some(patch.missed);
        self.sync_penalty = Some(patch.penalty);
    }

    // Amounts accumulate over every proposal of the epoch.
    pub(crate) fn apply_propose_reward(&mut self, patch: ProposeRewardPatch) {
        let ProposeRewardPatch {
            earned,
            missed,
            penalty,
        } = patch;

        if let Some(earned) = earned {
            self.propose_earned_reward = Some(self.propose_earned_reward.unwrap_or(0) + earned);
        }

        if let Some(missed) = missed {
            self.propose_missed_reward = Some(self.propose_missed_reward.unwrap_or(0) + missed);
        }

        self.propose_penalty = Some(self.propose_penalty.unwrap_or(0) + penalty);
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StatePatch {
    pub pubkey: PublicKeyBytes,
    pub operator: Option<Operator>,
    pub status: ValidatorStatus,
    pub balance: Gwei,
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub withdrawn: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AttestationPatch {
    pub inclusion_delay: u64,
    pub valid_head: bool,
    pub valid_target: bool,
    pub valid_source: bool,
}

/// Participation of one sync committee position over the blocks of an epoch.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct SyncPatch {
    pub synced_blocks: Vec<Slot>,
    pub expected_blocks: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ProposePatch {
    pub slot: Slot,
    pub proposed: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct AttestationRewardPatch {
    pub earned: Gwei,
    pub missed: Gwei,
    pub penalty: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct SyncRewardPatch {
    pub earned: Gwei,
    pub missed: Gwei,
    pub penalty: Gwei,
}

/// `earned` is `None` when the reward of a proposed block cannot be determined.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct ProposeRewardPatch {
    pub earned: Option<Gwei>,
    pub missed: Option<Gwei>,
    pub penalty: Gwei,
}
