use std::collections::{BTreeMap, HashSet};

use dashmap::DashMap;
use itertools::Itertools as _;
use parking_lot::Mutex;
use types::primitives::{Epoch, Slot, ValidatorIndex};

use crate::{
    epoch_meta::EpochMeta,
    timeliness::Timeliness,
    summary::{
        AttestationPatch, AttestationRewardPatch, ProposePatch, ProposeRewardPatch, StatePatch,
        SyncPatch, SyncRewardPatch, ValidatorDutySummary,
    },
};

/// Attestations grouped by what determines their unweighted reward.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Inclusion {
    pub block_slot: Slot,
    pub effective_increments: u64,
    pub timeliness: Timeliness,
}

/// Duty summaries of tracked validators for one epoch together with the epoch's aggregates.
///
/// Patches for validators that are not tracked are dropped.
/// Neither lock is held across an `.await`.
pub struct EpochSummary {
    epoch: Epoch,
    tracked: Option<HashSet<ValidatorIndex>>,
    summaries: DashMap<ValidatorIndex, ValidatorDutySummary>,
    meta: Mutex<EpochMeta>,
    inclusions: Mutex<BTreeMap<Inclusion, u64>>,
}

impl EpochSummary {
    /// `tracked` of `None` tracks every validator.
    #[must_use]
    pub fn new(epoch: Epoch, tracked: Option<HashSet<ValidatorIndex>>) -> Self {
        Self {
            epoch,
            tracked,
            summaries: DashMap::new(),
            meta: Mutex::new(EpochMeta::new(epoch)),
            inclusions: Mutex::default(),
        }
    }

    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    #[must_use]
    pub fn is_tracked(&self, index: ValidatorIndex) -> bool {
        self.tracked
            .as_ref()
            .is_none_or(|tracked| tracked.contains(&index))
    }

    #[must_use]
    pub fn get(&self, index: ValidatorIndex) -> Option<ValidatorDutySummary> {
        self.summaries.get(&index).map(|summary| summary.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    #[must_use]
    pub fn indices(&self) -> Vec<ValidatorIndex> {
        self.summaries
            .iter()
            .map(|summary| *summary.key())
            .sorted()
            .collect()
    }

    pub fn apply_state(&self, index: ValidatorIndex, patch: StatePatch) {
        self.update(index, |summary| summary.apply_state(patch));
    }

    pub fn assign_attestation(&self, index: ValidatorIndex, slot: Slot) {
        self.update(index, |summary| {
            summary.att_slot.get_or_insert(slot);
        });
    }

    /// Records an included attestation unless one was already recorded for the validator.
    ///
    /// Returns whether the patch was applied.
    /// Untracked validators are reported as applied so callers can count them in aggregates.
    pub fn apply_attestation(&self, index: ValidatorIndex, patch: AttestationPatch) -> bool {
        if !self.is_tracked(index) {
            return true;
        }

        self.summaries
            .entry(index)
            .or_insert_with(|| ValidatorDutySummary::new(self.epoch, index))
            .apply_attestation(patch)
    }

    pub fn apply_sync(&self, index: ValidatorIndex, patch: SyncPatch) {
        self.update(index, |summary| summary.apply_sync(patch));
    }

    pub fn apply_propose(&self, index: ValidatorIndex, patch: ProposePatch) {
        self.update(index, |summary| summary.apply_propose(patch));
    }

    pub fn apply_attestation_reward(&self, index: ValidatorIndex, patch: AttestationRewardPatch) {
        self.update(index, |summary| summary.apply_attestation_reward(patch));
    }

    pub fn apply_sync_reward(&self, index: ValidatorIndex, patch: SyncRewardPatch) {
        self.update(index, |summary| summary.apply_sync_reward(patch));
    }

    pub fn apply_propose_reward(&self, index: ValidatorIndex, patch: ProposeRewardPatch) {
        self.update(index, |summary| summary.apply_propose_reward(patch));
    }

    /// Counts the first included attestation of any validator, tracked or not.
    pub fn record_inclusion(&self, inclusion: Inclusion) {
        *self.inclusions.lock().entry(inclusion).or_default() += 1;
    }

    #[must_use]
    pub fn inclusions(&self) -> BTreeMap<Inclusion, u64> {
        self.inclusions.lock().clone()
    }

    pub fn update_meta<T>(&self, update: impl FnOnce(&mut EpochMeta) -> T) -> T {
        update(&mut self.meta.lock())
    }

    #[must_use]
    pub fn meta(&self) -> EpochMeta {
        self.meta.lock().clone()
    }

    /// Consumes the store and yields summaries in validator index order.
    pub fn into_parts(self) -> (impl Iterator<Item = ValidatorDutySummary>, EpochMeta) {
        let summaries = self
            .summaries
            .into_iter()
            .sorted_by_key(|(index, _)| *index)
            .map(|(_, summary)| summary);

        (summaries, self.meta.into_inner())
    }

    fn update(&self, index: ValidatorIndex, update: impl FnOnce(&mut ValidatorDutySummary)) {
        if !self.is_tracked(index) {
            return;
        }

        update(
            &mut self
                .summaries
                .entry(index)
                .or_insert_with(|| ValidatorDutySummary::new(self.epoch, index)),
        );
    }
}

#[cfg(test)]
mod tests {
    use types::{primitives::PublicKeyBytes, validator_status::ValidatorStatus};

    use super::*;

    fn attestation(inclusion_delay: u64, valid: bool) -> AttestationPatch {
        AttestationPatch {
            inclusion_delay,
            valid_head: valid,
            valid_target: valid,
            valid_source: valid,
        }
    }

    #[test]
    fn first_attestation_wins() {
        let epoch_summary = EpochSummary::new(100, None);

        assert!(epoch_summary.apply_attestation(7, attestation(3, false)));
        assert!(!epoch_summary.apply_attestation(7, attestation(1, true)));
        assert!(!epoch_summary.apply_attestation(7, attestation(2, true)));

        let summary = epoch_summary.get(7).expect("summary was created by the first patch");

        assert!(summary.att_happened);
        assert_eq!(summary.att_inc_delay, Some(3));
        assert_eq!(summary.att_valid_head, Some(false));
    }

    #[test]
    fn first_attestation_wins_under_concurrent_writers() {
        let epoch_summary = &EpochSummary::new(100, None);

        let applied = std::thread::scope(|scope| {
            let handles = (1..=8)
                .map(|delay| {
                    scope.spawn(move || epoch_summary.apply_attestation(7, attestation(delay, true)))
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| handle.join().expect("writer does not panic"))
                .filter(|applied| *applied)
                .count()
        });

        assert_eq!(applied, 1);
        assert!(epoch_summary.get(7).is_some_and(|summary| summary.att_happened));
    }

    #[test]
    fn patches_for_untracked_validators_are_dropped() {
        let epoch_summary = EpochSummary::new(100, Some(HashSet::from([1, 2])));

        epoch_summary.assign_attestation(3, 3200);
        epoch_summary.apply_propose(
            3,
            ProposePatch {
                slot: 3201,
                proposed: true,
            },
        );
        epoch_summary.assign_attestation(1, 3200);

        assert!(epoch_summary.apply_attestation(3, attestation(1, true)));
        assert_eq!(epoch_summary.indices(), [1]);
    }

    #[test]
    fn field_groups_merge_into_one_record() {
        let epoch_summary = EpochSummary::new(100, None);

        epoch_summary.apply_state(
            5,
            StatePatch {
                pubkey: PublicKeyBytes::zero(),
                operator: None,
                status: ValidatorStatus::ActiveOngoing,
                balance: 32_001_000_000,
                effective_balance: 32_000_000_000,
                slashed: false,
                withdrawn: 0,
            },
        );

        epoch_summary.assign_attestation(5, 3205);
        epoch_summary.assign_attestation(5, 3210);

        epoch_summary.apply_sync(
            5,
            SyncPatch {
                synced_blocks: vec![3200, 3201],
                expected_blocks: 4,
            },
        );

        epoch_summary.apply_sync(
            5,
            SyncPatch {
                synced_blocks: vec![3200, 3201, 3202],
                expected_blocks: 4,
            },
        );

        epoch_summary.apply_propose(
            5,
            ProposePatch {
                slot: 3209,
                proposed: false,
            },
        );

        let summary = epoch_summary.get(5).expect("summary exists");

        assert_eq!(summary.status, Some(ValidatorStatus::ActiveOngoing));
        assert_eq!(summary.att_slot, Some(3205));
        assert!(summary.is_sync);
        assert_eq!(summary.synced_blocks.len(), 5);
        assert_eq!(summary.sync_expected_blocks, 8);
        assert_eq!(summary.sync_percent, Some(62.5));
        assert!(summary.is_proposer);
        assert!(!summary.block_proposed());
        assert_eq!(epoch_summary.len(), 1);
    }

    #[test]
    fn propose_rewards_accumulate_and_skip_unknown_amounts() {
        let epoch_summary = EpochSummary::new(100, None);

        epoch_summary.apply_propose_reward(
            9,
            ProposeRewardPatch {
                earned: None,
                missed: None,
                penalty: 0,
            },
        );

        assert_eq!(
            epoch_summary
                .get(9)
                .and_then(|summary| summary.propose_earned_reward),
            None,
        );

        epoch_summary.apply_propose_reward(
            9,
            ProposeRewardPatch {
                earned: Some(10),
                missed: None,
                penalty: 0,
            },
        );

        epoch_summary.apply_propose_reward(
            9,
            ProposeRewardPatch {
                earned: Some(5),
                missed: None,
                penalty: 0,
            },
        );

        let summary = epoch_summary.get(9).expect("summary exists");

        assert_eq!(summary.propose_earned_reward, Some(15));
        assert_eq!(summary.propose_penalty, Some(0));
    }

    #[test]
    fn summaries_are_yielded_in_index_order() {
        let epoch_summary = EpochSummary::new(100, None);

        for index in [9, 3, 5] {
            epoch_summary.assign_attestation(index, 3200);
        }

        epoch_summary.update_meta(|meta| meta.active_validators = 3);

        let (summaries, meta) = epoch_summary.into_parts();

        assert_eq!(
            summaries.map(|summary| summary.index).collect::<Vec<_>>(),
            [3, 5, 9],
        );
        assert_eq!(meta.active_validators, 3);
        assert_eq!(meta.epoch, 100);
    }
}
