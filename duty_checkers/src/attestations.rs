use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use anyhow::{ensure, Result};
use beacon_api::{canonical, BeaconApi, CanonicalRoots, SlotAttestations};
use duty_summary::{AttestationPatch, EpochSummary, Inclusion, Timeliness};
use tracing::debug;
use types::{
    block_id::BlockId,
    config::Config,
    containers::{Attestation, BlockInfo},
    primitives::{CommitteeIndex, Epoch, Slot, ValidatorIndex},
};

use crate::{epoch_validators::EpochValidators, error::Error};

type Committees<'c> = HashMap<(Slot, CommitteeIndex), &'c [ValidatorIndex]>;

#[derive(Clone, Copy, Default, Debug)]
struct TimelyCounts {
    source: u64,
    target: u64,
    head: u64,
}

impl TimelyCounts {
    fn add(&mut self, timeliness: Timeliness) {
        self.source += u64::from(timeliness.source);
        self.target += u64::from(timeliness.target);
        self.head += u64::from(timeliness.head);
    }
}

/// Matches attestations included in blocks against the committees of an epoch.
///
/// Only the first included attestation of each validator counts.
pub struct AttestationChecker {
    validators: Arc<EpochValidators>,
}

impl AttestationChecker {
    #[must_use]
    pub const fn new(validators: Arc<EpochValidators>) -> Self {
        Self { validators }
    }

    pub async fn check(
        &self,
        api: &BeaconApi,
        epoch: Epoch,
        state_slot: Slot,
        summary: &EpochSummary,
    ) -> Result<()> {
        let assignments = api
            .attestation_committees(BlockId::Slot(state_slot), epoch)
            .await?;

        for assignment in &assignments {
            for validator_index in assignment.validators.iter().copied() {
                summary.assign_attestation(validator_index, assignment.slot);
            }
        }

        let committees = assignments
            .iter()
            .map(|assignment| {
                (
                    (assignment.slot, assignment.committee_index),
                    assignment.validators.as_slice(),
                )
            })
            .collect::<Committees>();

        let config = api.config();
        let roots = CanonicalRoots::new(api);
        let mut walk = BlockWalk {
            config,
            epoch,
            committees: &committees,
            roots: &roots,
            attested: HashSet::new(),
            counts: TimelyCounts::default(),
        };

        // Attestations for the last slot of `epoch` may be included up to the end of the next one.
        let last_slot = config.compute_end_slot_at_epoch(epoch.saturating_add(1));
        let mut slot = config.compute_start_slot_at_epoch(epoch);

        while slot < last_slot {
            let max_depth = last_slot - slot - 1;

            let SlotAttestations {
                block,
                missed_slots,
            } = canonical::block_info_with_slot_attestations(api, slot, max_depth).await?;

            if !missed_slots.is_empty() {
                debug!("epoch {epoch}: slots without blocks: {missed_slots:?}");
            }

            let Some(block) = block else {
                break;
            };

            walk.process_block(&block, &self.validators, summary).await?;

            slot = block.slot;
        }

        let BlockWalk {
            attested, counts, ..
        } = walk;

        debug!(
            "epoch {epoch}: {} of {} assigned validators attested",
            attested.len(),
            committees.values().map(|committee| committee.len()).sum::<usize>(),
        );

        summary.update_meta(|meta| {
            meta.correct_source = counts.source;
            meta.correct_target = counts.target;
            meta.correct_head = counts.head;
        });

        Ok(())
    }
}

struct BlockWalk<'walk, 'api> {
    config: &'walk Config,
    epoch: Epoch,
    committees: &'walk Committees<'walk>,
    roots: &'walk CanonicalRoots<'api>,
    attested: HashSet<ValidatorIndex>,
    counts: TimelyCounts,
}

impl BlockWalk<'_, '_> {
    async fn process_block(
        &mut self,
        block: &BlockInfo,
        validators: &EpochValidators,
        summary: &EpochSummary,
    ) -> Result<()> {
        for attestation in &block.attestations {
            let data = attestation.data;

            if self.config.compute_epoch_at_slot(data.slot) != self.epoch || data.slot >= block.slot
            {
                continue;
            }

            let attesters = attesters(attestation, self.committees)?;

            if attesters.iter().all(|index| self.attested.contains(index)) {
                continue;
            }

            let valid_head = data.beacon_block_root == self.roots.root_at_slot(data.slot).await?;
            let valid_target =
                data.target.root == self.roots.root_at_epoch(data.target.epoch).await?;
            let valid_source =
                data.source.root == self.roots.root_at_epoch(data.source.epoch).await?;

            let inclusion_delay = block.slot - data.slot;
            let timeliness =
                Timeliness::new(valid_source, valid_target, valid_head, inclusion_delay);

            for validator_index in attesters {
                if !self.attested.insert(validator_index) {
                    continue;
                }

                self.counts.add(timeliness);

                summary.record_inclusion(Inclusion {
                    block_slot: block.slot,
                    effective_increments: validators.effective_increments(validator_index),
                    timeliness,
                });

                summary.apply_attestation(
                    validator_index,
                    AttestationPatch {
                        inclusion_delay,
                        valid_head,
                        valid_target,
                        valid_source,
                    },
                );
            }
        }

        Ok(())
    }
}

/// Committee members whose aggregation bits are set.
///
/// Attestations with `committee_bits` aggregate several committees of the same slot.
/// Their aggregation bits are the concatenation of the committees' bits in index order.
fn attesters(attestation: &Attestation, committees: &Committees) -> Result<Vec<ValidatorIndex>> {
    let data = attestation.data;

    let committee_indices = match &attestation.committee_bits {
        Some(committee_bits) => committee_bits
            .iter_ones()
            .map(|index| index as CommitteeIndex)
            .collect(),
        None => vec![data.index],
    };

    let aggregation_bits = &attestation.aggregation_bits;
    let mut offset = 0;
    let mut attesters = vec![];

    for committee_index in committee_indices {
        let committee = committees
            .get(&(data.slot, committee_index))
            .ok_or(Error::UnknownCommittee {
                slot: data.slot,
                committee_index,
            })?;

        let bits = aggregation_bits
            .get(offset..offset + committee.len())
            .ok_or(Error::AggregationBitsLengthMismatch {
                slot: data.slot,
                expected: offset + committee.len(),
                actual: aggregation_bits.len(),
            })?;

        attesters.extend(
            bits.iter_ones()
                .filter_map(|position| committee.get(position))
                .copied(),
        );

        offset += committee.len();
    }

    ensure!(
        offset == aggregation_bits.len(),
        Error::AggregationBitsLengthMismatch {
            slot: data.slot,
            expected: offset,
            actual: aggregation_bits.len(),
        },
    );

    Ok(attesters)
}
