use std::collections::BTreeMap;

use duty_summary::{EpochMeta, EpochSummary, ProposeRewardPatch};
use tracing::{debug, warn};
use types::{
    config::Config,
    consts::{PROPOSER_WEIGHT, WEIGHT_DENOMINATOR},
    primitives::{Gwei, Slot},
};

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
struct BlockReward {
    attestations: Gwei,
    sync: Gwei,
}

/// Estimates proposer rewards from the per-block reward sums of the current and previous epochs.
///
/// Blocks of an epoch include attestations of the previous epoch,
/// so nothing is computed without the previous epoch's metadata.
/// That includes the estimate for missed proposals, which is an average over the same blocks.
pub fn record_propose_rewards(
    config: &Config,
    summary: &EpochSummary,
    previous: Option<&EpochMeta>,
) {
    let epoch = summary.epoch();

    let Some(previous) = previous else {
        warn!(
            "epoch {epoch}: metadata of epoch {} is missing, \
             skipping earned and missed proposer rewards",
            epoch.saturating_sub(1),
        );
        return;
    };

    let current = summary.meta();

    let block_rewards = config
        .slots_in_epoch(epoch)
        .filter_map(|slot| Some((slot, block_reward(slot, previous, &current)?)))
        .collect::<BTreeMap<_, _>>();

    let average = average_proposer_reward(block_rewards.values().copied());

    for index in summary.indices() {
        let Some(validator) = summary.get(index) else {
            continue;
        };

        for proposal in validator.proposals {
            let patch = if proposal.proposed {
                let earned = block_rewards
                    .get(&proposal.slot)
                    .map(|reward| proposer_reward(reward.attestations, reward.sync));

                if earned.is_none() {
                    debug!("no rewards are known for block at slot {}", proposal.slot);
                }

                ProposeRewardPatch {
                    earned,
                    missed: None,
                    penalty: 0,
                }
            } else {
                ProposeRewardPatch {
                    earned: None,
                    missed: average,
                    penalty: 0,
                }
            };

            summary.apply_propose_reward(index, patch);
        }
    }
}

/// Share of the block's attester and sync committee rewards that goes to its proposer.
#[must_use]
pub const fn proposer_reward(attestation_rewards: Gwei, sync_rewards: Gwei) -> Gwei {
    (attestation_rewards + sync_rewards) * PROPOSER_WEIGHT / (WEIGHT_DENOMINATOR - PROPOSER_WEIGHT)
}

fn block_reward(slot: Slot, previous: &EpochMeta, current: &EpochMeta) -> Option<BlockReward> {
    let from_previous = previous.attestation_block_rewards.get(&slot).copied();
    let from_current = current.attestation_block_rewards.get(&slot).copied();

    if from_previous.is_none() && from_current.is_none() {
        return None;
    }

    Some(BlockReward {
        attestations: from_previous.unwrap_or_default() + from_current.unwrap_or_default(),
        sync: current.sync_block_rewards.get(&slot).copied().unwrap_or_default(),
    })
}

fn average_proposer_reward(
    block_rewards: impl ExactSizeIterator<Item = BlockReward>,
) -> Option<Gwei> {
    let blocks = block_rewards.len() as u64;

    let total = block_rewards.fold(BlockReward::default(), |total, reward| BlockReward {
        attestations: total.attestations + reward.attestations,
        sync: total.sync + reward.sync,
    });

    let attestations = total.attestations.checked_div(blocks)?;
    let sync = total.sync.checked_div(blocks)?;

    Some(proposer_reward(attestations, sync))
}
