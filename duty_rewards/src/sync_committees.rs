use duty_summary::{EpochSummary, SyncRewardPatch};
use types::{
    config::Config,
    consts::{SYNC_COMMITTEE_SIZE, SYNC_REWARD_WEIGHT, WEIGHT_DENOMINATOR},
    primitives::Gwei,
};

pub fn record_sync_rewards(config: &Config, summary: &EpochSummary) {
    let meta = summary.meta();

    let per_block = sync_reward_per_block(
        meta.total_active_increments,
        meta.base_reward,
        config.slots_per_epoch.get(),
    );

    for index in summary.indices() {
        let Some(validator) = summary.get(index) else {
            continue;
        };

        if !validator.is_sync {
            continue;
        }

        let synced = validator.synced_blocks.len() as u64;
        let expected = validator.sync_expected_blocks;
        let earned = per_block * synced;

        summary.apply_sync_reward(
            index,
            SyncRewardPatch {
                earned,
                missed: (per_block * expected).saturating_sub(earned),
                penalty: per_block * expected.saturating_sub(synced),
            },
        );
    }

    summary.update_meta(|meta| {
        meta.sync_block_rewards = meta
            .sync_participants
            .iter()
            .map(|(slot, participants)| (*slot, per_block * participants))
            .collect();
    });
}

/// Reward of a single sync committee member for a single block.
///
/// The epoch's sync reward is spread over the configured slots per epoch
/// (32 on mainnet) as in `process_sync_aggregate`.
#[must_use]
pub const fn sync_reward_per_block(
    total_active_increments: u64,
    base_reward: Gwei,
    slots_per_epoch: u64,
) -> Gwei {
    total_active_increments * SYNC_REWARD_WEIGHT * base_reward
        / (slots_per_epoch * SYNC_COMMITTEE_SIZE as u64 * WEIGHT_DENOMINATOR)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use duty_summary::SyncPatch;
    use test_case::test_case;

    use super::*;

    // Mainnet with 1 048 576 validators of 32 ETH each.
    #[test_case(33_554_432, 349, 32 => 22_336)]
    #[test_case(33_554_432, 349, 8 => 89_344)]
    #[test_case(0, 349, 32 => 0)]
    fn per_block_reward(
        total_active_increments: u64,
        base_reward: Gwei,
        slots_per_epoch: u64,
    ) -> Gwei {
        sync_reward_per_block(total_active_increments, base_reward, slots_per_epoch)
    }

    #[test]
    fn rewards_and_penalties_scale_with_synced_blocks() {
        let config = Config::mainnet();
        let summary = EpochSummary::new(100, None);

        summary.update_meta(|meta| {
            meta.total_active_increments = 33_554_432;
            meta.base_reward = 349;
            meta.sync_participants = BTreeMap::from([(3200, 500), (3202, 3)]);
        });

        summary.apply_sync(
            7,
            SyncPatch {
                synced_blocks: vec![3200, 3202, 3200],
                expected_blocks: 4,
            },
        );

        record_sync_rewards(&config, &summary);

        let validator = summary.get(7).expect("validator 7 is in the sync committee");

        assert_eq!(validator.sync_earned_reward, Some(67_008));
        assert_eq!(validator.sync_missed_reward, Some(22_336));
        assert_eq!(validator.sync_penalty, Some(22_336));

        assert_eq!(
            summary.meta().sync_block_rewards,
            BTreeMap::from([(3200, 11_168_000), (3202, 67_008)]),
        );
    }

    #[test]
    fn per_block_reward_follows_configured_slots_per_epoch() {
        let config = Config::minimal();
        let summary = EpochSummary::new(100, None);

        summary.update_meta(|meta| {
            meta.total_active_increments = 33_554_432;
            meta.base_reward = 349;
            meta.sync_participants = BTreeMap::from([(800, 1)]);
        });

        summary.apply_sync(
            7,
            SyncPatch {
                synced_blocks: vec![800],
                expected_blocks: 1,
            },
        );

        record_sync_rewards(&config, &summary);

        let validator = summary.get(7).expect("validator 7 is in the sync committee");

        assert_eq!(config.slots_per_epoch.get(), 8);
        assert_eq!(validator.sync_earned_reward, Some(89_344));
        assert_eq!(summary.meta().sync_block_rewards, BTreeMap::from([(800, 89_344)]));
    }
}
