use duty_summary::{AttestationRewardPatch, ComponentWeights, EpochMeta, EpochSummary, Timeliness};
use tracing::debug;
use types::{
    consts::{EFFECTIVE_BALANCE_INCREMENT, WEIGHT_DENOMINATOR},
    primitives::Gwei,
};

/// Computes attestation rewards of every validator with an attestation duty
/// and credits included attestations to the blocks that included them.
pub fn record_attestation_rewards(summary: &EpochSummary) {
    let meta = summary.meta();
    let mut rewarded = 0_usize;

    for index in summary.indices() {
        let Some(validator) = summary.get(index) else {
            continue;
        };

        if validator.att_slot.is_none() && !validator.att_happened {
            continue;
        }

        let timeliness = if validator.att_happened {
            Timeliness::new(
                validator.att_valid_source.unwrap_or_default(),
                validator.att_valid_target.unwrap_or_default(),
                validator.att_valid_head.unwrap_or_default(),
                validator.att_inc_delay.unwrap_or(u64::MAX),
            )
        } else {
            Timeliness::default()
        };

        let increments = validator.effective_balance / EFFECTIVE_BALANCE_INCREMENT;

        let patch = attestation_reward(&meta, increments, timeliness);

        summary.apply_attestation_reward(index, patch);

        rewarded += 1;
    }

    let inclusions = summary.inclusions();

    summary.update_meta(|meta| {
        for (inclusion, count) in inclusions {
            let reward = unweighted_attestation_reward(
                meta.base_reward,
                inclusion.effective_increments,
                inclusion.timeliness,
            );

            meta.credit_attestation_reward(inclusion.block_slot, reward * count);
        }
    });

    debug!(
        "epoch {}: attestation rewards computed for {rewarded} validators",
        meta.epoch,
    );
}

/// Each component is weighted by the share of active validators that got it right.
/// Components are truncated individually before being summed.
#[must_use]
pub fn attestation_reward(
    meta: &EpochMeta,
    effective_increments: u64,
    timeliness: Timeliness,
) -> AttestationRewardPatch {
    let correct = ComponentWeights {
        source: meta.correct_source,
        target: meta.correct_target,
        head: meta.correct_head,
    };

    let weighted = |weights: ComponentWeights| {
        let term = |weight, correct| {
            component_reward(weight, meta.base_reward, effective_increments)
                .checked_mul(correct)
                .and_then(|reward| reward.checked_div(meta.active_validators))
                .unwrap_or_default()
        };

        term(weights.source, correct.source)
            + term(weights.target, correct.target)
            + term(weights.head, correct.head)
    };

    let earned = weighted(timeliness.reward_weights());
    let perfect = weighted(Timeliness::PERFECT.reward_weights());

    let penalty_weights = timeliness.penalty_weights();

    let penalty = component_reward(penalty_weights.source, meta.base_reward, effective_increments)
        + component_reward(penalty_weights.target, meta.base_reward, effective_increments);

    AttestationRewardPatch {
        earned,
        missed: perfect.saturating_sub(earned),
        penalty,
    }
}

/// Reward of an attestation before it is scaled by participation.
#[must_use]
pub const fn unweighted_attestation_reward(
    base_reward: Gwei,
    effective_increments: u64,
    timeliness: Timeliness,
) -> Gwei {
    let weights = timeliness.reward_weights();

    component_reward(weights.source, base_reward, effective_increments)
        + component_reward(weights.target, base_reward, effective_increments)
        + component_reward(weights.head, base_reward, effective_increments)
}

const fn component_reward(weight: u64, base_reward: Gwei, effective_increments: u64) -> Gwei {
    weight * base_reward * effective_increments / WEIGHT_DENOMINATOR
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use duty_summary::{AttestationPatch, Inclusion, StatePatch};
    use test_case::test_case;
    use types::{primitives::PublicKeyBytes, validator_status::ValidatorStatus};

    use super::*;

    const LATE_HEAD: Timeliness = Timeliness {
        source: true,
        target: true,
        head: false,
    };

    fn meta() -> EpochMeta {
        EpochMeta {
            active_validators: 100,
            base_reward: 400,
            correct_source: 80,
            correct_target: 60,
            correct_head: 50,
            ..EpochMeta::new(100)
        }
    }

    #[test_case(Timeliness::PERFECT => AttestationRewardPatch { earned: 6760, missed: 0, penalty: 0 }; "perfect")]
    #[test_case(LATE_HEAD => AttestationRewardPatch { earned: 5360, missed: 1400, penalty: 0 }; "late head")]
    #[test_case(Timeliness::default() => AttestationRewardPatch { earned: 0, missed: 6760, penalty: 8000 }; "missed")]
    fn attestation_reward_components(timeliness: Timeliness) -> AttestationRewardPatch {
        attestation_reward(&meta(), 32, timeliness)
    }

    #[test]
    fn components_are_truncated_before_summing() {
        let meta = EpochMeta {
            active_validators: 7,
            base_reward: 333,
            correct_source: 5,
            correct_target: 5,
            correct_head: 5,
            ..EpochMeta::new(100)
        };

        // Truncating the sum instead would give 199.
        assert_eq!(attestation_reward(&meta, 1, Timeliness::PERFECT).earned, 198);
    }

    #[test]
    fn perfect_attestation_earns_every_weight() {
        assert_eq!(
            unweighted_attestation_reward(64, 1, Timeliness::PERFECT),
            ComponentWeights::ALL.sum(),
        );
    }

    #[test]
    fn no_active_validators_means_no_reward() {
        let meta = EpochMeta {
            base_reward: 400,
            ..EpochMeta::new(100)
        };

        assert_eq!(attestation_reward(&meta, 32, Timeliness::PERFECT).earned, 0);
    }

    #[test]
    fn rewards_are_recorded_for_assigned_validators_and_blocks() {
        let summary = EpochSummary::new(100, Some(HashSet::from([1, 2])));

        summary.update_meta(|current| *current = meta());

        summary.assign_attestation(1, 3200);
        summary.assign_attestation(2, 3200);
        summary.apply_attestation(
            1,
            AttestationPatch {
                inclusion_delay: 1,
                valid_head: true,
                valid_target: true,
                valid_source: true,
            },
        );

        for index in [1, 2] {
            summary.apply_state(
                index,
                StatePatch {
                    pubkey: PublicKeyBytes::zero(),
                    operator: None,
                    status: ValidatorStatus::ActiveOngoing,
                    balance: 32_000_000_000,
                    effective_balance: 32_000_000_000,
                    slashed: false,
                    withdrawn: 0,
                },
            );
        }

        summary.record_inclusion(Inclusion {
            block_slot: 3201,
            effective_increments: 32,
            timeliness: Timeliness::PERFECT,
        });

        summary.record_inclusion(Inclusion {
            block_slot: 3201,
            effective_increments: 32,
            timeliness: Timeliness::PERFECT,
        });

        record_attestation_rewards(&summary);

        let attested = summary.get(1).expect("validator 1 is tracked");

        assert_eq!(attested.att_earned_reward, Some(6760));
        assert_eq!(attested.att_penalty, Some(0));

        let absent = summary.get(2).expect("validator 2 is tracked");

        assert_eq!(absent.att_earned_reward, Some(0));
        assert_eq!(absent.att_missed_reward, Some(6760));
        assert_eq!(absent.att_penalty, Some(8000));

        assert_eq!(
            summary.meta().attestation_block_rewards,
            BTreeMap::from([(3201, 2 * 10800)]),
        );
    }
}
