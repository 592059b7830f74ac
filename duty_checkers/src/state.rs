use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use beacon_api::{try_join_bounded, BeaconApi};
use duty_summary::{EpochSummary, StatePatch};
use integer_sqrt::IntegerSquareRoot as _;
use tracing::debug;
use types::{
    block_id::BlockId,
    consts::{BASE_REWARD_FACTOR, EFFECTIVE_BALANCE_INCREMENT},
    primitives::{Epoch, Gwei, ValidatorIndex},
    validator_status::ValidatorStatus,
};

use crate::{epoch_validators::EpochValidators, error::Error};

/// Number of validators processed between yields to the scheduler.
pub const YIELD_EVERY: usize = 1024;

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
struct ActiveTotals {
    validators: u64,
    effective_balance: Gwei,
}

/// Records validator statuses and balances and derives the epoch's base reward.
pub struct StateChecker {
    validators: Arc<EpochValidators>,
}

impl StateChecker {
    #[must_use]
    pub const fn new(validators: Arc<EpochValidators>) -> Self {
        Self { validators }
    }

    pub async fn check(&self, api: &BeaconApi, epoch: Epoch, summary: &EpochSummary) -> Result<()> {
        let withdrawn = epoch_withdrawals(api, epoch).await?;
        let totals = record_states(epoch, &self.validators, &withdrawn, summary).await?;

        let base_reward = base_reward_per_increment(totals.effective_balance);

        debug!(
            "epoch {epoch}: {} active validators, base reward {base_reward}",
            totals.validators,
        );

        summary.update_meta(|meta| {
            meta.active_validators = totals.validators;
            meta.total_active_increments = totals.effective_balance / EFFECTIVE_BALANCE_INCREMENT;
            meta.base_reward = base_reward;
        });

        Ok(())
    }
}

/// Reward of a single effective balance increment for a perfect epoch.
///
/// Zero if there is no stake at all.
#[must_use]
pub fn base_reward_per_increment(total_active_balance: Gwei) -> Gwei {
    let sqrt = total_active_balance.integer_sqrt();

    if sqrt == 0 {
        return 0;
    }

    EFFECTIVE_BALANCE_INCREMENT * BASE_REWARD_FACTOR / sqrt
}

async fn epoch_withdrawals(api: &BeaconApi, epoch: Epoch) -> Result<HashMap<ValidatorIndex, Gwei>> {
    let blocks = try_join_bounded(
        api.options().max_concurrent_requests,
        api.config()
            .slots_in_epoch(epoch)
            .map(|slot| api.block_info(BlockId::Slot(slot))),
    )
    .await?;

    let mut withdrawn = HashMap::<_, Gwei>::new();

    for withdrawal in blocks.iter().flatten().flat_map(|block| &block.withdrawals) {
        *withdrawn.entry(withdrawal.validator_index).or_default() += withdrawal.amount;
    }

    Ok(withdrawn)
}

async fn record_states(
    epoch: Epoch,
    validators: &EpochValidators,
    withdrawn: &HashMap<ValidatorIndex, Gwei>,
    summary: &EpochSummary,
) -> Result<ActiveTotals> {
    let mut totals = ActiveTotals::default();

    for (position, record) in validators.records().iter().enumerate() {
        if position > 0 && position % YIELD_EVERY == 0 {
            tokio::task::yield_now().await;
        }

        let status = ValidatorStatus::new(&record.validator, record.balance, epoch).map_err(
            |source| Error::InconsistentValidatorEpochs {
                index: record.index,
                source,
            },
        )?;

        if status.is_active() {
            totals.validators += 1;
            totals.effective_balance += record.validator.effective_balance;
        }

        if !summary.is_tracked(record.index) {
            continue;
        }

        summary.apply_state(
            record.index,
            StatePatch {
                pubkey: record.validator.pubkey,
                operator: validators.operator(record.index).cloned(),
                status,
                balance: record.balance,
                effective_balance: record.validator.effective_balance,
                slashed: record.validator.slashed,
                withdrawn: withdrawn.get(&record.index).copied().unwrap_or_default(),
            },
        );
    }

    Ok(totals)
}
