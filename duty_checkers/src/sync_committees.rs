use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use beacon_api::{try_join_bounded, BeaconApi};
use duty_summary::{EpochSummary, SyncPatch};
use itertools::{Either, Itertools as _};
use tracing::debug;
use types::{
    block_id::BlockId,
    containers::BlockInfo,
    primitives::{Epoch, Slot},
};

/// Records which blocks of an epoch each sync committee position signed.
#[derive(Clone, Copy, Default, Debug)]
pub struct SyncChecker;

impl SyncChecker {
    pub async fn check(
        self,
        api: &BeaconApi,
        epoch: Epoch,
        state_slot: Slot,
        summary: &EpochSummary,
    ) -> Result<()> {
        let Some(committee) = api
            .sync_committee(BlockId::Slot(state_slot), epoch)
            .await?
        else {
            debug!("no sync committee for epoch {epoch}");
            return Ok(());
        };

        let slots = api.config().slots_in_epoch(epoch);

        let blocks = try_join_bounded(
            api.options().max_concurrent_requests,
            slots.clone().map(|slot| api.block_info(BlockId::Slot(slot))),
        )
        .await?;

        let (missed_slots, blocks): (Vec<Slot>, Vec<Arc<BlockInfo>>) = slots
            .zip(blocks)
            .partition_map(|(slot, block)| match block {
                Some(block) => Either::Right(block),
                None => Either::Left(slot),
            });

        if !missed_slots.is_empty() {
            debug!("epoch {epoch}: missed slots without sync participation: {missed_slots:?}");
        }

        let aggregates = blocks
            .iter()
            .filter_map(|block| {
                let aggregate = block.sync_aggregate.as_ref();

                if aggregate.is_none() {
                    debug!("block at slot {} has no sync aggregate", block.slot);
                }

                aggregate.map(|aggregate| (block.slot, &aggregate.sync_committee_bits))
            })
            .collect_vec();

        let expected_blocks = aggregates.len() as u64;

        for (position, validator_index) in committee.validators.iter().copied().enumerate() {
            if !summary.is_tracked(validator_index) {
                continue;
            }

            let synced_blocks = aggregates
                .iter()
                .filter(|(_, bits)| bits.get(position).is_some_and(|bit| *bit))
                .map(|(slot, _)| *slot)
                .collect();

            summary.apply_sync(
                validator_index,
                SyncPatch {
                    synced_blocks,
                    expected_blocks,
                },
            );
        }

        let participants = aggregates
            .iter()
            .map(|(slot, bits)| (*slot, bits.count_ones() as u64))
            .collect::<BTreeMap<_, _>>();

        summary.update_meta(|meta| {
            meta.sync_blocks = participants.keys().copied().collect();
            meta.sync_participants = participants;
        });

        Ok(())
    }
}
