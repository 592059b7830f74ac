// Searches for non-missed blocks around a slot.
// Every search probes a bounded range of slots instead of recursing.

use core::ops::RangeInclusive;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::debug;
use types::{
    block_id::BlockId,
    consts::GENESIS_EPOCH,
    containers::{BlockHeader, BlockInfo},
    primitives::{Epoch, Slot, H256},
};

use crate::{beacon_api::BeaconApi, error::Error};

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct SlotAttestations {
    /// The first block after the attested slot, if one was found within the probed range.
    pub block: Option<Arc<BlockInfo>>,
    /// Slots between the attested slot and `block` that have no block.
    pub missed_slots: Vec<Slot>,
}

/// Probes `slot..=slot + max_depth` and returns the first header found.
pub async fn next_not_missed_header(
    api: &BeaconApi,
    slot: Slot,
    max_depth: u64,
) -> Result<BlockHeader> {
    for probed_slot in forward_range(slot, max_depth) {
        if let Some(header) = api.block_header(BlockId::Slot(probed_slot), false).await? {
            return Ok(header);
        }
    }

    Err(Error::MaxDepthExceeded { slot, max_depth }.into())
}

/// Probes `slot..=slot + max_depth` and returns the first block found.
pub async fn next_not_missed_block_info(
    api: &BeaconApi,
    slot: Slot,
    max_depth: u64,
) -> Result<Arc<BlockInfo>> {
    for probed_slot in forward_range(slot, max_depth) {
        if let Some(info) = api.block_info(BlockId::Slot(probed_slot)).await? {
            return Ok(info);
        }
    }

    Err(Error::MaxDepthExceeded { slot, max_depth }.into())
}

/// Probes `slot, slot - 1, …` down to `slot - max_depth` or genesis, whichever comes first.
pub async fn previous_not_missed_header(
    api: &BeaconApi,
    slot: Slot,
    max_depth: u64,
) -> Result<BlockHeader> {
    for probed_slot in (slot.saturating_sub(max_depth)..=slot).rev() {
        if let Some(header) = api.block_header(BlockId::Slot(probed_slot), false).await? {
            return Ok(header);
        }
    }

    Err(Error::MaxDepthExceededBackward { slot, max_depth }.into())
}

/// Returns the header of the block that was canonical at `slot`.
///
/// If `slot` was missed, the result is the block the next canonical block was built on,
/// so the slot of the result never exceeds `slot`.
pub async fn header_or_previous_if_missed(api: &BeaconApi, slot: Slot) -> Result<BlockHeader> {
    if let Some(header) = api.block_header(BlockId::Slot(slot), false).await? {
        return Ok(header);
    }

    let max_depth = api.options().max_missed_slots;

    let next = match next_not_missed_header(api, slot.saturating_add(1), max_depth).await {
        Ok(next) => next,
        Err(error) if Error::is_max_depth_exceeded_in(&error) => {
            debug!(
                "no block after missed slot {slot} within {max_depth} slots; \
                 searching backwards instead",
            );

            return previous_not_missed_header(api, slot.saturating_sub(1), max_depth).await;
        }
        Err(error) => return Err(error),
    };

    let parent = api
        .block_header(BlockId::Root(next.parent_root), false)
        .await?
        .ok_or(Error::MissingParentHeader {
            slot: next.slot,
            parent_root: next.parent_root,
        })?;

    Ok(parent)
}

/// Root of the last block before `epoch`. Proposer duties for `epoch` are derived from it.
pub async fn duty_dependent_root(api: &BeaconApi, epoch: Epoch) -> Result<H256> {
    if epoch == GENESIS_EPOCH {
        let genesis = api
            .block_header(BlockId::Genesis, false)
            .await?
            .context("genesis block is not available")?;

        return Ok(genesis.root);
    }

    let last_slot_of_previous_epoch = api
        .config()
        .compute_start_slot_at_epoch(epoch)
        .saturating_sub(1);

    let header = previous_not_missed_header(
        api,
        last_slot_of_previous_epoch,
        api.options().max_missed_slots,
    )
    .await?;

    Ok(header.root)
}

/// Attestations for `slot` are included starting with the block at `slot + 1`.
///
/// Running out of depth is not an error. The whole probed range is reported as missed instead.
pub async fn block_info_with_slot_attestations(
    api: &BeaconApi,
    slot: Slot,
    max_depth: u64,
) -> Result<SlotAttestations> {
    let first_slot = slot.saturating_add(1);

    match next_not_missed_block_info(api, first_slot, max_depth).await {
        Ok(block) => Ok(SlotAttestations {
            missed_slots: (first_slot..block.slot).collect(),
            block: Some(block),
        }),
        Err(error) if Error::is_max_depth_exceeded_in(&error) => {
            debug!("no block includes attestations for slot {slot}: {error}");

            Ok(SlotAttestations {
                block: None,
                missed_slots: forward_range(first_slot, max_depth).collect(),
            })
        }
        Err(error) => Err(error),
    }
}

/// Canonical roots resolved during one check, keyed by slot.
///
/// Concurrent lookups of the same slot share a single resolution.
pub struct CanonicalRoots<'api> {
    api: &'api BeaconApi,
    roots: DashMap<Slot, Arc<OnceCell<H256>>>,
}

impl<'api> CanonicalRoots<'api> {
    #[must_use]
    pub fn new(api: &'api BeaconApi) -> Self {
        Self {
            api,
            roots: DashMap::new(),
        }
    }

    pub async fn root_at_slot(&self, slot: Slot) -> Result<H256> {
        // The map guard must be released before awaiting.
        let cell = Arc::clone(&self.roots.entry(slot).or_default());

        cell.get_or_try_init(|| async {
            header_or_previous_if_missed(self.api, slot)
                .await
                .map(|header| header.root)
        })
        .await
        .copied()
    }

    pub async fn root_at_epoch(&self, epoch: Epoch) -> Result<H256> {
        let slot = self.api.config().compute_start_slot_at_epoch(epoch);
        self.root_at_slot(slot).await
    }
}

const fn forward_range(slot: Slot, max_depth: u64) -> RangeInclusive<Slot> {
    slot..=slot.saturating_add(max_depth)
}
