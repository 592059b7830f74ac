use std::sync::Arc;

use dashmap::DashMap;
use types::{
    block_id::BlockId,
    config::Config,
    containers::{BlockHeader, BlockInfo},
    primitives::Epoch,
};

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct CacheEntry {
    /// The block is confirmed to be absent.
    pub missed: bool,
    pub header: Option<BlockHeader>,
    pub info: Option<Arc<BlockInfo>>,
}

impl CacheEntry {
    #[must_use]
    pub const fn missed() -> Self {
        Self {
            missed: true,
            header: None,
            info: None,
        }
    }
}

pub struct BlockCache {
    config: Arc<Config>,
    entries: DashMap<BlockId, CacheEntry>,
}

impl BlockCache {
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, block_id: BlockId) -> Option<CacheEntry> {
        self.entries.get(&block_id).map(|entry| entry.clone())
    }

    pub fn set(&self, block_id: BlockId, entry: CacheEntry) {
        if block_id.is_relative() {
            return;
        }

        self.entries.insert(block_id, entry);
    }

    pub fn set_header(&self, block_id: BlockId, header: BlockHeader) {
        self.update(block_id, |entry| {
            entry.missed = false;
            entry.header = Some(header);
        });
    }

    pub fn set_info(&self, block_id: BlockId, info: Arc<BlockInfo>) {
        self.update(block_id, |entry| {
            entry.missed = false;
            entry.info = Some(info);
        });
    }

    pub fn set_missed(&self, block_id: BlockId) {
        self.set(block_id, CacheEntry::missed());
    }

    /// Drops every root-keyed entry and every slot-keyed entry older than two epochs before `epoch`.
    ///
    /// Returns the number of entries left.
    pub fn purge_old(&self, epoch: Epoch) -> usize {
        let oldest_kept_slot = self
            .config
            .compute_start_slot_at_epoch(epoch.saturating_sub(2));

        self.entries.retain(|block_id, _| match block_id {
            BlockId::Slot(slot) => *slot >= oldest_kept_slot,
            _ => false,
        });

        self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn update(&self, block_id: BlockId, update: impl FnOnce(&mut CacheEntry)) {
        if block_id.is_relative() {
            return;
        }

        update(&mut self.entries.entry(block_id).or_default());
    }
}
