use crate::primitives::{Epoch, Gwei, Slot};

pub const FAR_FUTURE_EPOCH: Epoch = Epoch::MAX;
pub const GENESIS_EPOCH: Epoch = 0;
pub const GENESIS_SLOT: Slot = 0;

pub const EFFECTIVE_BALANCE_INCREMENT: Gwei = 1_000_000_000;
pub const BASE_REWARD_FACTOR: u64 = 64;

pub const TIMELY_SOURCE_WEIGHT: u64 = 14;
pub const TIMELY_TARGET_WEIGHT: u64 = 26;
pub const TIMELY_HEAD_WEIGHT: u64 = 14;
pub const SYNC_REWARD_WEIGHT: u64 = 2;
pub const PROPOSER_WEIGHT: u64 = 8;
pub const WEIGHT_DENOMINATOR: u64 = 64;

/// Inclusion delay bounds for timely attestation components.
///
/// The source bound is `integer_squareroot(SLOTS_PER_EPOCH)` on mainnet.
/// Target timeliness is bounded by the mainnet epoch length even on presets with shorter epochs.
pub const TIMELY_SOURCE_MAX_DELAY: u64 = 5;
pub const TIMELY_TARGET_MAX_DELAY: u64 = 32;
pub const TIMELY_HEAD_DELAY: u64 = 1;

pub const SYNC_COMMITTEE_SIZE: usize = 512;
pub const MAX_COMMITTEES_PER_SLOT: usize = 64;

const _: () = assert!(
    WEIGHT_DENOMINATOR
        == TIMELY_SOURCE_WEIGHT
            + TIMELY_TARGET_WEIGHT
            + TIMELY_HEAD_WEIGHT
            + SYNC_REWARD_WEIGHT
            + PROPOSER_WEIGHT
);
