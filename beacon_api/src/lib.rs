pub use crate::{
    beacon_api::BeaconApi,
    block_cache::{BlockCache, CacheEntry},
    canonical::{CanonicalRoots, SlotAttestations},
    concurrency::try_join_bounded,
    error::Error,
    options::Options,
};

mod beacon_api;
mod block_cache;
pub mod canonical;
mod concurrency;
mod endpoints;
mod error;
mod options;
mod responses;
