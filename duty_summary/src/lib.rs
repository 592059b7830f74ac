pub use crate::{
    epoch_meta::EpochMeta,
    epoch_summary::{EpochSummary, Inclusion},
    summary::{
        AttestationPatch, AttestationRewardPatch, Operator, Proposal, ProposePatch,
        ProposeRewardPatch, StatePatch, SyncPatch, SyncRewardPatch, ValidatorDutySummary,
    },
    timeliness::{ComponentWeights, Timeliness},
};

mod epoch_meta;
mod epoch_summary;
mod summary;
mod timeliness;
