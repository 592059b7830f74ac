use thiserror::Error;
use types::{
    primitives::{CommitteeIndex, Slot, ValidatorIndex},
    validator_status,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "block at slot {slot} was proposed by validator {actual} \
         but the duty belongs to validator {expected}"
    )]
    DutyMismatch {
        slot: Slot,
        expected: ValidatorIndex,
        actual: ValidatorIndex,
    },
    #[error("validator {index} has inconsistent epochs")]
    InconsistentValidatorEpochs {
        index: ValidatorIndex,
        source: validator_status::Error,
    },
    #[error(
        "aggregation bits of attestation for slot {slot} have length {actual} \
         but its committees have {expected} members"
    )]
    AggregationBitsLengthMismatch {
        slot: Slot,
        expected: usize,
        actual: usize,
    },
    #[error("attestation for slot {slot} refers to nonexistent committee {committee_index}")]
    UnknownCommittee {
        slot: Slot,
        committee_index: CommitteeIndex,
    },
}
