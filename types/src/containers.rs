// These mirror the JSON representations used by the Eth Beacon Node API.
// Only fields the monitor reads are present. Unknown fields are ignored.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{
    bits::{BitList, BitVector},
    primitives::{
        CommitteeIndex, Epoch, ExecutionAddress, Gwei, PublicKeyBytes, Slot, ValidatorIndex,
        WithdrawalIndex, H256,
    },
};

#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Deserialize, Serialize)]
pub struct Checkpoint {
    #[serde_as(as = "DisplayFromStr")]
    pub epoch: Epoch,
    pub root: H256,
}

#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Deserialize, Serialize)]
pub struct AttestationData {
    #[serde_as(as = "DisplayFromStr")]
    pub slot: Slot,
    #[serde_as(as = "DisplayFromStr")]
    pub index: CommitteeIndex,
    pub beacon_block_root: H256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

/// An aggregate attestation as included in a block body.
///
/// `committee_bits` is present starting with Electra. In that case `data.index` is 0 and
/// `aggregation_bits` covers every committee selected by `committee_bits`, in ascending order.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct Attestation {
    pub aggregation_bits: BitList,
    pub data: AttestationData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committee_bits: Option<BitVector>,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct SyncAggregate {
    pub sync_committee_bits: BitVector,
}

#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct Withdrawal {
    #[serde_as(as = "DisplayFromStr")]
    pub index: WithdrawalIndex,
    #[serde_as(as = "DisplayFromStr")]
    pub validator_index: ValidatorIndex,
    pub address: ExecutionAddress,
    #[serde_as(as = "DisplayFromStr")]
    pub amount: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Serialize)]
pub struct BlockHeader {
    pub root: H256,
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Serialize)]
pub struct BlockInfo {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub attestations: Vec<Attestation>,
    pub sync_aggregate: Option<SyncAggregate>,
    pub withdrawals: Vec<Withdrawal>,
}

#[serde_as]
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct CommitteeAssignment {
    #[serde_as(as = "DisplayFromStr")]
    #[serde(rename = "index")]
    pub committee_index: CommitteeIndex,
    #[serde_as(as = "DisplayFromStr")]
    pub slot: Slot,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub validators: Vec<ValidatorIndex>,
}

#[serde_as]
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct SyncCommittee {
    /// Committee members by position. A validator may occupy several positions.
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub validators: Vec<ValidatorIndex>,
}

#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct ProposerDuty {
    pub pubkey: PublicKeyBytes,
    #[serde_as(as = "DisplayFromStr")]
    pub validator_index: ValidatorIndex,
    #[serde_as(as = "DisplayFromStr")]
    pub slot: Slot,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ProposerDuties {
    pub dependent_root: H256,
    pub duties: Vec<ProposerDuty>,
}

#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    #[serde_as(as = "DisplayFromStr")]
    pub effective_balance: Gwei,
    pub slashed: bool,
    #[serde_as(as = "DisplayFromStr")]
    pub activation_eligibility_epoch: Epoch,
    #[serde_as(as = "DisplayFromStr")]
    pub activation_epoch: Epoch,
    #[serde_as(as = "DisplayFromStr")]
    pub exit_epoch: Epoch,
    #[serde_as(as = "DisplayFromStr")]
    pub withdrawable_epoch: Epoch,
}

impl Validator {
    #[must_use]
    pub const fn is_active(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }
}

/// An entry of a state's validator registry together with its balance.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct ValidatorRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub index: ValidatorIndex,
    #[serde_as(as = "DisplayFromStr")]
    pub balance: Gwei,
    pub validator: Validator,
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use super::*;

    #[test]
    fn electra_attestation_deserializes_from_block_body() -> Result<()> {
        let json = json!({
            "aggregation_bits": "0x0b",
            "data": {
                "slot": "3200",
                "index": "0",
                "beacon_block_root": "0x0000000000000000000000000000000000000000000000000000000000000001",
                "source": {
                    "epoch": "98",
                    "root": "0x0000000000000000000000000000000000000000000000000000000000000002",
                },
                "target": {
                    "epoch": "100",
                    "root": "0x0000000000000000000000000000000000000000000000000000000000000003",
                },
            },
            "signature": "0x00",
            "committee_bits": "0x0500000000000000",
        });

        let attestation = serde_json::from_value::<Attestation>(json)?;

        assert_eq!(attestation.data.slot, 3200);
        assert_eq!(attestation.data.source.epoch, 98);
        assert_eq!(attestation.data.target.root, H256::from_low_u64_be(3));
        assert_eq!(attestation.aggregation_bits.len(), 3);

        let committee_bits = attestation
            .committee_bits
            .expect("Electra attestations carry committee bits");

        assert_eq!(committee_bits.iter_ones().collect::<Vec<_>>(), [0, 2]);

        Ok(())
    }

    #[test]
    fn committee_assignment_deserializes_stringified_indices() -> Result<()> {
        let json = json!({
            "index": "3",
            "slot": "3201",
            "validators": ["10", "11", "12"],
        });

        let committee = serde_json::from_value::<CommitteeAssignment>(json)?;

        assert_eq!(committee.committee_index, 3);
        assert_eq!(committee.slot, 3201);
        assert_eq!(committee.validators, [10, 11, 12]);

        Ok(())
    }
}
