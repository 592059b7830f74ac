use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use types::{
    containers::{
        Attestation, BlockHeader, Checkpoint, ProposerDuty, SyncAggregate, Withdrawal,
    },
    primitives::{Slot, UnixSeconds, ValidatorIndex, H256},
};

#[derive(Deserialize)]
pub struct Data<T> {
    pub data: T,
}

#[derive(Deserialize)]
pub struct NodeVersion {
    pub version: String,
}

#[serde_as]
#[derive(Deserialize)]
pub struct Genesis {
    #[serde_as(as = "DisplayFromStr")]
    pub genesis_time: UnixSeconds,
}

#[derive(Deserialize)]
pub struct FinalityCheckpoints {
    pub finalized: Checkpoint,
}

#[derive(Deserialize)]
pub struct HeaderData {
    pub root: H256,
    pub header: Signed<HeaderMessage>,
}

#[derive(Deserialize)]
pub struct Signed<T> {
    pub message: T,
}

#[serde_as]
#[derive(Deserialize)]
pub struct HeaderMessage {
    #[serde_as(as = "DisplayFromStr")]
    pub slot: Slot,
    #[serde_as(as = "DisplayFromStr")]
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
}

impl From<HeaderData> for BlockHeader {
    fn from(header_data: HeaderData) -> Self {
        let HeaderData { root, header } = header_data;

        let HeaderMessage {
            slot,
            proposer_index,
            parent_root,
            state_root,
        } = header.message;

        Self {
            root,
            slot,
            proposer_index,
            parent_root,
            state_root,
        }
    }
}

#[serde_as]
#[derive(Deserialize)]
pub struct BlockMessage {
    #[serde_as(as = "DisplayFromStr")]
    pub slot: Slot,
    #[serde_as(as = "DisplayFromStr")]
    pub proposer_index: ValidatorIndex,
    pub body: BlockBody,
}

#[derive(Deserialize)]
pub struct BlockBody {
    pub attestations: Vec<Attestation>,
    #[serde(default)]
    pub sync_aggregate: Option<SyncAggregate>,
    #[serde(default)]
    pub execution_payload: Option<ExecutionPayload>,
}

#[derive(Deserialize)]
pub struct ExecutionPayload {
    #[serde(default)]
    pub withdrawals: Vec<Withdrawal>,
}

#[derive(Deserialize)]
pub struct ProposerDutiesResponse {
    pub dependent_root: H256,
    pub data: Vec<ProposerDuty>,
}
