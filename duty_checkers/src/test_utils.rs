use core::time::Duration;
use std::sync::Arc;

use anyhow::Result;
use beacon_api::{BeaconApi, BlockCache, Options};
use httpmock::{Method, MockServer};
use reqwest::Client;
use serde_json::{json, Value};
use types::{
    config::Config,
    consts::FAR_FUTURE_EPOCH,
    containers::{Validator, ValidatorRecord},
    primitives::{Gwei, PublicKeyBytes, Slot, ValidatorIndex, H256},
};

pub fn beacon_api(server: &MockServer) -> Result<BeaconApi> {
    let config = Arc::new(Config::mainnet());

    let options = Options {
        retry_attempts: 1,
        retry_min_backoff: Duration::from_millis(1),
        max_missed_slots: 4,
        ..Options::default()
    };

    Ok(BeaconApi::new(
        Arc::clone(&config),
        Client::new(),
        options,
        [server.url("/").parse()?],
        Arc::new(BlockCache::new(config)),
        None,
    ))
}

pub fn validator_record(index: ValidatorIndex, effective_balance: Gwei) -> ValidatorRecord {
    ValidatorRecord {
        index,
        balance: effective_balance,
        validator: Validator {
            pubkey: PublicKeyBytes::from_low_u64_be(index),
            effective_balance,
            slashed: false,
            activation_eligibility_epoch: 0,
            activation_epoch: 0,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
        },
    }
}

pub fn root(slot: Slot) -> H256 {
    H256::from_low_u64_be(slot.saturating_add(1))
}

pub fn header_json(slot: Slot, parent_slot: Slot, proposer_index: ValidatorIndex) -> Value {
    json!({
        "data": {
            "root": root(slot),
            "canonical": true,
            "header": {
                "message": {
                    "slot": slot.to_string(),
                    "proposer_index": proposer_index.to_string(),
                    "parent_root": root(parent_slot),
                    "state_root": H256::zero(),
                    "body_root": H256::zero(),
                },
                "signature": "0x00",
            },
        },
    })
}

pub fn block_json(slot: Slot, body: Value) -> Value {
    json!({
        "version": "electra",
        "data": {
            "message": {
                "slot": slot.to_string(),
                "proposer_index": "1",
                "body": body,
            },
        },
    })
}

/// Serves headers and blocks for `present` slots (each built on the previous present slot).
/// Every other header or block responds with 404.
pub fn serve_chain(server: &MockServer, present: &[(Slot, ValidatorIndex, Value)]) {
    let mut parent_slot = present
        .first()
        .map_or(0, |(slot, _, _)| slot.saturating_sub(1));

    for (slot, proposer_index, body) in present.iter().cloned() {
        let header = header_json(slot, parent_slot, proposer_index);

        server.mock(|when, then| {
            when.method(Method::GET)
                .path(format!("/eth/v1/beacon/headers/{slot}"));
            then.status(200).json_body(header.clone());
        });

        server.mock(|when, then| {
            when.method(Method::GET)
                .path(format!("/eth/v1/beacon/headers/{:?}", root(slot)));
            then.status(200).json_body(header);
        });

        server.mock(|when, then| {
            when.method(Method::GET)
                .path(format!("/eth/v2/beacon/blocks/{slot}"));
            then.status(200).json_body(block_json(slot, body));
        });

        parent_slot = slot;
    }

    server.mock(|when, then| {
        when.method(Method::GET)
            .path_contains("/eth/v1/beacon/headers/");
        then.status(404).body("{}");
    });

    server.mock(|when, then| {
        when.method(Method::GET)
            .path_contains("/eth/v2/beacon/blocks/");
        then.status(404).body("{}");
    });
}
