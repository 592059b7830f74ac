use anyhow::{ensure, Result};
use beacon_api::{try_join_bounded, BeaconApi};
use duty_summary::{EpochSummary, ProposePatch};
use tracing::{debug, info};
use types::{block_id::BlockId, containers::ProposerDuties, primitives::Epoch};

use crate::error::Error;

/// Compares canonical proposer duties with the blocks that ended up in the chain.
#[derive(Clone, Copy, Default, Debug)]
pub struct ProposeChecker;

impl ProposeChecker {
    pub async fn check(self, api: &BeaconApi, epoch: Epoch, summary: &EpochSummary) -> Result<()> {
        let ProposerDuties { duties, .. } = api.canonical_proposer_duties(epoch).await?;

        let headers = try_join_bounded(
            api.options().max_concurrent_requests,
            duties
                .iter()
                .map(|duty| api.block_header(BlockId::Slot(duty.slot), false)),
        )
        .await?;

        let mut missed = 0_usize;

        for (duty, header) in duties.iter().zip(headers) {
            let proposed = match header {
                Some(header) => {
                    ensure!(
                        header.proposer_index == duty.validator_index,
                        Error::DutyMismatch {
                            slot: duty.slot,
                            expected: duty.validator_index,
                            actual: header.proposer_index,
                        },
                    );

                    true
                }
                None => {
                    debug!(
                        "validator {} missed its block at slot {}",
                        duty.validator_index, duty.slot,
                    );

                    missed += 1;
                    false
                }
            };

            summary.apply_propose(
                duty.validator_index,
                ProposePatch {
                    slot: duty.slot,
                    proposed,
                },
            );
        }

        if missed > 0 {
            info!("epoch {epoch}: {missed} of {} blocks were missed", duties.len());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::{Method, MockServer};
    use serde_json::{json, Value};
    use types::primitives::{PublicKeyBytes, Slot, ValidatorIndex};

    use crate::test_utils::{beacon_api, root, serve_chain};

    use super::*;

    fn serve_duties(server: &MockServer, duties: &[(Slot, ValidatorIndex)]) {
        let data = duties
            .iter()
            .map(|(slot, validator_index)| {
                json!({
                    "pubkey": PublicKeyBytes::from_low_u64_be(*validator_index),
                    "validator_index": validator_index.to_string(),
                    "slot": slot.to_string(),
                })
            })
            .collect::<Vec<_>>();

        server.mock(|when, then| {
            when.method(Method::GET)
                .path("/eth/v1/validator/duties/proposer/100");
            then.status(200).json_body(json!({
                "dependent_root": root(3199),
                "execution_optimistic": false,
                "data": data,
            }));
        });
    }

    fn empty() -> Value {
        json!({ "attestations": [] })
    }

    #[tokio::test]
    async fn missed_slot_is_recorded_as_not_proposed() -> Result<()> {
        let server = MockServer::start();

        serve_duties(&server, &[(3200, 1), (3201, 2), (3202, 3)]);
        serve_chain(
            &server,
            &[(3199, 9, empty()), (3200, 1, empty()), (3202, 3, empty())],
        );

        let api = beacon_api(&server)?;
        let summary = EpochSummary::new(100, None);

        ProposeChecker.check(&api, 100, &summary).await?;

        let missed = summary.get(2).expect("validator 2 has a duty");

        assert!(missed.is_proposer);
        assert!(!missed.block_proposed());
        assert_eq!(missed.proposals.first().map(|proposal| proposal.slot), Some(3201));

        assert!(summary.get(1).expect("validator 1 has a duty").block_proposed());
        assert!(summary.get(3).expect("validator 3 has a duty").block_proposed());

        Ok(())
    }

    #[tokio::test]
    async fn block_by_another_proposer_is_a_duty_mismatch() -> Result<()> {
        let server = MockServer::start();

        serve_duties(&server, &[(3210, 5)]);
        serve_chain(&server, &[(3199, 9, empty()), (3210, 6, empty())]);

        let api = beacon_api(&server)?;
        let summary = EpochSummary::new(100, None);

        let error = ProposeChecker
            .check(&api, 100, &summary)
            .await
            .expect_err("block at slot 3210 was proposed by validator 6");

        assert!(matches!(
            error.downcast_ref::<Error>(),
            Some(Error::DutyMismatch {
                slot: 3210,
                expected: 5,
                actual: 6,
            }),
        ));

        Ok(())
    }
}
