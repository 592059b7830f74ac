use core::time::Duration;
use std::{sync::Arc, time::Instant};

use anyhow::{bail, ensure, Result};
use parking_lot::Mutex;
use prometheus_metrics::{Metrics, Outcome};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use types::{
    block_id::BlockId,
    config::Config,
    containers::{
        BlockHeader, BlockInfo, CommitteeAssignment, ProposerDuties, SyncCommittee,
        ValidatorRecord,
    },
    primitives::{Epoch, Slot, UnixSeconds},
};

use crate::{
    block_cache::BlockCache,
    canonical,
    endpoints::{Endpoint, EndpointStatus, Endpoints},
    error::Error,
    options::Options,
    responses::{
        BlockMessage, Data, FinalityCheckpoints, Genesis, HeaderData, NodeVersion,
        ProposerDutiesResponse, Signed,
    },
};

/// Read-only client for the Eth Beacon Node API backed by a list of fallback endpoints.
pub struct BeaconApi {
    config: Arc<Config>,
    client: Client,
    options: Options,
    endpoints: Endpoints,
    block_cache: Arc<BlockCache>,
    version: OnceCell<String>,
    genesis_time: OnceCell<UnixSeconds>,
    head_tracker: SlotTracker,
    finalized_tracker: SlotTracker,
    metrics: Option<Arc<Metrics>>,
}

impl BeaconApi {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        client: Client,
        options: Options,
        urls: impl IntoIterator<Item = Url>,
        block_cache: Arc<BlockCache>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            config,
            client,
            options,
            endpoints: Endpoints::new(urls),
            block_cache,
            version: OnceCell::new(),
            genesis_time: OnceCell::new(),
            head_tracker: SlotTracker::default(),
            finalized_tracker: SlotTracker::default(),
            metrics,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &Arc<Config> {
        &self.config
    }

    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub const fn block_cache(&self) -> &Arc<BlockCache> {
        &self.block_cache
    }

    #[must_use]
    pub fn all_endpoints_offline(&self) -> bool {
        self.endpoints.all_offline()
    }

    pub async fn version(&self) -> Result<&str> {
        self.version
            .get_or_try_init(|| async {
                let response = self
                    .request_with_fallback::<Data<NodeVersion>>(
                        "version",
                        "/eth/v1/node/version",
                        &[],
                        accept_any,
                        never_fatal,
                    )
                    .await?;

                Ok::<_, anyhow::Error>(response.data.version)
            })
            .await
            .map(String::as_str)
    }

    pub async fn genesis_time(&self) -> Result<UnixSeconds> {
        self.genesis_time
            .get_or_try_init(|| async {
                let response = self
                    .request_with_fallback::<Data<Genesis>>(
                        "genesis",
                        "/eth/v1/beacon/genesis",
                        &[],
                        accept_any,
                        never_fatal,
                    )
                    .await?;

                Ok::<_, anyhow::Error>(response.data.genesis_time)
            })
            .await
            .copied()
    }

    pub async fn slot_time(&self, slot: Slot) -> Result<UnixSeconds> {
        let genesis_time = self.genesis_time().await?;
        let seconds_per_slot = self.config.seconds_per_slot.get();

        Ok(genesis_time.saturating_add(slot.saturating_mul(seconds_per_slot)))
    }

    pub async fn finalized_epoch(&self) -> Result<Epoch> {
        let response = self
            .request_with_fallback::<Data<FinalityCheckpoints>>(
                "finality_checkpoints",
                "/eth/v1/beacon/states/head/finality_checkpoints",
                &[],
                accept_any,
                never_fatal,
            )
            .await?;

        Ok(response.data.finalized.epoch)
    }

    /// Returns `None` if the block is absent.
    ///
    /// Headers resolved through `head` or `finalized` are rejected if their slot has not advanced
    /// for [`Options::stale_head_threshold`], which makes the call fall back to the next endpoint.
    pub async fn block_header(
        &self,
        block_id: BlockId,
        ignore_cache: bool,
    ) -> Result<Option<BlockHeader>> {
        if !ignore_cache {
            if let Some(entry) = self.block_cache.get(block_id) {
                if entry.missed {
                    return Ok(None);
                }

                if let Some(header) = entry.header {
                    return Ok(Some(header));
                }
            }
        }

        let tracker = match block_id {
            BlockId::Head => Some(&self.head_tracker),
            BlockId::Finalized => Some(&self.finalized_tracker),
            BlockId::Genesis | BlockId::Slot(_) | BlockId::Root(_) => None,
        };

        let stale_head_threshold = self.options.stale_head_threshold;

        let result = self
            .request_with_fallback::<Data<HeaderData>>(
                "block_header",
                &format!("/eth/v1/beacon/headers/{block_id}"),
                &[],
                |response| {
                    tracker.map_or(Ok(()), |tracker| {
                        tracker.observe(response.data.header.message.slot, stale_head_threshold)
                    })
                },
                repeated_not_found,
            )
            .await;

        match result {
            Ok(response) => {
                let header = BlockHeader::from(response.data);

                self.block_cache.set_header(block_id, header);
                self.block_cache.set_header(BlockId::Slot(header.slot), header);
                self.block_cache.set_header(BlockId::Root(header.root), header);

                Ok(Some(header))
            }
            Err(error) if Error::is_not_found_in(&error) => {
                self.block_cache.set_missed(block_id);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Returns `None` if the block is absent.
    pub async fn block_info(&self, block_id: BlockId) -> Result<Option<Arc<BlockInfo>>> {
        if let Some(entry) = self.block_cache.get(block_id) {
            if entry.missed {
                return Ok(None);
            }

            if let Some(info) = entry.info {
                return Ok(Some(info));
            }
        }

        let result = self
            .request_with_fallback::<Data<Signed<BlockMessage>>>(
                "block_info",
                &format!("/eth/v2/beacon/blocks/{block_id}"),
                &[],
                accept_any,
                repeated_not_found,
            )
            .await;

        match result {
            Ok(response) => {
                let BlockMessage {
                    slot,
                    proposer_index,
                    body,
                } = response.data.message;

                let info = Arc::new(BlockInfo {
                    slot,
                    proposer_index,
                    attestations: body.attestations,
                    sync_aggregate: body.sync_aggregate,
                    withdrawals: body
                        .execution_payload
                        .map(|payload| payload.withdrawals)
                        .unwrap_or_default(),
                });

                self.block_cache.set_info(block_id, Arc::clone(&info));
                self.block_cache.set_info(BlockId::Slot(slot), Arc::clone(&info));

                Ok(Some(info))
            }
            Err(error) if Error::is_not_found_in(&error) => {
                self.block_cache.set_missed(block_id);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    pub async fn attestation_committees(
        &self,
        state_id: BlockId,
        epoch: Epoch,
    ) -> Result<Vec<CommitteeAssignment>> {
        let response = self
            .request_with_fallback::<Data<Vec<CommitteeAssignment>>>(
                "attestation_committees",
                &format!("/eth/v1/beacon/states/{state_id}/committees"),
                &[("epoch", epoch.to_string())],
                accept_any,
                never_fatal,
            )
            .await?;

        Ok(response.data)
    }

    /// Returns `None` if the state has no sync committees.
    pub async fn sync_committee(
        &self,
        state_id: BlockId,
        epoch: Epoch,
    ) -> Result<Option<SyncCommittee>> {
        let result = self
            .request_with_fallback::<Data<SyncCommittee>>(
                "sync_committee",
                &format!("/eth/v1/beacon/states/{state_id}/sync_committees"),
                &[("epoch", epoch.to_string())],
                accept_any,
                repeated_not_found,
            )
            .await;

        match result {
            Ok(response) => Ok(Some(response.data)),
            Err(error) if Error::is_not_found_in(&error) => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub async fn validators(&self, state_id: BlockId) -> Result<Vec<ValidatorRecord>> {
        let response = self
            .request_with_fallback::<Data<Vec<ValidatorRecord>>>(
                "validators",
                &format!("/eth/v1/beacon/states/{state_id}/validators"),
                &[],
                accept_any,
                never_fatal,
            )
            .await?;

        Ok(response.data)
    }

    /// Fetches proposer duties and rejects responses computed on a different chain than ours.
    pub async fn canonical_proposer_duties(&self, epoch: Epoch) -> Result<ProposerDuties> {
        let expected = canonical::duty_dependent_root(self, epoch).await?;

        let response = self
            .request_with_fallback::<ProposerDutiesResponse>(
                "proposer_duties",
                &format!("/eth/v1/validator/duties/proposer/{epoch}"),
                &[],
                |response| {
                    let actual = response.dependent_root;

                    if actual == expected {
                        Ok(())
                    } else {
                        Err(Error::DependentRootMismatch {
                            epoch,
                            expected,
                            actual,
                        })
                    }
                },
                never_fatal,
            )
            .await?;

        Ok(ProposerDuties {
            dependent_root: response.dependent_root,
            duties: response.data,
        })
    }

    async fn request_with_fallback<T: DeserializeOwned>(
        &self,
        call: &str,
        path: &str,
        query: &[(&str, String)],
        resolved_is_bad: impl Fn(&T) -> Result<(), Error>,
        rejected_is_fatal: impl Fn(&Error, Option<&Error>) -> bool,
    ) -> Result<T> {
        let timer = self
            .metrics
            .as_ref()
            .and_then(|metrics| metrics.start_beacon_api_timer(call));

        let result = self
            .try_endpoints(call, path, query, resolved_is_bad, rejected_is_fatal)
            .await;

        if let Some(metrics) = self.metrics.as_ref() {
            if result.is_ok() {
                prometheus_metrics::stop_and_record(timer);
                metrics.register_beacon_api_request(call, Outcome::Success);
            } else {
                prometheus_metrics::stop_and_discard(timer);
                metrics.register_beacon_api_request(call, Outcome::Error);
            }
        }

        result
    }

    async fn try_endpoints<T: DeserializeOwned>(
        &self,
        call: &str,
        path: &str,
        query: &[(&str, String)],
        resolved_is_bad: impl Fn(&T) -> Result<(), Error>,
        rejected_is_fatal: impl Fn(&Error, Option<&Error>) -> bool,
    ) -> Result<T> {
        let mut previous_error = None;

        for endpoint in self.endpoints.iter() {
            let result = self
                .get_with_retry(endpoint, path, query)
                .await
                .and_then(|response| resolved_is_bad(&response).map(|()| response));

            let error = match result {
                Ok(response) => {
                    self.endpoints.set_status(endpoint, EndpointStatus::Online);
                    return Ok(response);
                }
                Err(error) => error,
            };

            let url = endpoint.url();

            if error.is_not_found() {
                self.endpoints.set_status(endpoint, EndpointStatus::Online);
                debug!("Beacon API endpoint {url} has no {call} for {path}");
            } else {
                self.endpoints.set_status(endpoint, EndpointStatus::Offline);

                match self.endpoints.next(endpoint) {
                    Some(next_endpoint) => warn!(
                        "Beacon API endpoint {url} failed {call} ({path}): {error}; \
                         switching to {}",
                        next_endpoint.url(),
                    ),
                    None => warn!(
                        "last available Beacon API endpoint {url} failed {call} ({path}): {error}",
                    ),
                }
            }

            if rejected_is_fatal(&error, previous_error.as_ref()) {
                bail!(error);
            }

            if self.endpoints.next(endpoint).is_some() {
                if let Some(metrics) = self.metrics.as_ref() {
                    metrics.register_endpoint_fallback();
                }
            }

            previous_error = Some(error);
        }

        ensure!(!self.endpoints.is_empty(), Error::NoEndpointsProvided);

        match previous_error {
            Some(source) => bail!(Error::EndpointsExhausted {
                source: Box::new(source),
            }),
            None => bail!(Error::NoEndpointsProvided),
        }
    }

    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let mut retry = 0_u32;

        loop {
            let error = match self.get(endpoint, path, query).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            if error.is_not_found() || retry.saturating_add(1) >= self.options.retry_attempts {
                return Err(error);
            }

            let backoff = self.options.backoff(retry);

            debug!(
                "request to {} ({path}) failed: {error}; retrying in {backoff:?}",
                endpoint.url(),
            );

            tokio::time::sleep(backoff).await;

            retry += 1;
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = format!("{}{path}", endpoint.url().as_str().trim_end_matches('/'));

        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(self.options.request_timeout)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Response { status, body });
        }

        let bytes = response.bytes().await?;

        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Remembers the last slot seen through a relative alias and when it was first seen.
///
/// Shared by all endpoints, so an endpoint behind the last accepted slot is rejected.
#[derive(Default)]
struct SlotTracker {
    last_seen: Mutex<Option<(Slot, Instant)>>,
}

impl SlotTracker {
    fn observe(&self, slot: Slot, threshold: Duration) -> Result<(), Error> {
        let mut last_seen = self.last_seen.lock();

        match *last_seen {
            Some((last_slot, _)) if slot < last_slot => {
                return Err(Error::HeadWentBackwards { slot, last_slot });
            }
            Some((last_slot, first_seen)) if slot == last_slot => {
                let unchanged_for = first_seen.elapsed();

                if unchanged_for >= threshold {
                    return Err(Error::StaleHead {
                        slot,
                        unchanged_for,
                    });
                }
            }
            _ => *last_seen = Some((slot, Instant::now())),
        }

        Ok(())
    }
}

const fn accept_any<T>(_: &T) -> Result<(), Error> {
    Ok(())
}

const fn never_fatal(_: &Error, _: Option<&Error>) -> bool {
    false
}

// A block missing on two endpoints in a row is considered absent.
fn repeated_not_found(error: &Error, previous: Option<&Error>) -> bool {
    error.is_not_found() && previous.is_some_and(Error::is_not_found)
}
