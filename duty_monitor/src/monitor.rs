use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use anyhow::{Context as _, Result};
use beacon_api::{try_join_bounded, BeaconApi};
use duty_checkers::{DutyChecker, EpochValidators};
use duty_summary::{EpochMeta, EpochSummary};
use futures::future::try_join_all;
use parking_lot::Mutex;
use prometheus_metrics::Metrics;
use tracing::{debug, info, warn};
use types::{
    block_id::BlockId,
    containers::ValidatorRecord,
    primitives::{Epoch, Slot, ValidatorIndex},
};

use crate::{
    config::MonitorConfig, context::CheckContext, registry::ValidatorRegistry,
    storage::EpochStorage,
};

pub struct DutyMonitor {
    api: Arc<BeaconApi>,
    registry: Arc<dyn ValidatorRegistry>,
    storage: Arc<dyn EpochStorage>,
    config: MonitorConfig,
    context: Mutex<CheckContext>,
    metrics: Option<Arc<Metrics>>,
}

impl DutyMonitor {
    #[must_use]
    pub fn new(
        api: Arc<BeaconApi>,
        registry: Arc<dyn ValidatorRegistry>,
        storage: Arc<dyn EpochStorage>,
        config: MonitorConfig,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            api,
            registry,
            storage,
            config,
            context: Mutex::default(),
            metrics,
        }
    }

    #[must_use]
    pub const fn api(&self) -> &Arc<BeaconApi> {
        &self.api
    }

    /// Verifies the duties of `epoch` against the state at `state_slot` and stores the results.
    ///
    /// Blocks up to the end of epoch `epoch + 1` must already exist.
    /// Nothing is stored if any part of the check fails.
    pub async fn check(&self, epoch: Epoch, state_slot: Slot) -> Result<()> {
        let timer = self
            .metrics
            .as_ref()
            .and_then(|metrics| metrics.start_epoch_task_timer("check"));

        let result = self.check_epoch(epoch, state_slot).await;

        if let Some(metrics) = self.metrics.as_ref() {
            match &result {
                Ok(()) => {
                    prometheus_metrics::stop_and_record(timer);
                    metrics.set_last_checked_epoch(epoch);
                }
                Err(_) => {
                    prometheus_metrics::stop_and_discard(timer);
                    metrics.register_epoch_check_failure();
                }
            }
        }

        result
    }

    /// Validators that are due to propose a block or are in the sync committee in the head epoch.
    pub async fn possible_high_reward_validators(&self) -> Result<BTreeSet<ValidatorIndex>> {
        let head = self
            .api
            .block_header(BlockId::Head, true)
            .await?
            .context("head block is not available")?;

        let epoch = self.api.config().compute_epoch_at_slot(head.slot);

        let (proposer_duties, sync_committee) = tokio::try_join!(
            self.api.canonical_proposer_duties(epoch),
            self.api.sync_committee(BlockId::Slot(head.slot), epoch),
        )?;

        let mut validators = proposer_duties
            .duties
            .iter()
            .map(|duty| duty.validator_index)
            .collect::<BTreeSet<_>>();

        validators.extend(sync_committee.into_iter().flat_map(|committee| committee.validators));

        Ok(validators)
    }

    async fn check_epoch(&self, epoch: Epoch, state_slot: Slot) -> Result<()> {
        info!("checking duties of epoch {epoch} at slot {state_slot}");

        let (records, present_blocks) = tokio::try_join!(
            self.api.validators(BlockId::Slot(state_slot)),
            self.prefetch_blocks(epoch),
        )?;

        debug!(
            "epoch {epoch}: fetched {} validators and {present_blocks} blocks",
            records.len(),
        );

        let validators = Arc::new(self.attribute_operators(records));

        let tracked = (!self.config.track_all_validators)
            .then(|| validators.operated().collect::<HashSet<_>>());

        let summary = EpochSummary::new(epoch, tracked);

        let checkers = DutyChecker::all(&validators);

        try_join_all(
            checkers
                .iter()
                .map(|checker| self.run_checker(checker, epoch, state_slot, &summary)),
        )
        .await?;

        let previous_meta = self.previous_meta(epoch).await?;
        let config = self.api.config();

        duty_rewards::record_attestation_rewards(&summary);
        duty_rewards::record_sync_rewards(config, &summary);
        duty_rewards::record_propose_rewards(config, &summary, previous_meta.as_ref());

        let checked_validators = summary.len();
        let (summaries, meta) = summary.into_parts();

        self.storage
            .write_summaries(epoch, Box::new(summaries))
            .await?;

        self.storage.write_epoch_meta(epoch, &meta).await?;

        self.context.lock().finish(meta);

        let block_cache = self.api.block_cache();
        let purged = block_cache.purge_old(epoch);

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.set_checked_validators(checked_validators);
            metrics.set_block_cache_entries(block_cache.len());
        }

        info!(
            "epoch {epoch} checked: {checked_validators} validator summaries stored, \
             {purged} cached blocks purged",
        );

        Ok(())
    }

    async fn run_checker(
        &self,
        checker: &DutyChecker,
        epoch: Epoch,
        state_slot: Slot,
        summary: &EpochSummary,
    ) -> Result<()> {
        let timer = self
            .metrics
            .as_ref()
            .and_then(|metrics| metrics.start_epoch_task_timer(checker.name()));

        let result = checker
            .check(&self.api, epoch, state_slot, summary)
            .await
            .with_context(|| format!("{} check of epoch {epoch} failed", checker.name()));

        match result {
            Ok(()) => prometheus_metrics::stop_and_record(timer),
            Err(_) => prometheus_metrics::stop_and_discard(timer),
        }

        result
    }

    // Fills the block cache with every block the checkers of `epoch` will look at.
    async fn prefetch_blocks(&self, epoch: Epoch) -> Result<usize> {
        let config = self.api.config();
        let first_slot = config.compute_start_slot_at_epoch(epoch);
        let last_slot = config.compute_end_slot_at_epoch(epoch.saturating_add(1));

        let blocks = try_join_bounded(
            self.api.options().max_concurrent_requests,
            (first_slot..=last_slot).map(|slot| self.api.block_info(BlockId::Slot(slot))),
        )
        .await?;

        Ok(blocks.iter().flatten().count())
    }

    fn attribute_operators(&self, records: Vec<ValidatorRecord>) -> EpochValidators {
        let operators = records
            .iter()
            .filter_map(|record| {
                let operator = self.registry.operator(&record.validator.pubkey)?;
                Some((record.index, operator))
            })
            .collect::<HashMap<_, _>>();

        if operators.is_empty() && !self.config.track_all_validators {
            warn!("no validator in the state has a registered operator");
        }

        EpochValidators::new(records, operators)
    }

    async fn previous_meta(&self, epoch: Epoch) -> Result<Option<EpochMeta>> {
        let in_memory = self.context.lock().previous_meta(epoch).cloned();

        if in_memory.is_some() {
            return Ok(in_memory);
        }

        let Some(previous_epoch) = epoch.checked_sub(1) else {
            return Ok(None);
        };

        self.storage.epoch_meta(previous_epoch).await
    }
}
