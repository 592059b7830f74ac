use core::time::Duration;

use anyhow::{Context as _, Result};
use duty_monitor::DutyMonitor;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use types::{
    block_id::BlockId,
    config::Config,
    primitives::{Epoch, Slot},
};

/// Checks every epoch once its blocks and the blocks of the following epoch are settled.
///
/// A failed epoch is retried on the next cycle. Later epochs wait for it.
pub struct Scheduler {
    monitor: DutyMonitor,
    poll_interval: Duration,
    follow_finalized: bool,
    next_epoch: Option<Epoch>,
}

impl Scheduler {
    #[must_use]
    pub const fn new(
        monitor: DutyMonitor,
        poll_interval: Duration,
        follow_finalized: bool,
        start_epoch: Option<Epoch>,
    ) -> Self {
        Self {
            monitor,
            poll_interval,
            follow_finalized,
            next_epoch: start_epoch,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut interval = tokio::time::interval(self.poll_interval);

        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                result = tokio::signal::ctrl_c() => {
                    result?;
                    info!("received interrupt, stopping");
                    return Ok(());
                }
            }

            if let Err(error) = self.run_cycle().await {
                warn!("epoch check cycle failed: {error:?}");
            }
        }
    }

    async fn run_cycle(&mut self) -> Result<()> {
        let api = self.monitor.api();
        let config = api.config();

        let settled_slot = if self.follow_finalized {
            config.compute_start_slot_at_epoch(api.finalized_epoch().await?)
        } else {
            api.block_header(BlockId::Head, true)
                .await?
                .context("head block is not available")?
                .slot
        };

        let Some(last_epoch) = last_checkable_epoch(config, settled_slot) else {
            debug!("no epoch can be checked at slot {settled_slot} yet");
            return Ok(());
        };

        let first_epoch = *self.next_epoch.get_or_insert(last_epoch);

        for epoch in first_epoch..=last_epoch {
            let state_slot = config.compute_start_slot_at_epoch(epoch);

            self.monitor.check(epoch, state_slot).await?;
            self.next_epoch = Some(epoch + 1);
        }

        let validators = self.monitor.possible_high_reward_validators().await?;

        debug!(
            "{} validators have a proposer duty or sync committee membership in the head epoch",
            validators.len(),
        );

        Ok(())
    }
}

/// The latest epoch whose blocks and the blocks of the following epoch end before `settled_slot`.
#[must_use]
pub const fn last_checkable_epoch(config: &Config, settled_slot: Slot) -> Option<Epoch> {
    config.compute_epoch_at_slot(settled_slot).checked_sub(2)
}
