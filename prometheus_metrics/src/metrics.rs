use anyhow::Result;
use prometheus::{
    histogram_opts, opts, HistogramTimer, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    Registry,
};
use tracing::warn;
use types::primitives::Epoch;

use crate::helpers;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    const fn as_label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug)]
pub struct Metrics {
    // Beacon API client
    beacon_api_request_times: HistogramVec,
    beacon_api_requests: IntCounterVec,
    beacon_api_endpoint_fallbacks: IntCounter,

    // Block cache
    block_cache_entries: IntGauge,

    // Epoch pipeline
    epoch_task_times: HistogramVec,
    epoch_check_failures: IntCounter,
    last_checked_epoch: IntGauge,
    checked_validators: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            beacon_api_request_times: HistogramVec::new(
                histogram_opts!(
                    "BEACON_API_REQUEST_TIMES",
                    "Beacon node API call times including retries and fallback",
                ),
                &["call"],
            )?,

            beacon_api_requests: IntCounterVec::new(
                opts!("BEACON_API_REQUESTS", "Number of Beacon node API calls by outcome"),
                &["call", "outcome"],
            )?,

            beacon_api_endpoint_fallbacks: IntCounter::new(
                "BEACON_API_ENDPOINT_FALLBACKS",
                "Number of times a call moved on to the next beacon node endpoint",
            )?,

            block_cache_entries: IntGauge::new(
                "BLOCK_CACHE_ENTRIES",
                "Number of headers and blocks held in the block cache",
            )?,

            epoch_task_times: HistogramVec::new(
                histogram_opts!("EPOCH_TASK_TIMES", "Duty check pipeline task times"),
                &["task"],
            )?,

            epoch_check_failures: IntCounter::new(
                "EPOCH_CHECK_FAILURES",
                "Number of epoch checks aborted by an error",
            )?,

            last_checked_epoch: IntGauge::new(
                "LAST_CHECKED_EPOCH",
                "Most recent epoch whose duties were checked successfully",
            )?,

            checked_validators: IntGauge::new(
                "CHECKED_VALIDATORS",
                "Number of validator summaries written for the last checked epoch",
            )?,
        })
    }

    pub fn register_with_default_metrics(&self) -> Result<()> {
        self.register(prometheus::default_registry())
    }

    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.beacon_api_request_times.clone()))?;
        registry.register(Box::new(self.beacon_api_requests.clone()))?;
        registry.register(Box::new(self.beacon_api_endpoint_fallbacks.clone()))?;
        registry.register(Box::new(self.block_cache_entries.clone()))?;
        registry.register(Box::new(self.epoch_task_times.clone()))?;
        registry.register(Box::new(self.epoch_check_failures.clone()))?;
        registry.register(Box::new(self.last_checked_epoch.clone()))?;
        registry.register(Box::new(self.checked_validators.clone()))?;

        Ok(())
    }

    // Beacon API client
    #[must_use]
    pub fn start_beacon_api_timer(&self, call: &str) -> Option<HistogramTimer> {
        helpers::start_timer_vec(&self.beacon_api_request_times, &[call])
    }

    pub fn register_beacon_api_request(&self, call: &str, outcome: Outcome) {
        match self
            .beacon_api_requests
            .get_metric_with_label_values(&[call, outcome.as_label()])
        {
            Ok(counter) => counter.inc(),
            Err(error) => warn!("unable to count Beacon API call {call}: {error:?}"),
        }
    }

    pub fn register_endpoint_fallback(&self) {
        self.beacon_api_endpoint_fallbacks.inc();
    }

    // Block cache
    pub fn set_block_cache_entries(&self, entries: usize) {
        self.block_cache_entries
            .set(i64::try_from(entries).unwrap_or(i64::MAX));
    }

    // Epoch pipeline
    #[must_use]
    pub fn start_epoch_task_timer(&self, task: &str) -> Option<HistogramTimer> {
        helpers::start_timer_vec(&self.epoch_task_times, &[task])
    }

    pub fn register_epoch_check_failure(&self) {
        self.epoch_check_failures.inc();
    }

    pub fn set_last_checked_epoch(&self, epoch: Epoch) {
        self.last_checked_epoch
            .set(i64::try_from(epoch).unwrap_or(i64::MAX));
    }

    pub fn set_checked_validators(&self, count: usize) {
        self.checked_validators
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}
