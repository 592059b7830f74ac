use std::{process::ExitCode, sync::Arc};

use anyhow::Result;
use beacon_api::{BeaconApi, BlockCache};
use clap::{Error as ClapError, Parser as _};
use duty_monitor::{DutyMonitor, ValidatorRegistry};
use prometheus_metrics::Metrics;
use reqwest::Client;
use tokio::runtime::Builder;
use tracing::{error, info};

use crate::{
    file_registry::FileRegistry,
    json_lines_storage::JsonLinesStorage,
    monitor_args::{MonitorArgs, MonitorSettings},
    scheduler::Scheduler,
};

mod file_registry;
mod json_lines_storage;
mod logging;
mod monitor_args;
mod scheduler;

fn main() -> ExitCode {
    if let Err(error) = try_main() {
        error.downcast_ref().map(ClapError::exit);
        error!("{error:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    logging::initialize_tracing_logger(module_path!(), false)?;

    let settings = MonitorArgs::try_parse()?.try_into_settings()?;

    Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(settings))
}

async fn run(settings: MonitorSettings) -> Result<()> {
    let MonitorSettings {
        chain_config,
        options,
        beacon_node_urls,
        data_dir,
        validator_registry_file,
        monitor_config,
        start_epoch,
        follow_finalized,
        poll_interval,
        metrics,
    } = settings;

    info!(
        "starting duty monitor for {} with {} beacon node endpoints",
        chain_config.config_name,
        beacon_node_urls.len(),
    );

    let metrics = if metrics {
        let metrics = Metrics::new()?;
        metrics.register_with_default_metrics()?;
        Some(Arc::new(metrics))
    } else {
        None
    };

    let chain_config = Arc::new(chain_config);
    let block_cache = Arc::new(BlockCache::new(Arc::clone(&chain_config)));

    let api = BeaconApi::new(
        chain_config,
        Client::new(),
        options,
        beacon_node_urls,
        block_cache,
        metrics.clone(),
    );

    info!("beacon node version: {}", api.version().await?);

    let registry: Arc<dyn ValidatorRegistry> = match validator_registry_file {
        Some(path) => Arc::new(FileRegistry::load(&path)?),
        None => Arc::new(FileRegistry::default()),
    };

    let storage = JsonLinesStorage::new(data_dir).await?;

    let monitor = DutyMonitor::new(
        Arc::new(api),
        registry,
        Arc::new(storage),
        monitor_config,
        metrics,
    );

    Scheduler::new(monitor, poll_interval, follow_finalized, start_epoch)
        .run()
        .await
}
