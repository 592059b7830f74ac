use core::time::Duration;
use std::path::PathBuf;

use anyhow::{ensure, Result};
use beacon_api::Options;
use clap::{Args, Parser, ValueEnum};
use duty_monitor::MonitorConfig;
use fs_err as fs;
use reqwest::Url;
use types::{config::Config, primitives::Epoch};

const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 12;

/// Verifies validator duties and estimates their rewards using Beacon Node APIs
#[derive(Parser)]
#[clap(verbatim_doc_comment, version)]
pub struct MonitorArgs {
    #[clap(flatten)]
    chain_options: ChainOptions,

    #[clap(flatten)]
    beacon_api_options: BeaconApiOptions,

    /// Beacon node API URLs, tried in order
    #[clap(long, required = true, value_delimiter = ',')]
    beacon_node_urls: Vec<Url>,

    /// Directory to store epoch summaries in
    #[clap(long, value_name = "DIRECTORY")]
    data_dir: PathBuf,

    /// YAML file mapping validator public keys to their operators
    #[clap(long, value_name = "YAML_FILE")]
    validator_registry_file: Option<PathBuf>,

    /// Store summaries of every validator instead of only those with an operator
    #[clap(long)]
    track_all_validators: bool,

    /// First epoch to check [default: the latest checkable epoch]
    #[clap(long)]
    start_epoch: Option<Epoch>,

    /// Wait for epochs to be finalized before checking them
    #[clap(long)]
    follow_finalized: bool,

    /// Seconds between scheduling cycles
    #[clap(long, default_value_t = DEFAULT_POLL_INTERVAL_SECONDS)]
    poll_interval: u64,

    /// Collect Prometheus metrics
    #[clap(long)]
    metrics: bool,
}

#[derive(Args)]
struct ChainOptions {
    /// Name of the Eth2 network to monitor
    #[clap(long, value_enum, default_value_t = Network::default())]
    network: Network,

    /// Load chain configuration from YAML_FILE instead
    #[clap(long, value_name = "YAML_FILE")]
    configuration_file: Option<PathBuf>,
}

#[derive(Args)]
struct BeaconApiOptions {
    /// Attempts per endpoint before falling back to the next one
    #[clap(long, default_value_t = Options::default().retry_attempts)]
    retry_attempts: u32,

    /// Request timeout in seconds
    #[clap(long, default_value_t = Options::default().request_timeout.as_secs())]
    request_timeout: u64,

    /// Maximum number of concurrent requests per fan-out
    #[clap(long, default_value_t = Options::default().max_concurrent_requests)]
    max_concurrent_requests: usize,

    /// Number of consecutive slots searched for a block before giving up
    #[clap(long, default_value_t = Options::default().max_missed_slots)]
    max_missed_slots: u64,
}

impl From<BeaconApiOptions> for Options {
    fn from(beacon_api_options: BeaconApiOptions) -> Self {
        let BeaconApiOptions {
            retry_attempts,
            request_timeout,
            max_concurrent_requests,
            max_missed_slots,
        } = beacon_api_options;

        Self {
            retry_attempts,
            request_timeout: Duration::from_secs(request_timeout),
            max_concurrent_requests,
            max_missed_slots,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum Network {
    #[default]
    Mainnet,
    Minimal,
}

#[derive(Debug)]
pub struct MonitorSettings {
    pub chain_config: Config,
    pub options: Options,
    pub beacon_node_urls: Vec<Url>,
    pub data_dir: PathBuf,
    pub validator_registry_file: Option<PathBuf>,
    pub monitor_config: MonitorConfig,
    pub start_epoch: Option<Epoch>,
    pub follow_finalized: bool,
    pub poll_interval: Duration,
    pub metrics: bool,
}

impl MonitorArgs {
    // This is not a `TryFrom` impl because this reads files.
    pub fn try_into_settings(self) -> Result<MonitorSettings> {
        let Self {
            chain_options,
            beacon_api_options,
            beacon_node_urls,
            data_dir,
            validator_registry_file,
            track_all_validators,
            start_epoch,
            follow_finalized,
            poll_interval,
            metrics,
        } = self;

        let ChainOptions {
            network,
            configuration_file,
        } = chain_options;

        let chain_config = match configuration_file {
            Some(path) => serde_yaml::from_reader(fs::File::open(path)?)?,
            None => match network {
                Network::Mainnet => Config::mainnet(),
                Network::Minimal => Config::minimal(),
            },
        };

        ensure!(poll_interval > 0, "--poll-interval must be positive");

        if validator_registry_file.is_none() {
            ensure!(
                track_all_validators,
                "either --validator-registry-file or --track-all-validators must be passed",
            );
        }

        Ok(MonitorSettings {
            chain_config,
            options: beacon_api_options.into(),
            beacon_node_urls,
            data_dir,
            validator_registry_file,
            monitor_config: MonitorConfig {
                track_all_validators,
            },
            start_epoch,
            follow_finalized,
            poll_interval: Duration::from_secs(poll_interval),
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(arguments: &[&str]) -> Result<MonitorSettings> {
        let arguments = ["monitor", "--beacon-node-urls", "http://localhost:5052,http://fallback"]
            .into_iter()
            .chain(arguments.iter().copied());

        MonitorArgs::try_parse_from(arguments)?.try_into_settings()
    }

    #[test]
    fn defaults_follow_mainnet_and_the_api_defaults() -> Result<()> {
        let settings = parse(&["--data-dir", "epochs", "--validator-registry-file", "a.yaml"])?;

        assert_eq!(settings.chain_config, Config::mainnet());
        assert_eq!(settings.beacon_node_urls.len(), 2);
        assert_eq!(settings.options.retry_attempts, Options::default().retry_attempts);
        assert_eq!(settings.options.request_timeout, Options::default().request_timeout);
        assert_eq!(settings.poll_interval, Duration::from_secs(12));
        assert!(!settings.monitor_config.track_all_validators);
        assert!(!settings.follow_finalized);

        Ok(())
    }

    #[test]
    fn network_and_options_can_be_overridden() -> Result<()> {
        let settings = parse(&[
            "--data-dir",
            "epochs",
            "--track-all-validators",
            "--network",
            "minimal",
            "--max-missed-slots",
            "8",
            "--start-epoch",
            "100",
        ])?;

        assert_eq!(settings.chain_config, Config::minimal());
        assert_eq!(settings.options.max_missed_slots, 8);
        assert_eq!(settings.start_epoch, Some(100));
        assert!(settings.monitor_config.track_all_validators);

        Ok(())
    }

    #[test]
    fn validators_to_track_must_be_known() {
        parse(&["--data-dir", "epochs"]).expect_err("no validator would be tracked");
    }
}
