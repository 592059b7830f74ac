pub use crate::{
    config::MonitorConfig,
    context::CheckContext,
    monitor::DutyMonitor,
    registry::ValidatorRegistry,
    storage::{EpochStorage, Summaries},
};

mod config;
mod context;
mod monitor;
mod registry;
mod storage;
