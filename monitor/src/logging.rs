use std::io::{self, IsTerminal as _};

use anyhow::Result;
use chrono::{Local, SecondsFormat};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::Writer, time::FormatTime},
    prelude::*,
    EnvFilter, Registry,
};

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> core::fmt::Result {
        write!(
            w,
            "[{}]",
            Local::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

pub fn initialize_tracing_logger(module_path: &str, always_write_style: bool) -> Result<()> {
    let mut filter = EnvFilter::default()
        .add_directive(LevelFilter::OFF.into())
        .add_directive("beacon_api=info".parse()?)
        .add_directive("duty_checkers=info".parse()?)
        .add_directive("duty_monitor=info".parse()?)
        .add_directive("duty_rewards=info".parse()?)
        .add_directive("duty_summary=info".parse()?)
        .add_directive("prometheus_metrics=info".parse()?)
        .add_directive(format!("{module_path}=info").parse()?);

    if let Ok(env_filter) = EnvFilter::try_from_env("MONITOR_LOG") {
        for directive in env_filter.to_string().split(',') {
            filter = filter.add_directive(directive.parse()?);
        }
    }

    let enable_ansi = always_write_style || io::stdout().is_terminal();

    let stdout_layer = fmt::layer::<Registry>()
        .compact()
        .with_thread_ids(false)
        .with_target(true)
        .with_file(false)
        .with_line_number(true)
        .with_timer(LocalTimer)
        .with_ansi(enable_ansi)
        .with_filter(filter);

    tracing_subscriber::registry().with(stdout_layer).try_init()?;

    Ok(())
}
