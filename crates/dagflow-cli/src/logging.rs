//! Subscriber setup for the `dagflow` binary.

use std::env;
use std::io;

use clap::ValueEnum;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable read when `--log-level` is not given.
pub const TRACE_ENV: &str = "DAGFLOW_TRACE";

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Build the filter for `level`, falling back to `DAGFLOW_TRACE` and then to
/// `warn`. `off` disables logging entirely.
pub fn build_filter(level: Option<&str>) -> Result<EnvFilter, String> {
    let level_value = level
        .map(str::to_string)
        .or_else(|| env::var(TRACE_ENV).ok())
        .unwrap_or_else(|| "warn".to_string());

    if level_value.eq_ignore_ascii_case("off") {
        return Ok(EnvFilter::default().add_directive(LevelFilter::OFF.into()));
    }
    EnvFilter::try_new(&level_value).map_err(|err| format!("invalid log filter: {err}"))
}

/// Install a stderr subscriber. Returns false if one is already set.
pub fn init(level: Option<&str>, format: LogFormat) -> Result<bool, String> {
    if tracing::dispatcher::has_been_set() {
        return Ok(false);
    }
    let filter = build_filter(level)?;
    let map_init_err = |err: tracing_subscriber::util::TryInitError| {
        format!("failed to initialize logging: {err}")
    };

    let base = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => base
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr).json())
            .try_init()
            .map_err(map_init_err)?,
        LogFormat::Pretty => base
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr).pretty())
            .try_init()
            .map_err(map_init_err)?,
    }
    Ok(true)
}
