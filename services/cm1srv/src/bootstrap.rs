//! Service bootstrap
//!
//! Command line arguments and logging setup. Readings go to stdout as JSON
//! lines, so all log output goes to stderr and, optionally, a daily rolling
//! file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::ConfigOverrides;

pub const SERVICE_NAME: &str = "cm1srv";

/// Command-line arguments for cm1srv
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "cm1srv",
    version = env!("CARGO_PKG_VERSION"),
    about = "Dyacon CM-1 weather station poller",
    long_about = None
)]
pub struct Args {
    /// Configuration file (YAML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,

    /// Serial port, overrides station.port
    #[arg(short = 'p', long)]
    pub port: Option<String>,

    /// Modbus slave address, overrides station.address
    #[arg(short = 'a', long)]
    pub address: Option<u8>,

    /// Use the in-memory station instead of a serial port
    #[arg(long)]
    pub simulate: bool,

    /// Validation mode - print the effective configuration and exit
    #[arg(long)]
    pub validate: bool,

    /// Print system parameters and one reading, then exit
    #[arg(long)]
    pub once: bool,

    /// Print the station clock and exit
    #[arg(long, conflicts_with = "set_time")]
    pub get_time: bool,

    /// Set the station clock to the host UTC time and exit
    #[arg(long)]
    pub set_time: bool,
}

impl Args {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port.clone(),
            address: self.address,
            log_level: self.log_level.clone(),
        }
    }
}

/// Install the global subscriber
///
/// Filter priority: `RUST_LOG`, then `level`. When `log_dir` is set a daily
/// rolling file `cm1srv.log.YYYY-MM-DD` is written as well; keep the returned
/// guard alive for the life of the process or buffered lines are lost.
pub fn initialize_logging(level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(env) if !env.trim().is_empty() => EnvFilter::new(env),
        _ => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log level '{level}'"))?,
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .boxed();

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, format!("{SERVICE_NAME}.log"));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to init logging")?;

    Ok(guard)
}
