//! CM-1 Polling Service (`cm1srv`)
//!
//! Reads a Dyacon CM-1 station on a fixed cadence and prints one JSON reading
//! per line on stdout.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use cm1_comlink::Transport;
use errors::StationErrorTrait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use cm1srv::{
    bootstrap::{self, Args},
    shutdown::cancel_on_shutdown,
    Cm1Config, PollController, Reading, RtuTransport, SimulatedStation,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Cm1Config::load(args.config.as_deref(), &args.overrides())
        .context("Failed to load configuration")?;
    let _log_guard =
        bootstrap::initialize_logging(&config.logging.level, config.logging.dir.as_deref())?;

    info!(
        "{} {} starting, station model {}",
        bootstrap::SERVICE_NAME,
        env!("CARGO_PKG_VERSION"),
        config.station.model
    );

    // Validation mode: print effective configuration and exit
    if args.validate {
        print!("{}", serde_yaml::to_string(&config)?);
        info!("Configuration is valid");
        return Ok(());
    }

    let transport: Box<dyn Transport> = if args.simulate {
        info!("Using simulated station");
        Box::new(SimulatedStation::with_default_image(config.register_map()?))
    } else {
        Box::new(RtuTransport::open(&config.station).context("Failed to open station link")?)
    };
    let mut controller = PollController::from_config(transport, &config)?;

    if args.get_time {
        let clock = controller.read_clock().await?;
        println!("{clock}");
        return Ok(());
    }
    if args.set_time {
        controller.write_clock(Utc::now()).await?;
        let clock = controller.read_clock().await?;
        println!("{clock}");
        return Ok(());
    }

    // Identity read: no data is better than data from an unknown device
    let params = controller
        .system_parameters_with_retry()
        .await
        .context("Station did not answer the system parameter read")?;

    if args.once {
        println!("{}", serde_json::to_string(&params)?);
        let reading = controller.poll_with_retry().await?;
        println!("{}", serde_json::to_string(&reading)?);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let signals = cancel_on_shutdown(cancel.clone());
    // Station outages are logged and ridden out; only cancellation or a
    // non-retryable error ends the loop
    let result = controller.run_until_cancelled(cancel, emit).await;
    signals.abort();

    if let Err(e) = &result {
        error!("Polling session ended ({}): {}", e.error_code(), e);
    }
    result.context("Polling failed")
}

fn emit(reading: Reading) {
    match serde_json::to_string(&reading) {
        Ok(line) => println!("{line}"),
        Err(e) => error!("Failed to serialise reading: {}", e),
    }
}
