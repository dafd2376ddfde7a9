//! # BMS Monitor
//!
//! Listens to a battery monitoring unit's CAN broadcasts through a USB SLCAN
//! adapter and periodically reports the decoded pack state.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging with tracing subscriber (stderr)
//!    - Load configuration, apply command-line overrides
//!
//! 2. **Main Loop** (`bms_can_monitor::monitor::run`)
//!    - Open the SLCAN adapter, retrying every `serial.reconnect_interval_ms`
//!    - Decode every received frame into the battery state
//!    - Emit a report line every `report.interval_ms`
//!
//! 3. **Graceful Shutdown**
//!    - Ctrl+C stops the loop and logs the frame totals
//!
//! # Examples
//!
//! ```bash
//! bms-monitor --config bms.toml --json
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use bms_can_monitor::bms::BmsDecoder;
use bms_can_monitor::clock::SystemTicks;
use bms_can_monitor::config::Config;
use bms_can_monitor::monitor::{self, MonitorSettings};
use bms_can_monitor::serial::{CanSerial, DEFAULT_DEVICE_PATHS};
use bms_can_monitor::telemetry::StateReport;

/// Port value that selects auto-detection among the default paths
const AUTO_PORT: &str = "auto";

/// BMS Monitor - decode battery CAN broadcasts from an SLCAN adapter
#[derive(Parser, Debug)]
#[command(name = "bms-monitor")]
#[command(about = "Decode battery monitoring unit CAN broadcasts", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial device of the SLCAN adapter ("auto" to probe common paths)
    #[arg(short, long, value_name = "PATH")]
    port: Option<String>,

    /// Print reports as JSON lines on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("BMS Monitor v{} starting...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Config::load(path)?
        }
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.serial.port = port;
    }
    if args.json {
        config.report.format = "json".to_string();
    }
    config.validate()?;

    let clock = SystemTicks::new();
    let decoder = BmsDecoder::new(config.bms);
    let json = config.report.format == "json";

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(e) => {
                warn!("Cannot listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    info!("Listening for BMS frames, press Ctrl+C to exit");

    let summary = monitor::run(
        &decoder,
        MonitorSettings::from(&config),
        || open_adapter(&config),
        &clock,
        shutdown,
        |report| emit_report(report, json),
    )
    .await;

    info!(
        "Total frames received: {} ({} recognised), {} reconnect attempts",
        summary.frames.received, summary.frames.recognised, summary.reconnect_attempts
    );

    Ok(())
}

/// Open the configured adapter, probing the default paths for "auto"
fn open_adapter(config: &Config) -> bms_can_monitor::error::Result<CanSerial> {
    if config.serial.port == AUTO_PORT {
        CanSerial::open_with_paths(DEFAULT_DEVICE_PATHS, config.serial.baud_rate)
    } else {
        CanSerial::open_with_paths(&[config.serial.port.as_str()], config.serial.baud_rate)
    }
}

fn emit_report(report: &StateReport, json: bool) {
    if json {
        match report.to_json() {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to serialize report: {}", e),
        }
    } else {
        info!("{}", report.to_text());
    }
}
