//! maneuver-cli - Run longitudinal maneuver sessions
//!
//! Usage:
//!   maneuver-cli [OPTIONS] run
//!   maneuver-cli [OPTIONS] maneuvers
//!
//! Without a `[bus]` section in the configuration the session runs against
//! the in-process simulated vehicle, configured by an optional `[sim]`
//! section. Ctrl-C stops the running maneuver between ticks; the bus device
//! is disabled and the report is written either way.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use maneuver_bus::{create_device, BusDevice};
use maneuver_runner::{export_json, HarnessConfig, ReportBuilder, Session, TraceBook};
use maneuver_sim::{SimBusDevice, SimConfig, SimFingerprinter};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "maneuver-cli")]
#[command(author, version, about = "Longitudinal maneuver harness")]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "MANEUVER_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured maneuver and write the report
    Run {
        /// HTML report path (overrides the configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also export the raw traces as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// List the maneuvers a run would execute
    Maneuvers,
}

/// Harness configuration plus the simulator settings that live next to it
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(flatten)]
    harness: HarnessConfig,
    #[serde(default)]
    sim: SimConfig,
}

impl ConfigFile {
    fn from_toml(content: &str) -> Result<Self> {
        let file: Self = toml::from_str(content).context("Failed to parse config")?;
        file.harness.validate()?;
        Ok(file)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "maneuver_cli=debug,maneuver_runner=debug,maneuver_bus=debug,maneuver_sim=debug"
    } else {
        "maneuver_cli=info,maneuver_runner=info,maneuver_bus=info,maneuver_sim=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(fmt::layer())
        .init();

    let (config, sim) = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { output, json } => run(config, sim, output, json).await,
        Commands::Maneuvers => {
            list_maneuvers(&config);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<(HarnessConfig, SimConfig)> {
    let Some(path) = path else {
        info!("No config file provided, using defaults and the simulated vehicle");
        return Ok((HarnessConfig::default(), SimConfig::default()));
    };

    info!(path = %path.display(), "Loading config");
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file = ConfigFile::from_toml(&content)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    Ok((file.harness, file.sim))
}

fn list_maneuvers(config: &HarnessConfig) {
    for (i, maneuver) in config.maneuvers().iter().enumerate() {
        println!(
            "#{:<3} {:<50} setup: {:<20} {:.2}s",
            i,
            maneuver.description(),
            maneuver.setup().to_string(),
            maneuver.duration_s()
        );
    }
}

async fn run(
    config: HarnessConfig,
    sim: SimConfig,
    output: Option<PathBuf>,
    json: Option<PathBuf>,
) -> Result<()> {
    let device: Arc<dyn BusDevice> = match &config.bus {
        Some(bus) => create_device(bus).context("Failed to open bus device")?,
        None => Arc::new(SimBusDevice::new(sim.clone())),
    };
    info!(device = %device.describe(), "Bus device ready");

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stop requested, finishing the current tick");
            let _ = stop_tx.send(true);
        }
    });

    let maneuvers = config.maneuvers();
    let session = Session::new(
        device,
        Arc::new(SimFingerprinter::new(&sim)),
        config.timing.clone(),
    )
    .with_stop_signal(stop_rx);

    let mut book = TraceBook::new();
    let result = session.run(&maneuvers, &mut book).await;
    if let Err(e) = &result {
        error!(error = %e, "Session failed");
    }

    let report_path = output.unwrap_or_else(|| config.report.output.clone());
    ReportBuilder::new(config.report.clone())
        .write(&book, &report_path)
        .context("Failed to write report")?;

    if let Some(json_path) = json.or_else(|| config.report.trace_json.clone()) {
        export_json(&book, &json_path).context("Failed to export traces")?;
    }

    result.context("Session did not complete")
}
