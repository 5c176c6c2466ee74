//! Headless simulation runner
//!
//! Runs a scenario to completion without a renderer and writes the final
//! report as JSON.
//!
//! Usage:
//!   satlink --commercial 8 --military 4 --stations 3 --duration-s 60 --seed 7
//!   satlink --config scenario.json --max-ticks 5000 --set jamming_probability=0.2

use anyhow::{bail, Context, Result};
use clap::Parser;
use satlink_core::{Orchestrator, OrchestratorConfig, SetupParams, SimulationParams};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "satlink", about = "Run a satellite link simulation headless")]
struct Args {
    /// Scenario file (OrchestratorConfig JSON); overrides the setup counts
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Commercial satellites to spawn
    #[arg(long, default_value_t = 5)]
    commercial: usize,

    /// Military satellites to spawn
    #[arg(long, default_value_t = 5)]
    military: usize,

    /// Ground stations to place
    #[arg(long, default_value_t = 3)]
    stations: usize,

    /// Run length in virtual seconds
    #[arg(long, default_value_t = 30.0)]
    duration_s: f64,

    /// RNG seed for generated scenarios
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Raw tick length in ms, before the speed multiplier
    #[arg(long, default_value_t = 16)]
    dt_ms: u64,

    /// Hard cap on executed ticks
    #[arg(long, default_value_t = 1_000_000)]
    max_ticks: usize,

    /// Speed multiplier in [0.1, 20]
    #[arg(long)]
    speed: Option<f64>,

    /// Parameter override, repeatable (key=value)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Report output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<OrchestratorConfig> {
    if let Some(path) = &args.config {
        let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
        let config: OrchestratorConfig =
            serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {:?}", path))?;
        return Ok(config);
    }

    if !(args.duration_s.is_finite() && args.duration_s > 0.0) {
        bail!("--duration-s must be positive, got {}", args.duration_s);
    }
    let setup = SetupParams {
        commercial_satellites: args.commercial,
        military_satellites: args.military,
        stations: args.stations,
        duration_ms: (args.duration_s * 1000.0).round() as u64,
    };
    Ok(OrchestratorConfig::from_setup(&setup, SimulationParams::default(), args.seed))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config(&args)?;
    info!(
        satellites = config.satellites.len(),
        stations = config.stations.len(),
        seed = config.rng_seed,
        "scenario loaded"
    );

    let mut sim = Orchestrator::new(config)?;

    if let Some(speed) = args.speed {
        if let Err(err) = sim.set_speed_multiplier(speed) {
            warn!(error = %err, "ignoring --speed");
        }
    }
    for entry in &args.overrides {
        let Some((key, value)) = entry.split_once('=') else {
            bail!("--set expects KEY=VALUE, got '{}'", entry);
        };
        // rejected values are logged and the previous value stays
        let _ = sim.set_param(key.trim(), value.trim());
    }

    let results = sim.run(args.max_ticks, args.dt_ms)?;
    let delivered: i64 = results.iter().map(|r| r.delivered_mb).sum();
    info!(ticks = results.len(), delivered_mb = delivered, "run finished");

    let report = sim.stop();
    let json = report.to_json()?;

    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path).with_context(|| format!("creating {:?}", path))?);
            writer.write_all(json.as_bytes())?;
            writer.flush()?;
            info!("Report written to {:?}", path);
        }
        None => println!("{}", json),
    }

    info!(
        delivered_mb = report.total_delivered_mb,
        destroyed = report.destroyed.len(),
        outages = report.outage_stats.count,
        "SUMMARY"
    );
    Ok(())
}
