//! Allocation simulator CLI
//!
//! Runs a deterministic cluster-rebalancing simulation and streams the
//! per-tick metrics CSV to stdout (and optionally to a file).
//!
//! # Example
//!
//! ```bash
//! # 200 simulated seconds of the complex preset with a fixed seed
//! allocsim --preset complex --seed 42 --duration 200 --rate 500
//!
//! # Also capture the stream to a file
//! allocsim --preset single-range --out run.csv
//! ```

use allocsim_simulation::{MetricsTracker, RunOutcome, Simulator};
use allocsim_state::{FixedDelayExchange, PresetCatalog, ReplicaChanger};
use allocsim_types::testing_start_time;
use allocsim_workload::{Generator, RandomGenerator};
use chrono::Duration;
use clap::Parser;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Allocation simulator
///
/// Single-threaded and reproducible: the same preset, seed and
/// intervals always produce byte-identical output.
#[derive(Parser, Debug)]
#[command(name = "allocsim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Named topology preset to start from
    #[arg(short = 'p', long, default_value = "complex")]
    preset: String,

    /// Simulated run length in seconds
    #[arg(short = 'd', long, default_value = "200")]
    duration: i64,

    /// Tick interval in seconds
    #[arg(short = 'i', long, default_value = "10")]
    interval: i64,

    /// Replica-change application interval in seconds
    #[arg(long, default_value = "10")]
    change_interval: i64,

    /// Workload events per simulated second
    #[arg(long, default_value = "500")]
    rate: f64,

    /// Key span for the uniform workload
    #[arg(long, default_value = "10000")]
    key_span: i64,

    /// Fraction of workload events that are reads (0.0-1.0)
    #[arg(long, default_value = "0.8")]
    read_fraction: f64,

    /// Local-to-gossip propagation delay in seconds
    #[arg(long, default_value = "10")]
    local_delay: i64,

    /// Gossip-to-remote propagation delay in seconds
    #[arg(long, default_value = "10")]
    gossip_delay: i64,

    /// Random seed for reproducible results. When omitted, a random
    /// seed is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Also write the CSV stream to this file
    #[arg(short = 'o', long)]
    out: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if args.interval <= 0 || args.change_interval <= 0 || args.duration < 0 {
        error!(
            interval = args.interval,
            change_interval = args.change_interval,
            duration = args.duration,
            "intervals must be positive and duration non-negative"
        );
        return ExitCode::FAILURE;
    }
    let seed = args.seed.unwrap_or_else(rand::random);

    let catalog = PresetCatalog::default();
    let state = match catalog.load(&args.preset) {
        Ok(state) => state,
        Err(e) => {
            error!(preset = %args.preset, error = %e, "failed to load preset");
            return ExitCode::FAILURE;
        }
    };

    let start = testing_start_time();
    let end = start + Duration::seconds(args.duration);
    let interval = Duration::seconds(args.interval);

    info!(
        preset = %args.preset,
        seed,
        duration_secs = args.duration,
        interval_secs = args.interval,
        rate = args.rate,
        "starting run"
    );

    let mut exchange = FixedDelayExchange::new(
        start,
        Duration::seconds(args.local_delay),
        Duration::seconds(args.gossip_delay),
    );
    exchange.put(start, state.store_descriptors());
    exchange.tick(start);

    let generator = RandomGenerator::new(start, args.rate, seed)
        .with_key_span(args.key_span)
        .with_read_fraction(args.read_fraction);
    let generators: Vec<Box<dyn Generator>> = vec![Box::new(generator)];

    let mut sinks: Vec<Box<dyn Write>> = vec![Box::new(io::stdout())];
    if let Some(path) = &args.out {
        match File::create(path) {
            Ok(file) => sinks.push(Box::new(file)),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to create output file");
                return ExitCode::FAILURE;
            }
        }
    }

    let mut sim = match Simulator::new(
        start,
        end,
        interval,
        generators,
        state,
        exchange,
        ReplicaChanger::new(),
        Duration::seconds(args.change_interval),
        MetricsTracker::new(sinks),
    ) {
        Ok(sim) => sim,
        Err(e) => {
            error!(error = %e, "invalid simulation configuration");
            return ExitCode::FAILURE;
        }
    };

    match sim.run() {
        RunOutcome::Completed => ExitCode::SUCCESS,
        RunOutcome::Cancelled => {
            info!("run cancelled");
            ExitCode::SUCCESS
        }
    }
}
