//! The `mirror` CLI.
//!
//! Provides two subcommands:
//!
//! - `mirror run` - run one simulation and print its `Stats` as JSON
//! - `mirror sweep` - run one simulation per point in a `(cpus,
//!   arrival_rate)` grid and append the results to a CSV file

mod csv_out;
mod sweep;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use mirror_core::MirrorOptions;

#[derive(Parser)]
#[command(name = "mirror", version, about = "Run MIRROR discrete-event simulations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation and print the resulting stats as JSON
    Run {
        /// Base configuration file (TOML); unset fields use built-in defaults
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        cpus: Option<u32>,

        #[arg(long = "arrival-rate")]
        arrival_rate: Option<f64>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Sweep a (cpus, arrival_rate) grid and append results to a CSV file
    Sweep {
        /// Base configuration file (TOML); unset fields use built-in defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Comma-separated cpu_count values, e.g. "8,16,32"
        #[arg(long)]
        cpus: String,

        /// Either a comma-separated list or a "start:stop:step" range, e.g.
        /// "5:75:5"
        #[arg(long = "arrival-rate")]
        arrival_rate: String,

        #[arg(long, default_value = "results.csv")]
        out: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, cpus, arrival_rate, seed } => run(config, cpus, arrival_rate, seed),
        Commands::Sweep { config, cpus, arrival_rate, out } => sweep(config, cpus, arrival_rate, out),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn load_base_options(config: Option<PathBuf>) -> Result<MirrorOptions, String> {
    match config {
        Some(path) => MirrorOptions::from_file(&path),
        None => Ok(MirrorOptions::default()),
    }
}

fn run(
    config: Option<PathBuf>,
    cpus: Option<u32>,
    arrival_rate: Option<f64>,
    seed: Option<u64>,
) -> Result<(), String> {
    let mut options = load_base_options(config)?;
    if let Some(cpus) = cpus {
        options.cpu_count = cpus;
    }
    if let Some(arrival_rate) = arrival_rate {
        options.arrival_rate = arrival_rate;
    }
    if seed.is_some() {
        options.seed = seed;
    }

    let stats = mirror_core::run(options);
    let json = serde_json::to_string_pretty(&stats).map_err(|e| format!("failed to encode stats: {e}"))?;
    println!("{json}");
    Ok(())
}

fn sweep(config: Option<PathBuf>, cpus: String, arrival_rate: String, out: PathBuf) -> Result<(), String> {
    let base = load_base_options(config)?;
    let cpu_values = sweep::parse_u32_list(&cpus)?;
    let arrival_values = sweep::parse_f64_range(&arrival_rate)?;
    let points = sweep::sweep_points(&cpu_values, &arrival_values);

    let mut rows = Vec::with_capacity(points.len());
    for point in points {
        eprintln!(
            "Running test: {} CPUs, {} transactions/1000 cycles",
            point.cpu_count, point.arrival_rate
        );
        let mut options = base.clone();
        options.cpu_count = point.cpu_count;
        options.arrival_rate = point.arrival_rate;
        let stats = mirror_core::run(options);
        rows.push(csv_out::Row::new(point, stats));
    }

    csv_out::append(&out, &rows)
}
