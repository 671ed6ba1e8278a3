use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use log::info;

use tpcclust::cluster::params::ClustererParams;
use tpcclust::cluster::row::{process_sector, total_diagnostics};
use tpcclust::config::{load_config, RunConfig};
use tpcclust::error::Result;
use tpcclust::sim::deposit::{DepositSimulator, SimParams};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    Default,
    Permissive,
    Strict,
}

/// Cluster finder on simulated TPC pad rows
#[derive(Parser, Debug)]
#[command(name = "tpcclust")]
#[command(about = "Simulate charge deposits on TPC pad rows and reconstruct clusters")]
struct Args {
    /// JSON run configuration (geometry, params, sim); defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Parameter preset, replaces the params section of the configuration
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Number of pad rows to simulate
    #[arg(long, default_value = "16")]
    rows: u32,

    /// Deposits per row, overrides the configuration
    #[arg(long)]
    deposits: Option<usize>,

    /// Random seed, overrides the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads (0 = all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Print all clusters as JSON to stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => RunConfig::default(),
    };
    if let Some(preset) = args.preset {
        let threads = config.params.num_threads;
        config.params = match preset {
            Preset::Default => ClustererParams::default(),
            Preset::Permissive => ClustererParams::permissive(),
            Preset::Strict => ClustererParams::strict(),
        }
        .with_threads(threads);
    }
    if let Some(n) = args.deposits {
        config.sim.deposits_per_row = n;
    }
    if let Some(seed) = args.seed {
        config.sim.seed = seed;
    }
    if let Some(threads) = args.threads {
        config.params.num_threads = threads;
    }

    let rows: Vec<_> = (0..args.rows)
        .map(|row| {
            let sim = SimParams { seed: config.sim.seed.wrapping_add(row as u64), ..config.sim.clone() };
            DepositSimulator::new(config.geometry.clone(), sim).simulate_row(0, row).digits
        })
        .collect();
    info!(
        "simulated {} rows, {} digits",
        rows.len(),
        rows.iter().map(|r| r.digits.len()).sum::<usize>()
    );

    let start = Instant::now();
    let results = process_sector(&rows, &config.params)?;
    let elapsed = start.elapsed();

    for r in &results {
        info!(
            "row {:3}: {:4} clusters, {:3} unfolded, {:3} edge, {:3} rejected",
            r.row,
            r.clusters.len(),
            r.diagnostics.unfolded,
            r.diagnostics.edge,
            r.diagnostics.rejected()
        );
    }
    let total = total_diagnostics(&results);
    info!("{}", total.summary());
    let reliable = results
        .iter()
        .flat_map(|r| r.clusters.iter())
        .filter(|c| c.has_reliable_shape())
        .count();
    info!("{} of {} clusters with a reliable shape", reliable, total.clusters());
    info!("clustered {} rows in {:.3} ms", results.len(), elapsed.as_secs_f64() * 1e3);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}
