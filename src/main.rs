//! ARBOR - CLI Entry Point
//!
//! Artificial-life simulator driven by evolvable decision trees.

use arbor::{benchmark, Config, World};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "arbor")]
#[command(version)]
#[command(about = "Artificial-life simulator with evolvable decision-tree organisms")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a new simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of steps to simulate
        #[arg(short, long, default_value = "10000")]
        steps: u64,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,

        /// Write the statistics history here as JSON
        #[arg(long)]
        stats_out: Option<PathBuf>,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of steps
        #[arg(short, long, default_value = "1000")]
        steps: u64,

        /// Population size
        #[arg(short, long, default_value = "500")]
        population: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

/// Install the logger; `RUST_LOG` overrides `default_level`
fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            steps,
            seed,
            quiet,
            stats_out,
        } => run_simulation(config, steps, seed, quiet, stats_out),

        Commands::Benchmark { steps, population } => {
            init_logging("info");
            run_benchmark(steps, population)
        }

        Commands::Init { output } => {
            init_logging("info");
            generate_config(output)
        }
    }
}

fn run_simulation(
    config_path: PathBuf,
    steps: u64,
    seed: Option<u64>,
    quiet: bool,
    stats_out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Load or create config
    let from_file = config_path.exists();
    let config = if from_file {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };

    let level = config.logging.level_filter()?;
    init_logging(&level.to_string().to_lowercase());

    if from_file {
        println!("Loading config from: {:?}", config_path);
    } else {
        println!("Using default configuration");
    }

    let mut world = match seed {
        Some(s) => {
            println!("Using seed: {}", s);
            World::new_with_seed(config.clone(), s)?
        }
        None => World::new(config.clone())?,
    };

    println!("Starting simulation");
    println!("  Initial population: {}", world.population());
    println!("  Grid size: {}x{}", config.world.width, config.world.height);
    println!("  Steps: {}", steps);
    println!();

    let start = Instant::now();
    let stats_interval = config.logging.stats_interval;

    for _ in 0..steps {
        world.step();

        if !quiet && world.time % stats_interval == 0 {
            println!("{}", world.stats.summary());
        }
    }

    let elapsed = start.elapsed();
    let steps_per_sec = world.time as f64 / elapsed.as_secs_f64();

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Steps: {}", world.time);
    println!("Speed: {:.1} steps/s", steps_per_sec);
    println!("Final population: {}", world.population());
    println!("Max generation: {}", world.stats.generation_max);
    println!("Lineages: {}", world.stats.lineage_count);
    if let Some(record) = world.records.all_time {
        println!(
            "Most children: organism {} (lineage {}) with {}",
            record.id, record.ancestor_id, record.children
        );
    }

    if let Some(path) = stats_out {
        world.stats_history.save(&path)?;
        println!("Stats history: {:?}", path);
    }

    Ok(())
}

fn run_benchmark(steps: u64, population: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== ARBOR Benchmark ===");
    println!("Steps: {}", steps);
    println!("Population: {}", population);
    println!();

    let result = benchmark(steps, population)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
