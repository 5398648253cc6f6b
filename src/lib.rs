//! # ARBOR
//!
//! Artificial-life simulator where organisms are steered by evolvable
//! decision trees.
//!
//! ## Features
//!
//! - **Parallel**: decisions are computed on all CPU cores via Rayon
//! - **Evolvable**: every organism keeps a library of trees it mutates and
//!   ranks by the health they earned
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: seeded random number generation, per organism
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arbor::{Config, World};
//!
//! let mut world = World::new(Config::default()).expect("default config is valid");
//!
//! world.run(1000);
//!
//! println!("Population: {}", world.population());
//! println!("{}", world.stats.summary());
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use arbor::Config;
//!
//! let mut config = Config::default();
//! config.world.initial_population = 200;
//! config.trees.max_size = 15;
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod genome;
pub mod grid;
pub mod organism;
pub mod point;
pub mod stats;
pub mod tree;
pub mod world;

// Re-export main types
pub use config::{Config, ConfigError};
pub use organism::{Organism, OrganismId};
pub use point::{Direction, Point};
pub use tree::{ActionKind, ConditionKind, Tree, TreeLibrary};
pub use world::{ActionOutcome, World};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark on the default world
pub fn benchmark(steps: u64, population: usize) -> Result<BenchmarkResult, ConfigError> {
    use std::time::Instant;

    let mut config = Config::default();
    config.world.initial_population = population;
    config.world.max_population = config.world.max_population.max(population);

    let mut world = World::new(config)?;

    let start = Instant::now();
    world.run(steps);
    let elapsed = start.elapsed();

    Ok(BenchmarkResult {
        steps,
        initial_population: population,
        final_population: world.population(),
        elapsed_secs: elapsed.as_secs_f64(),
        steps_per_second: steps as f64 / elapsed.as_secs_f64(),
        max_generation: world.stats.generation_max,
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub steps: u64,
    pub initial_population: usize,
    pub final_population: usize,
    pub elapsed_secs: f64,
    pub steps_per_second: f64,
    pub max_generation: u32,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Steps: {}", self.steps)?;
        writeln!(f, "Population: {} -> {}", self.initial_population, self.final_population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} steps/s", self.steps_per_second)?;
        writeln!(f, "Max generation: {}", self.max_generation)?;
        Ok(())
    }
}
