//! Configuration system for the ARBOR simulation.
//!
//! Supports YAML configuration files with sensible defaults. The core only
//! reads these values; a bad file is rejected at startup by [`Config::validate`].

use crate::tree::ActionKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration errors, all fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub world: WorldConfig,
    pub organisms: OrganismConfig,
    #[serde(default)]
    pub activity: ActivityCosts,
    pub trees: TreeConfig,
    pub food: FoodConfig,
    #[serde(default)]
    pub traits: TraitBounds,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// World/environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Grid width in cells
    pub width: usize,
    /// Grid height in cells
    pub height: usize,
    /// Random organisms placed at start
    pub initial_population: usize,
    /// Population ceiling for spawning of any kind
    pub max_population: usize,
    /// Lowest ph in the environment field
    pub ph_min: f32,
    /// Highest ph in the environment field
    pub ph_max: f32,
}

/// Organism physiology
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganismConfig {
    /// Per-cycle probability of spawning one random organism
    pub spawn_chance: f64,
    /// Fraction of surplus health converted into size
    pub growth_factor: f32,
    /// Passive health loss per unit of size per cycle
    pub decay_per_size: f32,
    /// Health below `emergency_fraction * size` forces tree re-evaluation
    pub emergency_fraction: f32,
    /// Damage dealt per unit of attacker size
    pub attack_damage_per_size: f32,
    /// Health handed over by one feed action
    pub feed_amount: f32,
}

/// Health cost of each action, applied before its effect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityCosts {
    pub idle: f32,
    pub turn: f32,
    pub move_forward: f32,
    pub eat: f32,
    pub attack: f32,
    pub feed: f32,
    pub spawn: f32,
}

/// Decision tree limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum node count of a single tree
    pub max_size: usize,
    /// Maximum number of trees kept in one library
    pub max_count: usize,
    /// Cycles a tree stays active before it is re-evaluated
    pub min_cycles_to_evaluate: u32,
}

/// Food store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodConfig {
    /// Maximum food per cell
    pub max_per_cell: f32,
    /// Fraction of cells holding food at start (0.0 - 1.0)
    pub initial_density: f64,
    /// Food placed in each seeded cell
    pub initial_amount: f32,
    /// Per-cycle probability of adding food at a random cell
    pub spawn_chance: f64,
    /// Food added per spawn
    pub spawn_amount: f32,
}

/// Range and mutation step of one numeric trait
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub min: f32,
    pub max: f32,
    /// Largest change a single inheritance may apply
    pub step: f32,
}

impl Bound {
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    fn check(&self, name: &str) -> Result<(), ConfigError> {
        if !(self.min.is_finite() && self.max.is_finite() && self.step.is_finite()) {
            return Err(ConfigError::Invalid(format!("traits.{name} must be finite")));
        }
        if self.min > self.max || self.step < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "traits.{name} needs min <= max and step >= 0"
            )));
        }
        Ok(())
    }
}

/// Bounds for colour mutation in hue/saturation/luminance space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorBounds {
    /// Largest hue shift in degrees
    pub hue_step: f32,
    pub saturation: Bound,
    pub luminance: Bound,
}

/// Global trait ranges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitBounds {
    pub max_size: Bound,
    pub spawn_health: Bound,
    pub min_health_to_spawn: Bound,
    pub min_cycles_between_spawns: Bound,
    pub chance_to_mutate_decision_tree: Bound,
    pub ideal_ph: Bound,
    pub ph_tolerance: Bound,
    pub ph_growth_effect: Bound,
    pub color: ColorBounds,
}

/// Logging and stats configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Steps between stats snapshots
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 120,
            height: 80,
            initial_population: 150,
            max_population: 1500,
            ph_min: 4.0,
            ph_max: 10.0,
        }
    }
}

impl Default for OrganismConfig {
    fn default() -> Self {
        Self {
            spawn_chance: 0.05,
            growth_factor: 0.1,
            decay_per_size: 0.01,
            emergency_fraction: 0.25,
            attack_damage_per_size: 0.5,
            feed_amount: 2.0,
        }
    }
}

impl Default for ActivityCosts {
    fn default() -> Self {
        Self {
            idle: 0.05,
            turn: 0.1,
            move_forward: 0.3,
            eat: 0.1,
            attack: 1.0,
            feed: 0.2,
            spawn: 0.5,
        }
    }
}

impl ActivityCosts {
    /// Health cost of one action
    pub fn cost(&self, action: ActionKind) -> f32 {
        match action {
            ActionKind::Idle => self.idle,
            ActionKind::TurnLeft | ActionKind::TurnRight => self.turn,
            ActionKind::MoveForward => self.move_forward,
            ActionKind::Eat => self.eat,
            ActionKind::Attack => self.attack,
            ActionKind::Feed => self.feed,
            ActionKind::Spawn => self.spawn,
        }
    }

    fn iter(&self) -> [(&'static str, f32); 7] {
        [
            ("idle", self.idle),
            ("turn", self.turn),
            ("move_forward", self.move_forward),
            ("eat", self.eat),
            ("attack", self.attack),
            ("feed", self.feed),
            ("spawn", self.spawn),
        ]
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_size: 31,
            max_count: 16,
            min_cycles_to_evaluate: 20,
        }
    }
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            max_per_cell: 50.0,
            initial_density: 0.2,
            initial_amount: 10.0,
            spawn_chance: 0.9,
            spawn_amount: 8.0,
        }
    }
}

impl Default for TraitBounds {
    fn default() -> Self {
        Self {
            max_size: Bound::new(10.0, 100.0, 2.0),
            spawn_health: Bound::new(2.0, 40.0, 1.0),
            min_health_to_spawn: Bound::new(4.0, 90.0, 2.0),
            min_cycles_between_spawns: Bound::new(5.0, 200.0, 3.0),
            chance_to_mutate_decision_tree: Bound::new(0.01, 0.9, 0.05),
            ideal_ph: Bound::new(4.0, 10.0, 0.2),
            ph_tolerance: Bound::new(0.1, 3.0, 0.1),
            ph_growth_effect: Bound::new(0.0, 0.2, 0.01),
            color: ColorBounds {
                hue_step: 12.0,
                saturation: Bound::new(0.3, 1.0, 0.05),
                luminance: Bound::new(0.25, 0.75, 0.05),
            },
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 50,
            log_level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Parsed `log_level`; also accepts `off`
    pub fn level_filter(&self) -> Result<log::LevelFilter, ConfigError> {
        self.log_level.trim().parse().map_err(|_| {
            ConfigError::Invalid(format!(
                "logging.log_level `{}` must be one of off, error, warn, info, debug, trace",
                self.log_level
            ))
        })
    }
}

#[inline]
fn non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        let world = &self.world;
        if world.width == 0 || world.height == 0 {
            return invalid("world width and height must be > 0");
        }
        if world.width > i32::MAX as usize || world.height > i32::MAX as usize {
            return invalid("world dimensions must fit in i32");
        }
        if world.max_population == 0 {
            return invalid("max_population must be > 0");
        }
        if world.initial_population > world.max_population {
            return invalid("initial_population cannot exceed max_population");
        }
        if world.initial_population > world.width * world.height {
            return invalid("initial_population cannot exceed the number of cells");
        }
        if !(world.ph_min.is_finite() && world.ph_max.is_finite() && world.ph_min <= world.ph_max) {
            return invalid("ph_min and ph_max must be finite with ph_min <= ph_max");
        }

        let org = &self.organisms;
        if !(0.0..=1.0).contains(&org.spawn_chance) {
            return invalid("organisms.spawn_chance must be in [0, 1]");
        }
        if !(org.growth_factor > 0.0 && org.growth_factor <= 1.0) {
            return invalid("organisms.growth_factor must be in (0, 1]");
        }
        if !(0.0..=1.0).contains(&org.emergency_fraction) {
            return invalid("organisms.emergency_fraction must be in [0, 1]");
        }
        for (name, rate) in [
            ("decay_per_size", org.decay_per_size),
            ("attack_damage_per_size", org.attack_damage_per_size),
            ("feed_amount", org.feed_amount),
        ] {
            if !non_negative(rate) {
                return Err(ConfigError::Invalid(format!(
                    "organisms.{name} must be a finite value >= 0"
                )));
            }
        }

        for (name, cost) in self.activity.iter() {
            if !non_negative(cost) {
                return Err(ConfigError::Invalid(format!(
                    "activity.{name} must be a finite cost >= 0"
                )));
            }
        }

        let trees = &self.trees;
        if trees.max_size == 0 {
            return invalid("trees.max_size must be > 0");
        }
        if trees.max_count == 0 {
            return invalid("trees.max_count must be > 0");
        }
        if trees.min_cycles_to_evaluate == 0 {
            return invalid("trees.min_cycles_to_evaluate must be > 0");
        }

        let food = &self.food;
        if !(food.max_per_cell.is_finite() && food.max_per_cell > 0.0) {
            return invalid("food.max_per_cell must be finite and > 0");
        }
        if !(0.0..=1.0).contains(&food.initial_density) || !(0.0..=1.0).contains(&food.spawn_chance) {
            return invalid("food probabilities must be in [0, 1]");
        }
        if !(non_negative(food.initial_amount) && non_negative(food.spawn_amount)) {
            return invalid("food amounts must be finite and >= 0");
        }

        let traits = &self.traits;
        traits.max_size.check("max_size")?;
        traits.spawn_health.check("spawn_health")?;
        traits.min_health_to_spawn.check("min_health_to_spawn")?;
        traits.min_cycles_between_spawns.check("min_cycles_between_spawns")?;
        traits.chance_to_mutate_decision_tree.check("chance_to_mutate_decision_tree")?;
        traits.ideal_ph.check("ideal_ph")?;
        traits.ph_tolerance.check("ph_tolerance")?;
        traits.ph_growth_effect.check("ph_growth_effect")?;
        if !non_negative(traits.color.hue_step) {
            return invalid("traits.color.hue_step must be finite and >= 0");
        }
        traits.color.saturation.check("color.saturation")?;
        traits.color.luminance.check("color.luminance")?;
        if traits.max_size.min <= 0.0 {
            return invalid("traits.max_size.min must be > 0");
        }
        if traits.spawn_health.min <= 0.0 {
            return invalid("traits.spawn_health.min must be > 0");
        }
        if traits.spawn_health.min > traits.min_health_to_spawn.min
            || traits.min_health_to_spawn.min > traits.max_size.min
        {
            return invalid("trait ranges cannot satisfy spawn_health <= min_health_to_spawn <= max_size");
        }
        if traits.min_cycles_between_spawns.min < 0.0 {
            return invalid("traits.min_cycles_between_spawns.min must be >= 0");
        }
        if traits.chance_to_mutate_decision_tree.min < 0.0
            || traits.chance_to_mutate_decision_tree.max > 1.0
        {
            return invalid("traits.chance_to_mutate_decision_tree must stay in [0, 1]");
        }
        if traits.ph_tolerance.min <= 0.0 {
            return invalid("traits.ph_tolerance.min must be > 0");
        }

        if self.logging.stats_interval == 0 {
            return invalid("logging.stats_interval must be > 0");
        }
        self.logging.level_filter()?;
        Ok(())
    }
}
