//! World simulation engine - main simulation loop.

use crate::config::{Config, ConfigError};
use crate::grid::{CellObserver, FoodStore, Neighbor, OccupancyGrid, PhMap, Surroundings};
use crate::organism::{Organism, OrganismId};
use crate::point::{Direction, Point};
use crate::stats::{LineageTracker, ReproductionRecords, Stats, StatsHistory};
use crate::tree::ActionKind;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// What resolving one organism's action did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionOutcome {
    Idle,
    Turned(Direction),
    Moved(Point),
    /// Facing cell was occupied
    Blocked,
    Ate(f32),
    NoFood,
    Attacked { target: OrganismId, damage: f32 },
    Fed { target: OrganismId, amount: f32 },
    /// Nobody in the facing cell
    NoTarget,
    Spawned(OrganismId),
    /// Spawn requested while not eligible
    NotReady,
    /// Spawn found no empty neighbouring cell
    NoRoom,
    /// The action's base cost killed the actor
    Starved,
    /// Actor was removed earlier in the cycle
    Absent,
}

/// Read-only picture of the world used while deciding
struct WorldView<'a> {
    grid: &'a OccupancyGrid,
    food: &'a FoodStore,
    ph: &'a PhMap,
    neighbors: &'a HashMap<OrganismId, Neighbor>,
}

impl Surroundings for WorldView<'_> {
    fn food_at(&self, point: Point) -> Option<f32> {
        self.food.food_at(point)
    }

    fn organism_at(&self, point: Point) -> Option<Neighbor> {
        self.grid
            .organism_at(point)
            .and_then(|id| self.neighbors.get(&id).copied())
    }

    fn ph_at(&self, point: Point) -> f32 {
        self.ph.ph_at(point)
    }

    fn neighbor(&self, point: Point, direction: Direction) -> Point {
        self.grid.neighbor(point, direction)
    }
}

/// The simulation world
pub struct World {
    // Population, iterated in ascending id order
    organisms: BTreeMap<OrganismId, Organism>,

    // Environment
    pub grid: OccupancyGrid,
    pub food: FoodStore,
    pub ph: PhMap,

    // State
    pub time: u64,

    // Configuration
    pub config: Config,

    // Statistics
    pub stats: Stats,
    pub stats_history: StatsHistory,
    pub lineage_tracker: LineageTracker,
    pub records: ReproductionRecords,

    // ID generation
    next_organism_id: OrganismId,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,

    // Change notification
    observer: Option<Box<dyn CellObserver + Send>>,
    changed_cells: Vec<Point>,

    births_this_step: usize,
    deaths_this_step: usize,
    was_extinct: bool,
}

impl World {
    /// Create a new world with the given configuration
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// Create a new world with a specific seed for reproducibility
    pub fn new_with_seed(config: Config, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (width, height) = (config.world.width, config.world.height);

        let mut food = FoodStore::new(width, height, config.food.max_per_cell);
        food.initialize(config.food.initial_density, config.food.initial_amount, &mut rng);

        let ph = PhMap::new(width, height, config.world.ph_min, config.world.ph_max, &mut rng);

        let mut world = Self {
            organisms: BTreeMap::new(),
            grid: OccupancyGrid::new(width, height),
            food,
            ph,
            time: 0,
            stats: Stats::new(),
            stats_history: StatsHistory::new(config.logging.stats_interval),
            lineage_tracker: LineageTracker::new(),
            records: ReproductionRecords::new(),
            next_organism_id: 0,
            rng,
            seed,
            observer: None,
            changed_cells: Vec::new(),
            births_this_step: 0,
            deaths_this_step: 0,
            was_extinct: false,
            config,
        };

        for _ in 0..world.config.world.initial_population {
            world.spawn_random_organism();
        }
        world.changed_cells.clear();
        world.births_this_step = 0;
        world.update_stats();

        log::info!(
            "World created: {}x{}, {} organisms, seed {}",
            world.grid.width(),
            world.grid.height(),
            world.population(),
            seed
        );

        Ok(world)
    }

    /// Install the sink told about every changed cell after each step
    pub fn set_observer<O>(&mut self, observer: O)
    where
        O: CellObserver + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    /// Main simulation step
    pub fn step(&mut self) {
        self.births_this_step = 0;
        self.deaths_this_step = 0;

        // Phase 1: Parallel bookkeeping and decisions
        let decisions = self.decide();

        // Phase 2: Resolve in id order (sequential to avoid conflicts)
        for (id, action) in decisions {
            match action {
                Some(action) => {
                    self.resolve_action(id, action);
                }
                None => self.reap(id),
            }
        }

        // Phase 3: Environment
        self.control_population();
        self.spawn_food();

        self.time += 1;

        // Phase 4: Statistics and notifications
        self.update_stats();
        self.flush_changes();
    }

    /// Update every organism and let the living ones choose an action.
    ///
    /// Organisms only see the start-of-cycle neighbour snapshot. `None`
    /// marks an organism that died during its own update.
    fn decide(&mut self) -> Vec<(OrganismId, Option<ActionKind>)> {
        let neighbors: HashMap<OrganismId, Neighbor> = self
            .organisms
            .values()
            .map(|org| (org.id, org.neighbor()))
            .collect();
        let view = WorldView {
            grid: &self.grid,
            food: &self.food,
            ph: &self.ph,
            neighbors: &neighbors,
        };
        let config = &self.config;

        let mut decisions: Vec<(OrganismId, Option<ActionKind>)> = self
            .organisms
            .par_iter_mut()
            .map(|(&id, org)| {
                org.update_stats(&view, config);
                let action = if org.is_alive() {
                    Some(org.choose_action(&view))
                } else {
                    None
                };
                (id, action)
            })
            .collect();

        decisions.sort_unstable_by_key(|&(id, _)| id);
        decisions
    }

    /// Apply one organism's action: base cost first, then the effect.
    ///
    /// Grid writes happen immediately, so an earlier organism in the pass
    /// wins any contested cell. Anyone left without health is removed.
    pub fn resolve_action(&mut self, id: OrganismId, action: ActionKind) -> ActionOutcome {
        let growth = self.config.organisms.growth_factor;
        let cost = self.config.activity.cost(action);

        let Some(actor) = self.organisms.get_mut(&id) else {
            return ActionOutcome::Absent;
        };
        actor.apply_health_change(-cost, growth);
        if !actor.is_alive() {
            self.reap(id);
            return ActionOutcome::Starved;
        }

        let location = actor.location;
        let facing = actor.facing;
        let ahead = self.grid.neighbor(location, facing);

        let outcome = match action {
            ActionKind::Idle => ActionOutcome::Idle,
            ActionKind::TurnLeft | ActionKind::TurnRight => {
                actor.facing = if action == ActionKind::TurnLeft {
                    facing.turn_left()
                } else {
                    facing.turn_right()
                };
                ActionOutcome::Turned(actor.facing)
            }
            ActionKind::MoveForward => {
                if self.grid.occupy(ahead, id) {
                    self.grid.vacate(location);
                    actor.location = ahead;
                    self.changed_cells.push(location);
                    self.changed_cells.push(ahead);
                    ActionOutcome::Moved(ahead)
                } else {
                    ActionOutcome::Blocked
                }
            }
            ActionKind::Eat => {
                let eaten = self.food.remove_food(ahead, actor.food_capacity());
                if eaten > 0.0 {
                    actor.apply_health_change(eaten, growth);
                    self.changed_cells.push(ahead);
                    ActionOutcome::Ate(eaten)
                } else {
                    ActionOutcome::NoFood
                }
            }
            ActionKind::Attack => {
                let damage = actor.size() * self.config.organisms.attack_damage_per_size;
                self.attack(id, ahead, damage)
            }
            ActionKind::Feed => {
                let amount = self.config.organisms.feed_amount;
                self.feed(id, ahead, amount)
            }
            ActionKind::Spawn => self.spawn_child(id),
        };

        if self.organisms.get(&id).map_or(false, |org| !org.is_alive()) {
            self.reap(id);
        }
        outcome
    }

    /// Another living organism in the cell ahead.
    ///
    /// Organisms that died in their own update stay on the grid until their
    /// slot in the resolve pass, so they are skipped here.
    fn living_target(&self, id: OrganismId, ahead: Point) -> Option<OrganismId> {
        self.grid
            .organism_at(ahead)
            .filter(|&target| target != id)
            .filter(|target| self.organisms.get(target).map_or(false, |org| org.is_alive()))
    }

    fn attack(&mut self, id: OrganismId, ahead: Point, damage: f32) -> ActionOutcome {
        let Some(target_id) = self.living_target(id, ahead) else {
            return ActionOutcome::NoTarget;
        };
        let Some(target) = self.organisms.get_mut(&target_id) else {
            return ActionOutcome::NoTarget;
        };

        target.apply_health_change(-damage, self.config.organisms.growth_factor);
        if !target.is_alive() {
            log::debug!("Organism {} killed {} at t={}", id, target_id, self.time);
            self.reap(target_id);
        }
        ActionOutcome::Attacked { target: target_id, damage }
    }

    fn feed(&mut self, id: OrganismId, ahead: Point, amount: f32) -> ActionOutcome {
        let growth = self.config.organisms.growth_factor;
        let Some(target_id) = self.living_target(id, ahead) else {
            return ActionOutcome::NoTarget;
        };

        let Some(actor) = self.organisms.get_mut(&id) else {
            return ActionOutcome::Absent;
        };
        let amount = amount.min(actor.health()).max(0.0);
        actor.apply_health_change(-amount, growth);

        if let Some(target) = self.organisms.get_mut(&target_id) {
            target.apply_health_change(amount, growth);
        }
        ActionOutcome::Fed { target: target_id, amount }
    }

    fn spawn_child(&mut self, id: OrganismId) -> ActionOutcome {
        let population = self.organisms.len();
        let max_population = self.config.world.max_population;
        let Some(parent) = self.organisms.get(&id) else {
            return ActionOutcome::Absent;
        };
        if !parent.can_spawn(population, max_population) {
            return ActionOutcome::NotReady;
        }

        let location = parent.location;
        let start = Direction::random(&mut self.rng);
        let Some(cell) = start
            .clockwise_from()
            .into_iter()
            .map(|direction| self.grid.neighbor(location, direction))
            .find(|&cell| self.grid.is_empty(cell))
        else {
            return ActionOutcome::NoRoom;
        };

        let child_id = self.next_id();
        let Some(parent) = self.organisms.get_mut(&id) else {
            return ActionOutcome::Absent;
        };
        let child = parent.spawn(child_id, cell, &self.config);
        self.records.record_birth(parent);
        log::debug!(
            "Organism {} spawned {} (generation {}) at t={}",
            id,
            child_id,
            child.generation,
            self.time
        );

        self.place(child);
        ActionOutcome::Spawned(child_id)
    }

    /// Remove an organism and leave its body behind as food
    fn reap(&mut self, id: OrganismId) {
        let Some(org) = self.organisms.remove(&id) else {
            return;
        };
        if self.grid.organism_at(org.location) == Some(id) {
            self.grid.vacate(org.location);
        }
        self.food.add_food(org.location, org.size());
        self.changed_cells.push(org.location);
        self.deaths_this_step += 1;

        log::debug!(
            "Organism {} died at t={} (age {}, size {:.1}, children {})",
            id,
            self.time,
            org.age,
            org.size(),
            org.children
        );
    }

    /// Put a new organism into the world and account for it
    fn place(&mut self, org: Organism) {
        let claimed = self.grid.occupy(org.location, org.id);
        assert!(claimed, "cell {:?} already occupied", org.location);

        if org.ancestor_id != org.id {
            self.lineage_tracker.record_descendant(org.ancestor_id);
        } else {
            self.lineage_tracker.register_lineage(org.id, self.time);
        }
        self.changed_cells.push(org.location);
        self.births_this_step += 1;
        self.next_organism_id = self.next_organism_id.max(org.id + 1);
        self.organisms.insert(org.id, org);
    }

    /// Add a first-generation organism on a uniformly random empty cell
    fn spawn_random_organism(&mut self) -> Option<OrganismId> {
        let free = self.grid.width() * self.grid.height() - self.grid.occupied_count();
        if free == 0 {
            return None;
        }
        let index = self.rng.gen_range(0..free);
        let cell = self.grid.empty_cells().nth(index)?;

        let id = self.next_id();
        let org = Organism::random(id, cell, &self.config, &mut self.rng);
        self.place(org);
        Some(id)
    }

    /// Occasionally seed a random organism while below the population cap
    fn control_population(&mut self) {
        let population = self.organisms.len();
        if population >= self.config.world.max_population {
            return;
        }
        if !self.rng.gen_bool(self.config.organisms.spawn_chance) {
            return;
        }

        if let Some(id) = self.spawn_random_organism() {
            if population == 0 {
                log::info!("Reseeded empty world with organism {} at t={}", id, self.time);
            } else {
                log::debug!("Spawned random organism {} at t={}", id, self.time);
            }
        }
    }

    fn spawn_food(&mut self) {
        if !self.rng.gen_bool(self.config.food.spawn_chance) {
            return;
        }
        let cell = self.grid.random_cell(&mut self.rng);
        if self.food.add_food(cell, self.config.food.spawn_amount) > 0.0 {
            self.changed_cells.push(cell);
        }
    }

    /// Update statistics
    fn update_stats(&mut self) {
        self.records.observe(self.organisms.values());

        self.stats.time = self.time;
        self.stats.births = self.births_this_step;
        self.stats.deaths = self.deaths_this_step;
        self.stats.update(self.organisms.values(), self.food.total());
        self.stats.set_records(&self.records);

        if self.stats_history.is_due(self.time) {
            self.stats_history.record(self.stats.clone());
            self.lineage_tracker.update(self.organisms.values());
        }

        let extinct = self.organisms.is_empty();
        if extinct && !self.was_extinct && self.time > 0 {
            log::warn!("Population extinct at t={}", self.time);
        }
        self.was_extinct = extinct;
    }

    fn flush_changes(&mut self) {
        match self.observer.as_mut() {
            Some(observer) => {
                for cell in self.changed_cells.drain(..) {
                    observer.cell_changed(cell);
                }
            }
            None => self.changed_cells.clear(),
        }
    }

    /// Run simulation for specified number of steps
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Run simulation with callback for progress updates
    pub fn run_with_callback<F>(&mut self, steps: u64, mut callback: F)
    where
        F: FnMut(&World, u64),
    {
        for i in 0..steps {
            self.step();
            callback(self, i);
        }
    }

    /// Allocate a fresh organism id
    pub fn next_id(&mut self) -> OrganismId {
        let id = self.next_organism_id;
        self.next_organism_id += 1;
        id
    }

    /// Add a prepared organism. Returns false if its id is taken or its
    /// cell is occupied.
    pub fn insert_organism(&mut self, mut org: Organism) -> bool {
        if self.organisms.contains_key(&org.id) || !self.grid.is_empty(org.location) {
            return false;
        }
        org.location = self.grid.wrap(org.location);
        self.place(org);
        true
    }

    pub fn organism(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.get(&id)
    }

    /// Living organisms in ascending id order
    pub fn organisms(&self) -> impl Iterator<Item = &Organism> + '_ {
        self.organisms.values()
    }

    /// Get current population count
    pub fn population(&self) -> usize {
        self.organisms.len()
    }

    /// Check if population is extinct
    pub fn is_extinct(&self) -> bool {
        self.organisms.is_empty()
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }
}
