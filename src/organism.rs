//! Organism structure and behavior.

use crate::config::Config;
use crate::genome::Traits;
use crate::grid::{Neighbor, Surroundings};
use crate::point::{Direction, Point};
use crate::tree::{ActionKind, ConditionKind, Mutation, Tree, TreeId, TreeLibrary};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Unique organism identifier
pub type OrganismId = u64;

/// An organism in the simulation
#[derive(Clone, Debug)]
pub struct Organism {
    // Identity
    pub id: OrganismId,
    /// Root of this organism's lineage; equals `id` for random spawns
    pub ancestor_id: OrganismId,
    pub generation: u32,

    // Physical state
    pub location: Point,
    pub facing: Direction,
    size: f32,
    health: f32,
    pub age: u64,

    // Heredity
    pub traits: Traits,
    library: TreeLibrary,
    active_tree: TreeId,

    // Statistics
    pub children: u32,
    pub last_action: Option<ActionKind>,

    // Internal state
    cycles_until_evaluation: u32,
    cycles_since_spawn: u32,
    health_at_last_update: f32,
    rng: ChaCha8Rng,
}

/// Facts about the acting organism needed to test conditions
#[derive(Clone, Copy, Debug)]
struct Perception {
    location: Point,
    facing: Direction,
    size: f32,
    health: f32,
    ancestor_id: OrganismId,
    ideal_ph: f32,
    ph_tolerance: f32,
}

impl Perception {
    fn holds<S, R>(&self, condition: ConditionKind, env: &S, rng: &mut R) -> bool
    where
        S: Surroundings + ?Sized,
        R: Rng + ?Sized,
    {
        let ahead = env.neighbor(self.location, self.facing);
        let left = env.neighbor(self.location, self.facing.turn_left());
        let right = env.neighbor(self.location, self.facing.turn_right());

        match condition {
            ConditionKind::FoodAhead => env.food_at(ahead).is_some(),
            ConditionKind::FoodLeft => env.food_at(left).is_some(),
            ConditionKind::FoodRight => env.food_at(right).is_some(),
            ConditionKind::OrganismAhead => env.organism_at(ahead).is_some(),
            ConditionKind::OrganismLeft => env.organism_at(left).is_some(),
            ConditionKind::OrganismRight => env.organism_at(right).is_some(),
            ConditionKind::BiggerOrganismAhead => env
                .organism_at(ahead)
                .map_or(false, |other| other.size > self.size),
            ConditionKind::RelatedOrganismAhead => env
                .organism_at(ahead)
                .map_or(false, |other| other.ancestor_id == self.ancestor_id),
            ConditionKind::CoinFlip => rng.gen_bool(0.5),
            ConditionKind::HealthAboveHalf => self.health > self.size * 0.5,
            ConditionKind::PhComfortable => {
                (env.ph_at(self.location) - self.ideal_ph).abs() <= self.ph_tolerance
            }
        }
    }
}

impl Organism {
    /// Create an organism running `tree`, with a body of `spawn_health`
    pub fn new(id: OrganismId, location: Point, traits: Traits, tree: Tree, config: &Config, seed: u64) -> Self {
        let mut library = TreeLibrary::new(config.trees.max_count);
        let active = library.register(tree).id().clone();
        Self::assemble(id, id, 0, location, traits, library, active, config, seed)
    }

    /// First-generation organism: random traits, a library seeded with every
    /// single-action tree and one of them active
    pub fn random<R: Rng + ?Sized>(id: OrganismId, location: Point, config: &Config, rng: &mut R) -> Self {
        let traits = Traits::random(&config.traits, rng);
        let library = TreeLibrary::seeded(config.trees.max_count);
        let active = Tree::random(rng).id().clone();
        let seed = rng.gen();
        let mut organism = Self::assemble(id, id, 0, location, traits, library, active, config, seed);
        organism.facing = Direction::random(rng);
        organism
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        id: OrganismId,
        ancestor_id: OrganismId,
        generation: u32,
        location: Point,
        traits: Traits,
        mut library: TreeLibrary,
        active_tree: TreeId,
        config: &Config,
        seed: u64,
    ) -> Self {
        assert!(
            library.set_active(&active_tree, true),
            "active tree {active_tree} missing from library of organism {id}"
        );
        let body = traits.spawn_health.min(traits.max_size);

        Self {
            id,
            ancestor_id,
            generation,
            location,
            facing: Direction::North,
            size: body,
            health: body,
            age: 0,
            traits,
            library,
            active_tree,
            children: 0,
            last_action: None,
            cycles_until_evaluation: config.trees.min_cycles_to_evaluate,
            cycles_since_spawn: 0,
            health_at_last_update: body,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }

    #[inline]
    pub fn health(&self) -> f32 {
        self.health
    }

    #[inline]
    pub fn library(&self) -> &TreeLibrary {
        &self.library
    }

    #[inline]
    pub fn active_tree_id(&self) -> &TreeId {
        &self.active_tree
    }

    pub fn active_tree(&self) -> Option<&Tree> {
        self.library.get(&self.active_tree)
    }

    #[inline]
    pub fn cycles_since_spawn(&self) -> u32 {
        self.cycles_since_spawn
    }

    #[inline]
    pub fn cycles_until_evaluation(&self) -> u32 {
        self.cycles_until_evaluation
    }

    /// Check if organism is alive
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// What neighbours see of this organism
    pub fn neighbor(&self) -> Neighbor {
        Neighbor {
            id: self.id,
            size: self.size,
            health: self.health,
            ancestor_id: self.ancestor_id,
        }
    }

    /// Overwrite the body state. Panics unless `0 <= health <= size <= max_size`.
    pub fn set_body(&mut self, size: f32, health: f32) {
        assert!(
            (0.0..=size).contains(&health) && size <= self.traits.max_size,
            "body of organism {} out of range: health {health}, size {size}, max {}",
            self.id,
            self.traits.max_size
        );
        self.size = size;
        self.health = health;
        self.health_at_last_update = health;
    }

    /// Restart the spawn timer at `cycles`
    pub fn set_cycles_since_spawn(&mut self, cycles: u32) {
        self.cycles_since_spawn = cycles;
    }

    /// Add `delta` to health. Surplus above size grows the body by
    /// `growth_factor` of the surplus, up to `max_size`; health is then
    /// clamped to `[0, size]`. Damage is immediate, growth is slow.
    pub fn apply_health_change(&mut self, delta: f32, growth_factor: f32) {
        self.health += delta;
        if self.health > self.size {
            let growth = (self.health - self.size) * growth_factor;
            self.size = (self.size + growth).min(self.traits.max_size);
        }
        self.health = self.health.clamp(0.0, self.size);
    }

    /// Room left before the body is at its maximum
    #[inline]
    pub fn food_capacity(&self) -> f32 {
        (self.traits.max_size - self.health).max(0.0)
    }

    /// Per-cycle bookkeeping before deciding.
    ///
    /// Ages the organism, applies passive decay and the ph effect, feeds the
    /// health change since the last update into the active tree, and swaps
    /// or mutates the active tree when its evaluation window ends or health
    /// runs low. The library is pruned once.
    pub fn update_stats<S>(&mut self, env: &S, config: &Config)
    where
        S: Surroundings + ?Sized,
    {
        let growth = config.organisms.growth_factor;
        self.age += 1;
        self.cycles_since_spawn = self.cycles_since_spawn.saturating_add(1);

        self.apply_health_change(-self.size * config.organisms.decay_per_size, growth);

        let ph = env.ph_at(self.location);
        let closeness = 1.0 - (ph - self.traits.ideal_ph).abs() / self.traits.ph_tolerance;
        self.apply_health_change(self.traits.ph_growth_effect * closeness.clamp(-1.0, 1.0), growth);

        if !self.is_alive() {
            return;
        }

        let delta = self.health - self.health_at_last_update;
        self.health_at_last_update = self.health;
        match self.library.get_mut(&self.active_tree) {
            Some(tree) => tree.record_health_delta(delta),
            None => panic!("active tree {} missing from library of organism {}", self.active_tree, self.id),
        }

        self.cycles_until_evaluation = self.cycles_until_evaluation.saturating_sub(1);
        let emergency = self.health < self.size * config.organisms.emergency_fraction;
        if self.cycles_until_evaluation == 0 || emergency {
            self.reevaluate_tree(config);
            self.cycles_until_evaluation = config.trees.min_cycles_to_evaluate;
        }

        if let Some(removed) = self.library.prune() {
            log::trace!("organism {} pruned tree {}", self.id, removed);
        }
    }

    /// Adopt the library's best tree, or with the mutation chance register
    /// and adopt a mutant of it
    fn reevaluate_tree(&mut self, config: &Config) {
        let Some(best) = self.library.best() else {
            panic!("empty tree library for organism {}", self.id);
        };

        let next = if self.rng.gen::<f32>() < self.traits.chance_to_mutate_decision_tree {
            let mutation = Mutation::random(best, config.trees.max_size, &mut self.rng);
            let mutant = best.mutated(&mutation);
            self.library.register(mutant).id().clone()
        } else {
            best.id().clone()
        };

        self.activate(next);
    }

    fn activate(&mut self, id: TreeId) {
        if id != self.active_tree {
            self.library.set_active(&self.active_tree, false);
        }
        assert!(
            self.library.set_active(&id, true),
            "tree {id} missing from library of organism {}",
            self.id
        );
        self.active_tree = id;
    }

    /// Walk the active tree against the surroundings and return the chosen
    /// action. Usage marks from the previous walk are cleared first.
    pub fn choose_action<S>(&mut self, env: &S) -> ActionKind
    where
        S: Surroundings + ?Sized,
    {
        self.library.clear_usage();

        let perception = Perception {
            location: self.location,
            facing: self.facing,
            size: self.size,
            health: self.health,
            ancestor_id: self.ancestor_id,
            ideal_ph: self.traits.ideal_ph,
            ph_tolerance: self.traits.ph_tolerance,
        };
        let rng = &mut self.rng;
        let Some(tree) = self.library.get_mut(&self.active_tree) else {
            panic!("active tree {} missing from library of organism {}", self.active_tree, self.id);
        };

        let action = tree.evaluate(|condition| perception.holds(condition, env, &mut *rng));
        self.last_action = Some(action);
        action
    }

    /// Check if organism can spawn this cycle
    #[inline]
    pub fn can_spawn(&self, population: usize, max_population: usize) -> bool {
        population < max_population
            && self.health >= self.traits.min_health_to_spawn
            && self.cycles_since_spawn >= self.traits.min_cycles_between_spawns
    }

    /// Create offspring at `location`.
    ///
    /// The parent pays its `spawn_health`, which becomes the child's body;
    /// the child inherits mutated traits and a copy of the tree library with
    /// the parent's active tree. Eligibility is the caller's concern.
    pub fn spawn(&mut self, child_id: OrganismId, location: Point, config: &Config) -> Organism {
        let spawn_health = self.traits.spawn_health;
        self.apply_health_change(-spawn_health, config.organisms.growth_factor);
        self.cycles_since_spawn = 0;
        self.children += 1;

        let traits = self.traits.inherit(&config.traits, &mut self.rng);
        let seed = self.rng.gen();
        let mut child = Self::assemble(
            child_id,
            self.ancestor_id,
            self.generation + 1,
            location,
            traits,
            self.library.snapshot(),
            self.active_tree.clone(),
            config,
            seed,
        );

        let body = spawn_health.min(child.traits.max_size);
        child.set_body(body, body);
        child.facing = Direction::random(&mut self.rng);
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{FoodStore, OccupancyGrid, PhMap};
    use std::collections::HashMap;

    /// Minimal surroundings backed by the real collaborators
    struct TestEnv {
        grid: OccupancyGrid,
        food: FoodStore,
        ph: PhMap,
        neighbors: HashMap<OrganismId, Neighbor>,
    }

    impl TestEnv {
        fn new() -> Self {
            Self {
                grid: OccupancyGrid::new(10, 10),
                food: FoodStore::new(10, 10, 50.0),
                ph: PhMap::uniform(10, 10, 7.0),
                neighbors: HashMap::new(),
            }
        }

        fn place(&mut self, neighbor: Neighbor, at: Point) {
            self.grid.occupy(at, neighbor.id);
            self.neighbors.insert(neighbor.id, neighbor);
        }
    }

    impl Surroundings for TestEnv {
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

    fn test_config() -> Config {
        let mut config = Config::default();
        config.organisms.decay_per_size = 0.0;
        config
    }

    fn test_traits() -> Traits {
        let mut traits = Traits::random(&Config::default().traits, &mut ChaCha8Rng::seed_from_u64(0));
        traits.max_size = 50.0;
        traits.spawn_health = 10.0;
        traits.min_health_to_spawn = 20.0;
        traits.min_cycles_between_spawns = 5;
        traits.chance_to_mutate_decision_tree = 0.0;
        traits.ideal_ph = 7.0;
        traits.ph_tolerance = 1.0;
        traits.ph_growth_effect = 0.0;
        traits
    }

    fn organism_with(tree: Tree) -> Organism {
        Organism::new(1, Point::new(5, 5), test_traits(), tree, &test_config(), 7)
    }

    #[test]
    fn test_organism_creation() {
        let org = organism_with(Tree::from_action(ActionKind::Eat));
        assert_eq!(org.id, 1);
        assert_eq!(org.ancestor_id, 1);
        assert_eq!(org.health(), 10.0);
        assert_eq!(org.size(), 10.0);
        assert!(org.is_alive());
        assert!(org.active_tree().unwrap().is_active());
    }

    #[test]
    fn test_random_organism_valid() {
        let config = Config::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for id in 0..50 {
            let org = Organism::random(id, Point::new(0, 0), &config, &mut rng);
            assert_eq!(org.library().len(), ActionKind::COUNT);
            assert_eq!(org.active_tree().unwrap().size(), 1);
            assert!(org.health() <= org.size());
            assert!(org.size() <= org.traits.max_size);
        }
    }

    #[test]
    fn test_health_growth_is_damped() {
        let mut org = organism_with(Tree::from_action(ActionKind::Idle));
        org.apply_health_change(10.0, 0.1);
        // surplus 10 grows size by 1
        assert!((org.size() - 11.0).abs() < 1e-5);
        assert!((org.health() - 11.0).abs() < 1e-5);

        org.apply_health_change(-4.0, 0.1);
        assert!((org.health() - 7.0).abs() < 1e-5);
        assert!((org.size() - 11.0).abs() < 1e-5);
    }

    #[test]
    fn test_health_size_clamp_holds() {
        let mut org = organism_with(Tree::from_action(ActionKind::Idle));
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..5000 {
            let delta = rng.gen_range(-30.0..60.0);
            org.apply_health_change(delta, 0.5);
            assert!(org.health() >= 0.0);
            assert!(org.health() <= org.size());
            assert!(org.size() <= org.traits.max_size);
        }
    }

    #[test]
    fn test_death_is_clamped_to_zero() {
        let mut org = organism_with(Tree::from_action(ActionKind::Idle));
        org.apply_health_change(-100.0, 0.1);
        assert_eq!(org.health(), 0.0);
        assert!(!org.is_alive());
    }

    #[test]
    fn test_spawn_eligibility_boundary() {
        let mut org = organism_with(Tree::from_action(ActionKind::Spawn));
        org.set_body(40.0, 20.0);
        org.set_cycles_since_spawn(5);
        assert!(org.can_spawn(10, 100));

        org.apply_health_change(-1.0, 0.1);
        assert!(!org.can_spawn(10, 100));

        org.set_body(40.0, 20.0);
        org.set_cycles_since_spawn(4);
        assert!(!org.can_spawn(10, 100));

        org.set_cycles_since_spawn(5);
        assert!(!org.can_spawn(100, 100));
    }

    #[test]
    fn test_spawn_costs_parent() {
        let config = test_config();
        let mut parent = organism_with(Tree::from_action(ActionKind::Spawn));
        parent.set_body(40.0, 30.0);
        parent.set_cycles_since_spawn(9);

        let child = parent.spawn(2, Point::new(5, 6), &config);

        assert!((parent.health() - 20.0).abs() < 1e-5);
        assert_eq!(parent.cycles_since_spawn(), 0);
        assert_eq!(parent.children, 1);

        assert_eq!(child.id, 2);
        assert_eq!(child.ancestor_id, parent.ancestor_id);
        assert_eq!(child.generation, 1);
        assert_eq!(child.location, Point::new(5, 6));
        assert!((child.health() - 10.0).abs() < 1e-5);
        assert_eq!(child.active_tree_id(), parent.active_tree_id());
        assert!(child.active_tree().unwrap().is_active());
        assert_eq!(child.library().len(), parent.library().len());
    }

    #[test]
    fn test_choose_action_reads_surroundings() {
        let tree = Tree::new(crate::tree::Node::condition(
            ConditionKind::FoodAhead,
            crate::tree::Node::action(ActionKind::Eat),
            crate::tree::Node::action(ActionKind::TurnLeft),
        ));
        let mut org = organism_with(tree);
        org.facing = Direction::East;
        let mut env = TestEnv::new();

        assert_eq!(org.choose_action(&env), ActionKind::TurnLeft);
        env.food.add_food(Point::new(6, 5), 5.0);
        assert_eq!(org.choose_action(&env), ActionKind::Eat);
        assert_eq!(org.last_action, Some(ActionKind::Eat));
        assert!(org.active_tree().unwrap().used_last_cycle());
    }

    #[test]
    fn test_relatedness_and_size_conditions() {
        let tree = Tree::new(crate::tree::Node::condition(
            ConditionKind::RelatedOrganismAhead,
            crate::tree::Node::action(ActionKind::Feed),
            crate::tree::Node::condition(
                ConditionKind::BiggerOrganismAhead,
                crate::tree::Node::action(ActionKind::TurnRight),
                crate::tree::Node::action(ActionKind::Attack),
            ),
        ));
        let mut org = organism_with(tree);
        org.facing = Direction::North;
        let ahead = Point::new(5, 4);

        let mut env = TestEnv::new();
        env.place(Neighbor { id: 9, size: 5.0, health: 5.0, ancestor_id: 9 }, ahead);
        assert_eq!(org.choose_action(&env), ActionKind::Attack);

        let mut env = TestEnv::new();
        env.place(Neighbor { id: 9, size: 30.0, health: 5.0, ancestor_id: 9 }, ahead);
        assert_eq!(org.choose_action(&env), ActionKind::TurnRight);

        let mut env = TestEnv::new();
        env.place(Neighbor { id: 9, size: 30.0, health: 5.0, ancestor_id: 1 }, ahead);
        assert_eq!(org.choose_action(&env), ActionKind::Feed);
    }

    #[test]
    fn test_update_stats_records_fitness() {
        let config = test_config();
        let env = TestEnv::new();
        let mut org = organism_with(Tree::from_action(ActionKind::Eat));
        org.set_body(40.0, 20.0);

        org.apply_health_change(5.0, config.organisms.growth_factor);
        org.update_stats(&env, &config);

        let tree = org.active_tree().unwrap();
        assert_eq!(tree.usage_count(), 1);
        assert!(tree.avg_health_delta() > 4.9);
        assert_eq!(org.age, 1);
        assert_eq!(org.cycles_since_spawn(), 1);
    }

    #[test]
    fn test_evaluation_window_switches_to_best() {
        let mut config = test_config();
        config.trees.min_cycles_to_evaluate = 3;
        let env = TestEnv::new();

        let mut org = organism_with(Tree::from_action(ActionKind::Idle));
        org.set_body(40.0, 30.0);
        let better = org.library.register(Tree::from_action(ActionKind::Eat)).id().clone();
        org.library.get_mut(&better).unwrap().record_health_delta(1.0);

        // Idle loses health every cycle under this tree
        for _ in 0..3 {
            org.apply_health_change(-1.0, 0.1);
            org.update_stats(&env, &config);
        }

        assert_eq!(org.active_tree_id(), &better);
        assert_eq!(org.cycles_until_evaluation(), 3);
        assert!(org.active_tree().unwrap().is_active());
        let idle = Tree::from_action(ActionKind::Idle).id().clone();
        assert!(!org.library().get(&idle).unwrap().is_active());
    }

    #[test]
    fn test_emergency_forces_mutation() {
        let mut config = test_config();
        config.trees.min_cycles_to_evaluate = 1000;
        config.organisms.emergency_fraction = 0.5;
        let env = TestEnv::new();

        let mut org = organism_with(Tree::from_action(ActionKind::Idle));
        org.traits.chance_to_mutate_decision_tree = 1.0;
        org.set_body(40.0, 10.0);
        org.update_stats(&env, &config);

        assert_eq!(org.library().len(), 2);
        assert_ne!(org.active_tree_id().as_str(), "00");
        assert_eq!(org.cycles_until_evaluation(), 1000);
    }

    #[test]
    fn test_ph_effect() {
        let config = test_config();
        let mut env = TestEnv::new();
        let mut org = organism_with(Tree::from_action(ActionKind::Idle));
        org.traits.ph_growth_effect = 1.0;
        org.set_body(40.0, 20.0);

        org.update_stats(&env, &config);
        assert!((org.health() - 21.0).abs() < 0.2);

        env.ph = PhMap::uniform(10, 10, 12.0);
        org.update_stats(&env, &config);
        assert!((org.health() - 20.0).abs() < 0.2);
    }
}
