//! Statistics tracking for the simulation.

use crate::organism::{Organism, OrganismId};
use crate::point::Point;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// An organism and how many children it has had
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHolder {
    pub id: OrganismId,
    pub ancestor_id: OrganismId,
    pub children: u32,
    /// Where it stood when the record was taken
    pub location: Point,
}

impl RecordHolder {
    fn of(organism: &Organism) -> Self {
        Self {
            id: organism.id,
            ancestor_id: organism.ancestor_id,
            children: organism.children,
            location: organism.location,
        }
    }
}

/// Most reproductive organisms, living and all-time
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReproductionRecords {
    /// Living organism with the most children; lowest id wins a tie
    pub current: Option<RecordHolder>,
    /// Most children any organism has had, dead or alive
    pub all_time: Option<RecordHolder>,
}

impl ReproductionRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh from the living population, given in ascending id order
    pub fn observe<'a, I>(&mut self, organisms: I)
    where
        I: IntoIterator<Item = &'a Organism>,
    {
        self.current = organisms
            .into_iter()
            .filter(|o| o.is_alive() && o.children > 0)
            .fold(None, |best: Option<RecordHolder>, org| match best {
                Some(current) if current.children >= org.children => Some(current),
                _ => Some(RecordHolder::of(org)),
            });

        if let Some(current) = self.current {
            let beaten = self.all_time.map_or(true, |record| current.children > record.children);
            if beaten {
                self.all_time = Some(current);
            }
        }
    }

    /// Count a birth against the all-time record as it happens.
    ///
    /// A parent may die later in the same cycle, before `observe` runs.
    pub fn record_birth(&mut self, parent: &Organism) {
        if self.all_time.map_or(true, |record| parent.children > record.children) {
            self.all_time = Some(RecordHolder::of(parent));
        }
    }
}

/// Statistics snapshot for a simulation step
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Current simulation time
    pub time: u64,
    /// Total population count
    pub population: usize,
    /// Births this step
    pub births: usize,
    /// Deaths this step
    pub deaths: usize,
    /// Maximum generation reached
    pub generation_max: u32,
    pub health_mean: f32,
    pub size_mean: f32,
    pub age_mean: f32,
    /// Mean node count of the active trees
    pub tree_size_mean: f32,
    /// Mean number of trees per library
    pub library_size_mean: f32,
    /// Number of distinct root ancestors alive
    pub lineage_count: usize,
    /// Total food in the world
    pub total_food: f32,
    pub top_parent: Option<RecordHolder>,
    pub record_holder: Option<RecordHolder>,
}

impl Stats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats from current simulation state
    pub fn update<'a, I>(&mut self, organisms: I, total_food: f32)
    where
        I: IntoIterator<Item = &'a Organism>,
    {
        let alive: Vec<&Organism> = organisms.into_iter().filter(|o| o.is_alive()).collect();
        self.population = alive.len();
        self.total_food = total_food;

        if alive.is_empty() {
            self.generation_max = 0;
            self.health_mean = 0.0;
            self.size_mean = 0.0;
            self.age_mean = 0.0;
            self.tree_size_mean = 0.0;
            self.library_size_mean = 0.0;
            self.lineage_count = 0;
            return;
        }

        let count = alive.len() as f32;
        self.generation_max = alive.iter().map(|o| o.generation).max().unwrap_or(0);
        self.health_mean = alive.iter().map(|o| o.health()).sum::<f32>() / count;
        self.size_mean = alive.iter().map(|o| o.size()).sum::<f32>() / count;
        self.age_mean = alive.iter().map(|o| o.age as f32).sum::<f32>() / count;

        self.tree_size_mean = alive
            .iter()
            .map(|o| o.active_tree().map_or(0, |tree| tree.size()) as f32)
            .sum::<f32>()
            / count;
        self.library_size_mean = alive.iter().map(|o| o.library().len() as f32).sum::<f32>() / count;

        let lineages: HashSet<OrganismId> = alive.iter().map(|o| o.ancestor_id).collect();
        self.lineage_count = lineages.len();
    }

    /// Copy the reproduction records into this snapshot
    pub fn set_records(&mut self, records: &ReproductionRecords) {
        self.top_parent = records.current;
        self.record_holder = records.all_time;
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        let top = self
            .top_parent
            .map(|r| format!("{}({})", r.id, r.children))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "T:{:6} | Pop:{:5} | Gen:{:3} | Size:{:5.1} | Tree:{:4.1} | Lib:{:4.1} | Lin:{:4} | Food:{:.0} | Top:{}",
            self.time,
            self.population,
            self.generation_max,
            self.size_mean,
            self.tree_size_mean,
            self.library_size_mean,
            self.lineage_count,
            self.total_food,
            top,
        )
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded stats snapshots
    pub snapshots: Vec<Stats>,
    /// Recording interval
    pub interval: u64,
}

impl StatsHistory {
    /// Create new history with recording interval
    pub fn new(interval: u64) -> Self {
        Self {
            snapshots: Vec::new(),
            interval: interval.max(1),
        }
    }

    /// Whether a snapshot is due at `time`
    #[inline]
    pub fn is_due(&self, time: u64) -> bool {
        time % self.interval == 0
    }

    /// Record a stats snapshot
    pub fn record(&mut self, stats: Stats) {
        self.snapshots.push(stats);
    }

    /// Most recent snapshot taken at or before `time`
    pub fn get_at(&self, time: u64) -> Option<&Stats> {
        self.snapshots.iter().rev().find(|s| s.time <= time)
    }

    /// Get population over time
    pub fn population_series(&self) -> Vec<(u64, usize)> {
        self.snapshots.iter().map(|s| (s.time, s.population)).collect()
    }

    /// Mean active tree size over time
    pub fn tree_size_series(&self) -> Vec<(u64, f32)> {
        self.snapshots.iter().map(|s| (s.time, s.tree_size_mean)).collect()
    }

    /// Save history to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }

    /// Load history from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LineageStats {
    pub founder_time: u64,
    pub current_population: usize,
    /// Organisms born into this lineage, not counting the founder
    pub descendants: u64,
    pub max_generation: u32,
    pub extinct: bool,
}

/// Per-lineage counters keyed by root ancestor id
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LineageTracker {
    pub lineages: HashMap<OrganismId, LineageStats>,
}

impl LineageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a founder spawned at `time`
    pub fn register_lineage(&mut self, founder: OrganismId, time: u64) {
        self.lineages.entry(founder).or_insert(LineageStats {
            founder_time: time,
            current_population: 1,
            ..LineageStats::default()
        });
    }

    /// Count one birth into the lineage rooted at `ancestor`
    pub fn record_descendant(&mut self, ancestor: OrganismId) {
        self.lineages.entry(ancestor).or_default().descendants += 1;
    }

    /// Descendants counted so far for `ancestor`
    pub fn descendants(&self, ancestor: OrganismId) -> u64 {
        self.lineages.get(&ancestor).map_or(0, |s| s.descendants)
    }

    /// Update lineage statistics
    pub fn update<'a, I>(&mut self, organisms: I)
    where
        I: IntoIterator<Item = &'a Organism>,
    {
        for stats in self.lineages.values_mut() {
            stats.current_population = 0;
        }

        for org in organisms.into_iter().filter(|o| o.is_alive()) {
            let stats = self.lineages.entry(org.ancestor_id).or_default();
            stats.current_population += 1;
            stats.max_generation = stats.max_generation.max(org.generation);
        }

        for stats in self.lineages.values_mut() {
            stats.extinct = stats.current_population == 0;
        }
    }

    /// Get surviving lineages count
    pub fn surviving_count(&self) -> usize {
        self.lineages.values().filter(|s| !s.extinct).count()
    }

    /// Largest living lineage; lowest founder id wins a tie
    pub fn dominant_lineage(&self) -> Option<(OrganismId, &LineageStats)> {
        self.lineages
            .iter()
            .filter(|(_, s)| !s.extinct)
            .max_by(|(a_id, a), (b_id, b)| {
                a.current_population
                    .cmp(&b.current_population)
                    .then_with(|| b_id.cmp(a_id))
            })
            .map(|(&id, stats)| (id, stats))
    }
}
