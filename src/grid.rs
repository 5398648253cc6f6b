//! Occupancy grid, food store and ph field, plus the lookup surface the
//! organisms read their surroundings through.

use crate::organism::OrganismId;
use crate::point::{Direction, Point};
use rand::Rng;
use std::collections::HashMap;

/// What an organism can tell about a neighbour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: OrganismId,
    pub size: f32,
    pub health: f32,
    pub ancestor_id: OrganismId,
}

/// Read-only view of the world used while deciding
pub trait Surroundings {
    /// Food at `point`, if the cell holds any
    fn food_at(&self, point: Point) -> Option<f32>;

    /// Organism occupying `point`
    fn organism_at(&self, point: Point) -> Option<Neighbor>;

    /// Environmental ph at `point`
    fn ph_at(&self, point: Point) -> f32;

    /// Cell next to `point` in `direction`, wrapped onto the torus
    fn neighbor(&self, point: Point, direction: Direction) -> Point;
}

/// Sink told about every cell whose visible contents changed
pub trait CellObserver {
    fn cell_changed(&mut self, point: Point);
}

impl<F> CellObserver for F
where
    F: FnMut(Point),
{
    fn cell_changed(&mut self, point: Point) {
        (self)(point)
    }
}

/// Dense cell -> organism index; at most one organism per cell
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    cells: Vec<Option<OrganismId>>,
}

impl OccupancyGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn wrap(&self, point: Point) -> Point {
        point.wrap(self.width, self.height)
    }

    #[inline]
    pub fn neighbor(&self, point: Point, direction: Direction) -> Point {
        point.step(direction, self.width, self.height)
    }

    #[inline]
    fn index(&self, point: Point) -> usize {
        let p = self.wrap(point);
        p.y as usize * self.width + p.x as usize
    }

    #[inline]
    pub fn organism_at(&self, point: Point) -> Option<OrganismId> {
        self.cells[self.index(point)]
    }

    #[inline]
    pub fn is_empty(&self, point: Point) -> bool {
        self.organism_at(point).is_none()
    }

    /// Claim an empty cell; returns false if it is already taken
    pub fn occupy(&mut self, point: Point, id: OrganismId) -> bool {
        let index = self.index(point);
        match self.cells[index] {
            Some(_) => false,
            None => {
                self.cells[index] = Some(id);
                true
            }
        }
    }

    /// Empty a cell, returning whoever was there
    pub fn vacate(&mut self, point: Point) -> Option<OrganismId> {
        let index = self.index(point);
        self.cells[index].take()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = Point> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(move |(i, _)| Point::new((i % width) as i32, (i / width) as i32))
    }

    pub fn random_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        Point::new(
            rng.gen_range(0..self.width) as i32,
            rng.gen_range(0..self.height) as i32,
        )
    }
}

/// Food keyed by cell, capped per cell
#[derive(Clone, Debug)]
pub struct FoodStore {
    width: usize,
    height: usize,
    cells: HashMap<Point, f32>,
    max_per_cell: f32,
}

impl FoodStore {
    pub fn new(width: usize, height: usize, max_per_cell: f32) -> Self {
        Self {
            width,
            height,
            cells: HashMap::new(),
            max_per_cell,
        }
    }

    /// Seed a fraction of cells with food
    pub fn initialize<R: Rng + ?Sized>(&mut self, density: f64, amount: f32, rng: &mut R) {
        for y in 0..self.height {
            for x in 0..self.width {
                if rng.gen_bool(density) {
                    self.add_food(Point::new(x as i32, y as i32), amount);
                }
            }
        }
    }

    /// Food at position, if any
    #[inline]
    pub fn food_at(&self, point: Point) -> Option<f32> {
        let point = point.wrap(self.width, self.height);
        self.cells.get(&point).copied().filter(|&amount| amount > 0.0)
    }

    /// Take up to `amount`, returns what was actually removed
    pub fn remove_food(&mut self, point: Point, amount: f32) -> f32 {
        let point = point.wrap(self.width, self.height);
        let Some(available) = self.cells.get_mut(&point) else {
            return 0.0;
        };
        let removed = available.min(amount.max(0.0));
        *available -= removed;
        if *available <= 0.0 {
            self.cells.remove(&point);
        }
        removed
    }

    /// Add up to the per-cell cap, returns what was actually added
    pub fn add_food(&mut self, point: Point, amount: f32) -> f32 {
        if amount <= 0.0 {
            return 0.0;
        }
        let point = point.wrap(self.width, self.height);
        let cell = self.cells.entry(point).or_insert(0.0);
        let added = amount.min(self.max_per_cell - *cell).max(0.0);
        *cell += added;
        if *cell <= 0.0 {
            self.cells.remove(&point);
        }
        added
    }

    /// Get total food in the store
    pub fn total(&self) -> f32 {
        self.cells.values().sum()
    }

    /// Number of cells holding food
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn max_per_cell(&self) -> f32 {
        self.max_per_cell
    }
}

/// Static ph field: two crossed waves with random phase
#[derive(Clone, Debug)]
pub struct PhMap {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl PhMap {
    pub fn new<R: Rng + ?Sized>(width: usize, height: usize, ph_min: f32, ph_max: f32, rng: &mut R) -> Self {
        use std::f32::consts::TAU;

        let phase_x = rng.gen_range(0.0..TAU);
        let phase_y = rng.gen_range(0.0..TAU);
        let mid = (ph_min + ph_max) / 2.0;
        let half_range = (ph_max - ph_min) / 2.0;

        let mut values = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let wave_x = (TAU * x as f32 / width as f32 + phase_x).sin();
                let wave_y = (TAU * y as f32 / height as f32 + phase_y).cos();
                let ph = mid + half_range * 0.5 * (wave_x + wave_y);
                values.push(ph.clamp(ph_min, ph_max));
            }
        }

        Self { width, height, values }
    }

    /// Same ph everywhere
    pub fn uniform(width: usize, height: usize, ph: f32) -> Self {
        Self {
            width,
            height,
            values: vec![ph; width * height],
        }
    }

    #[inline]
    pub fn ph_at(&self, point: Point) -> f32 {
        let p = point.wrap(self.width, self.height);
        self.values[p.y as usize * self.width + p.x as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_occupancy_basic() {
        let mut grid = OccupancyGrid::new(10, 8);
        assert!(grid.occupy(Point::new(3, 4), 7));
        assert!(!grid.occupy(Point::new(3, 4), 9));
        assert_eq!(grid.organism_at(Point::new(3, 4)), Some(7));
        assert_eq!(grid.occupied_count(), 1);

        assert_eq!(grid.vacate(Point::new(3, 4)), Some(7));
        assert!(grid.is_empty(Point::new(3, 4)));
        assert_eq!(grid.vacate(Point::new(3, 4)), None);
    }

    #[test]
    fn test_occupancy_wraps() {
        let mut grid = OccupancyGrid::new(10, 8);
        grid.occupy(Point::new(-1, 8), 1);
        assert_eq!(grid.organism_at(Point::new(9, 0)), Some(1));
        assert_eq!(grid.neighbor(Point::new(9, 0), Direction::East), Point::new(0, 0));
    }

    #[test]
    fn test_empty_cells() {
        let mut grid = OccupancyGrid::new(3, 2);
        grid.occupy(Point::new(1, 0), 1);
        grid.occupy(Point::new(2, 1), 2);
        let empty: Vec<Point> = grid.empty_cells().collect();
        assert_eq!(
            empty,
            vec![Point::new(0, 0), Point::new(2, 0), Point::new(0, 1), Point::new(1, 1)]
        );
    }

    #[test]
    fn test_food_store() {
        let mut food = FoodStore::new(10, 10, 50.0);
        let p = Point::new(2, 2);
        assert_eq!(food.food_at(p), None);

        assert_eq!(food.add_food(p, 30.0), 30.0);
        assert_eq!(food.add_food(p, 30.0), 20.0);
        assert_eq!(food.food_at(p), Some(50.0));

        assert_eq!(food.remove_food(p, 10.0), 10.0);
        assert_eq!(food.remove_food(p, 100.0), 40.0);
        assert_eq!(food.food_at(p), None);
        assert!(food.is_empty());
        assert_eq!(food.remove_food(p, 5.0), 0.0);
    }

    #[test]
    fn test_food_initialize_density() {
        let mut food = FoodStore::new(20, 20, 50.0);
        food.initialize(1.0, 5.0, &mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(food.len(), 400);
        assert!((food.total() - 2000.0).abs() < 1e-2);
    }

    #[test]
    fn test_ph_in_range() {
        let ph = PhMap::new(30, 20, 5.0, 9.0, &mut ChaCha8Rng::seed_from_u64(5));
        for y in 0..20 {
            for x in 0..30 {
                let value = ph.ph_at(Point::new(x, y));
                assert!((5.0..=9.0).contains(&value));
            }
        }
        assert_eq!(ph.ph_at(Point::new(-1, 0)), ph.ph_at(Point::new(29, 0)));
    }
}
