//! Grid coordinates and cardinal directions on a toroidal world.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Grid coordinate or offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Wrap onto a `width` x `height` torus
    #[inline]
    pub fn wrap(self, width: usize, height: usize) -> Self {
        Self {
            x: self.x.rem_euclid(width as i32),
            y: self.y.rem_euclid(height as i32),
        }
    }

    /// Neighbouring cell in `direction`, wrapped
    #[inline]
    pub fn step(self, direction: Direction, width: usize, height: usize) -> Self {
        (self + direction.offset()).wrap(width, height)
    }
}

impl Add for Point {
    type Output = Point;

    #[inline]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// One of the four cardinal unit vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Clockwise order starting at north
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit offset; y grows southwards
    #[inline]
    pub const fn offset(self) -> Point {
        match self {
            Direction::North => Point::new(0, -1),
            Direction::East => Point::new(1, 0),
            Direction::South => Point::new(0, 1),
            Direction::West => Point::new(-1, 0),
        }
    }

    #[inline]
    pub const fn turn_left(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    #[inline]
    pub const fn turn_right(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// Position in [`Direction::ALL`]
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// All four directions clockwise, starting from `self`
    pub fn clockwise_from(self) -> [Direction; 4] {
        let start = self.index();
        [
            Self::ALL[start],
            Self::ALL[(start + 1) % 4],
            Self::ALL[(start + 2) % 4],
            Self::ALL[(start + 3) % 4],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_negative_and_overflow() {
        assert_eq!(Point::new(-1, 0).wrap(10, 8), Point::new(9, 0));
        assert_eq!(Point::new(10, 8).wrap(10, 8), Point::new(0, 0));
        assert_eq!(Point::new(-21, 17).wrap(10, 8), Point::new(9, 1));
    }

    #[test]
    fn test_step_wraps_around_edges() {
        let corner = Point::new(0, 0);
        assert_eq!(corner.step(Direction::North, 5, 5), Point::new(0, 4));
        assert_eq!(corner.step(Direction::West, 5, 5), Point::new(4, 0));
        assert_eq!(Point::new(4, 4).step(Direction::East, 5, 5), Point::new(0, 4));
    }

    #[test]
    fn test_turns_are_inverse() {
        for dir in Direction::ALL {
            assert_eq!(dir.turn_left().turn_right(), dir);
            assert_eq!(dir.turn_right().turn_right().turn_right().turn_right(), dir);
        }
    }

    #[test]
    fn test_clockwise_from() {
        assert_eq!(
            Direction::South.clockwise_from(),
            [Direction::South, Direction::West, Direction::North, Direction::East]
        );
    }
}
