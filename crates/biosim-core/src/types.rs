//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Grid location as 1-based (row, column), matching the map text layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Coordinate {
    pub row: i32,
    pub col: i32,
}

impl Coordinate {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn step(&self, direction: Direction) -> Self {
        let (dr, dc) = direction.to_delta();
        Self {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// The four orthogonal neighbours in migration draw order.
    pub fn neighbors(&self) -> [Coordinate; 4] {
        Direction::all().map(|d| self.step(d))
    }
}

impl From<(i32, i32)> for Coordinate {
    fn from((row, col): (i32, i32)) -> Self {
        Self::new(row, col)
    }
}

impl From<Coordinate> for (i32, i32) {
    fn from(coord: Coordinate) -> Self {
        (coord.row, coord.col)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Orthogonal direction for migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    South,
    North,
    East,
    West,
}

impl Direction {
    /// (row, column) offset
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::South => (1, 0),
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
        }
    }

    pub fn all() -> [Direction; 4] {
        [
            Direction::South,
            Direction::North,
            Direction::East,
            Direction::West,
        ]
    }
}

/// The two animal species living on the island.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    /// Prey, grazes on fodder.
    Herbivore,
    /// Predator, hunts herbivores.
    Carnivore,
}

impl Species {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Herbivore" => Some(Species::Herbivore),
            "Carnivore" => Some(Species::Carnivore),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Species::Herbivore => "Herbivore",
            Species::Carnivore => "Carnivore",
        }
    }

    pub fn all() -> [Species; 2] {
        [Species::Herbivore, Species::Carnivore]
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Landscape kind of a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Lowland,
    Highland,
    Desert,
    Water,
}

impl Terrain {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'L' => Some(Terrain::Lowland),
            'H' => Some(Terrain::Highland),
            'D' => Some(Terrain::Desert),
            'W' => Some(Terrain::Water),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            Terrain::Lowland => 'L',
            Terrain::Highland => 'H',
            Terrain::Desert => 'D',
            Terrain::Water => 'W',
        }
    }

    pub fn is_passable(&self) -> bool {
        !matches!(self, Terrain::Water)
    }
}

/// One animal to be placed on the island.
///
/// `species` stays a plain name so that an unknown species is reported as a
/// placement error rather than a parse error. A missing `weight` is drawn
/// from the species birth distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalDescription {
    pub species: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl AnimalDescription {
    pub fn new(species: Species, age: u32, weight: f64) -> Self {
        Self {
            species: species.name().to_string(),
            age,
            weight: Some(weight),
        }
    }
}

/// A batch of animals placed at one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationEntry {
    pub loc: Coordinate,
    pub pop: Vec<AnimalDescription>,
}

impl PopulationEntry {
    pub fn new(loc: Coordinate, pop: Vec<AnimalDescription>) -> Self {
        Self { loc, pop }
    }

    /// `count` identical animals at `loc`
    pub fn uniform(loc: Coordinate, species: Species, age: u32, weight: f64, count: usize) -> Self {
        Self {
            loc,
            pop: vec![AnimalDescription::new(species, age, weight); count],
        }
    }
}
