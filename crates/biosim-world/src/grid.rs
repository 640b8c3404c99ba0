//! The island grid: map parsing, coordinate lookup and migration wiring.

use crate::animal::SpeciesTable;
use crate::cell::Cell;
use biosim_core::{Coordinate, Error, PopulationEntry, Result, Species, SpeciesCounts, Terrain};
use rand::Rng;
use tracing::trace;

/// A rectangular grid of cells, fully bordered by water.
///
/// Coordinates are 1-based: the first letter of the first map line is (1, 1).
#[derive(Debug, Clone)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    cells: Vec<Cell>,
    land: Vec<Coordinate>,
}

impl Grid {
    /// Parse a map made of the letters `L`, `H`, `D` and `W`.
    ///
    /// Lines are trimmed and blank lines skipped.
    pub fn from_map(map: &str) -> Result<Self> {
        let lines: Vec<&str> = map
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let Some(first) = lines.first() else {
            return Err(Error::Validation("Island map is empty".to_string()));
        };

        let width = first.chars().count();
        let height = lines.len();
        let mut cells = Vec::with_capacity(width * height);
        let mut land = Vec::new();

        for (r, line) in lines.iter().enumerate() {
            if line.chars().count() != width {
                return Err(Error::Validation(format!(
                    "Inconsistent line length for: {}, expected length: {}",
                    line, width
                )));
            }

            for (c, letter) in line.chars().enumerate() {
                let terrain = Terrain::from_code(letter).ok_or_else(|| {
                    Error::Validation(format!(
                        "Unknown landscape type {:?}, only L, H, D and W are allowed",
                        letter
                    ))
                })?;

                let on_border = r == 0 || c == 0 || r == height - 1 || c == width - 1;
                if on_border && terrain.is_passable() {
                    return Err(Error::Validation(format!(
                        "The border must be only water, found {:?} at ({}, {})",
                        letter,
                        r + 1,
                        c + 1
                    )));
                }

                if terrain.is_passable() {
                    land.push(Coordinate::new(r as i32 + 1, c as i32 + 1));
                }
                cells.push(Cell::new(terrain));
            }
        }

        Ok(Self {
            width,
            height,
            cells,
            land,
        })
    }

    fn index(&self, coord: Coordinate) -> Option<usize> {
        let row = usize::try_from(coord.row).ok()?.checked_sub(1)?;
        let col = usize::try_from(coord.col).ok()?.checked_sub(1)?;
        (row < self.height && col < self.width).then(|| row * self.width + col)
    }

    /// Get position from index
    pub fn index_to_coordinate(&self, index: usize) -> Coordinate {
        let row = index / self.width;
        let col = index % self.width;
        Coordinate::new(row as i32 + 1, col as i32 + 1)
    }

    pub fn get(&self, coord: Coordinate) -> Option<&Cell> {
        self.index(coord).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, coord: Coordinate) -> Option<&mut Cell> {
        self.index(coord).map(move |i| &mut self.cells[i])
    }

    /// Outside the grid counts as impassable.
    pub fn is_passable(&self, coord: Coordinate) -> bool {
        self.get(coord).map_or(false, Cell::is_passable)
    }

    /// Iterator over all coordinates in row-major order
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        (0..self.cells.len()).map(move |i| self.index_to_coordinate(i))
    }

    /// Passable coordinates in row-major order
    pub fn land(&self) -> &[Coordinate] {
        &self.land
    }

    /// Iterator over all cells with coordinates, row-major
    pub fn iter(&self) -> impl Iterator<Item = (Coordinate, &Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (self.index_to_coordinate(i), cell))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Cell> + '_ {
        self.cells.iter_mut()
    }

    /// Place a population batch on its cell.
    pub fn add_population<R: Rng + ?Sized>(
        &mut self,
        entry: &PopulationEntry,
        table: &SpeciesTable,
        rng: &mut R,
    ) -> Result<()> {
        let cell = self.get_mut(entry.loc).ok_or_else(|| {
            Error::InvalidPlacement(format!("Location {} is outside the island", entry.loc))
        })?;
        cell.add_population(&entry.pop, table, rng)
    }

    /// Run the migration phase of the cell at `coord` and hand every departing
    /// animal to its destination's transit list. Returns emigrants per species.
    pub fn migrate_from<R: Rng + ?Sized>(&mut self, coord: Coordinate, rng: &mut R) -> Result<SpeciesCounts> {
        let mut emigrants = SpeciesCounts::default();
        let neighbors = coord.neighbors().map(|n| (n, self.is_passable(n)));

        let migrants = match self.get_mut(coord) {
            Some(cell) => cell.migration_phase(&neighbors, rng),
            None => return Ok(emigrants),
        };

        for migrant in migrants {
            let species = migrant.animal.species();
            let destination = self.get_mut(migrant.destination).ok_or_else(|| {
                Error::InvalidPlacement(format!(
                    "Migration target {} is outside the island",
                    migrant.destination
                ))
            })?;
            destination.receive_migrant(migrant.animal)?;
            emigrants.add(species, 1);
            trace!(from = %coord, to = %migrant.destination, %species, "Animal migrated");
        }

        Ok(emigrants)
    }

    /// Resident animals per species on the whole island
    pub fn population(&self) -> SpeciesCounts {
        let mut counts = SpeciesCounts::default();
        for cell in &self.cells {
            counts += cell.population();
        }
        counts
    }

    /// Animals currently held in transit lists
    pub fn transit_population(&self) -> SpeciesCounts {
        let mut counts = SpeciesCounts::default();
        for cell in &self.cells {
            counts += cell.transit_population();
        }
        counts
    }

    /// Resident count of `species` per cell, `height × width`
    pub fn occupancy_map(&self, species: Species) -> Vec<Vec<usize>> {
        self.cells
            .chunks(self.width)
            .map(|row| row.iter().map(|cell| cell.residents(species).len()).collect())
            .collect()
    }
}
