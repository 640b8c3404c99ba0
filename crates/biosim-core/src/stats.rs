//! Per-year population statistics handed to reporting collaborators.

use crate::types::Species;
use serde::{Deserialize, Serialize};

/// Animal count per species
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCounts {
    pub herbivores: usize,
    pub carnivores: usize,
}

impl SpeciesCounts {
    pub fn new(herbivores: usize, carnivores: usize) -> Self {
        Self {
            herbivores,
            carnivores,
        }
    }

    pub fn total(&self) -> usize {
        self.herbivores + self.carnivores
    }

    pub fn get(&self, species: Species) -> usize {
        match species {
            Species::Herbivore => self.herbivores,
            Species::Carnivore => self.carnivores,
        }
    }

    pub fn add(&mut self, species: Species, n: usize) {
        match species {
            Species::Herbivore => self.herbivores += n,
            Species::Carnivore => self.carnivores += n,
        }
    }
}

impl std::ops::AddAssign for SpeciesCounts {
    fn add_assign(&mut self, other: Self) {
        self.herbivores += other.herbivores;
        self.carnivores += other.carnivores;
    }
}

/// Flattened per-individual samples for one species
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSamples {
    pub weights: Vec<f64>,
    pub fitness: Vec<f64>,
    pub ages: Vec<u32>,
}

impl SpeciesSamples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, age: u32, weight: f64, fitness: f64) {
        self.ages.push(age);
        self.weights.push(weight);
        self.fitness.push(fitness);
    }

    pub fn extend(&mut self, other: SpeciesSamples) {
        self.weights.extend(other.weights);
        self.fitness.extend(other.fitness);
        self.ages.extend(other.ages);
    }

    pub fn len(&self) -> usize {
        self.ages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ages.is_empty()
    }

    pub fn mean_weight(&self) -> f64 {
        mean(&self.weights)
    }

    pub fn mean_fitness(&self) -> f64 {
        mean(&self.fitness)
    }

    pub fn mean_age(&self) -> f64 {
        if self.ages.is_empty() {
            return 0.0;
        }
        self.ages.iter().map(|&a| a as f64).sum::<f64>() / self.ages.len() as f64
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Snapshot of a single cell, taken after reproduction and before migration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellStats {
    pub herbivore: SpeciesSamples,
    pub carnivore: SpeciesSamples,
}

impl CellStats {
    pub fn counts(&self) -> SpeciesCounts {
        SpeciesCounts::new(self.herbivore.len(), self.carnivore.len())
    }
}

/// Event counters accumulated over one year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCounters {
    pub births: SpeciesCounts,
    pub prey_killed: usize,
    pub emigrations: SpeciesCounts,
    pub deaths: SpeciesCounts,
}

impl std::ops::AddAssign for YearCounters {
    fn add_assign(&mut self, other: Self) {
        self.births += other.births;
        self.prey_killed += other.prey_killed;
        self.emigrations += other.emigrations;
        self.deaths += other.deaths;
    }
}

/// Island-wide report for one simulated year.
///
/// `counts`, the occupancy maps and the samples are gathered cell by cell
/// before migration; `end_of_year` is the population after death.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearStats {
    pub year: u64,
    pub counts: SpeciesCounts,
    /// Herbivore count per cell, `rows × cols`, zero on water
    pub herbivore_map: Vec<Vec<usize>>,
    /// Carnivore count per cell, `rows × cols`, zero on water
    pub carnivore_map: Vec<Vec<usize>>,
    pub herbivore: SpeciesSamples,
    pub carnivore: SpeciesSamples,
    pub counters: YearCounters,
    pub end_of_year: SpeciesCounts,
}

impl YearStats {
    pub fn samples(&self, species: Species) -> &SpeciesSamples {
        match species {
            Species::Herbivore => &self.herbivore,
            Species::Carnivore => &self.carnivore,
        }
    }

    pub fn occupancy(&self, species: Species) -> &[Vec<usize>] {
        match species {
            Species::Herbivore => &self.herbivore_map,
            Species::Carnivore => &self.carnivore_map,
        }
    }
}
