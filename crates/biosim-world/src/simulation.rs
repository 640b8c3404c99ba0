//! Yearly step engine for an island.

use crate::animal::SpeciesTable;
use crate::grid::Grid;
use biosim_core::{
    Error, LandscapeParamsUpdate, PopulationEntry, Result, SimConfig, Species, SpeciesCounts,
    SpeciesParamsUpdate, YearCounters, YearStats,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, event, info, instrument, Level};

/// Owns the island and the random generator, and advances the ecosystem one
/// year at a time.
///
/// A year runs in two passes over the land cells in row-major order. The
/// first pass regrows fodder, feeds, breeds, records statistics and sends
/// migrants into neighbouring transit lists. The second merges migrants,
/// ages everybody and applies death. No cell merges before every cell has
/// finished migrating, so an animal moves at most once per year.
pub struct Simulation {
    grid: Grid,
    species: SpeciesTable,
    config: SimConfig,
    rng: ChaCha8Rng,
    year: u64,
}

impl Simulation {
    pub fn new(config: SimConfig, map: &str) -> Result<Self> {
        config.validate()?;
        let grid = Grid::from_map(map)?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let species = SpeciesTable::from_config(&config);

        info!(
            width = grid.width,
            height = grid.height,
            land_cells = grid.land().len(),
            seed = config.seed,
            "Island created"
        );

        Ok(Self {
            grid,
            species,
            config,
            rng,
            year: 0,
        })
    }

    /// Place animals on the island. Stops at the first failing entry;
    /// earlier entries stay placed.
    pub fn add_population(&mut self, population: &[PopulationEntry]) -> Result<()> {
        for entry in population {
            self.grid
                .add_population(entry, &self.species, &mut self.rng)?;
            debug!(loc = %entry.loc, animals = entry.pop.len(), "Population added");
        }
        Ok(())
    }

    /// Override behavioural constants for a species by name.
    ///
    /// Animals already on the island pick up the new values immediately.
    pub fn set_animal_parameters(&mut self, species: &str, update: &SpeciesParamsUpdate) -> Result<()> {
        let species = Species::from_name(species)
            .ok_or_else(|| Error::Validation(format!("Unknown species: {:?}", species)))?;

        let mut params = self.config.species(species).clone();
        params.apply(species, update)?;
        match species {
            Species::Herbivore => self.config.herbivore = params.clone(),
            Species::Carnivore => self.config.carnivore = params.clone(),
        }
        self.species.set(species, params);

        let shared = self.species.get(species).clone();
        for cell in self.grid.iter_mut() {
            cell.rebind(species, &shared);
        }
        info!(%species, "Animal parameters updated");
        Ok(())
    }

    /// Override the fodder maximum of a landscape type by its map letter.
    pub fn set_landscape_parameters(&mut self, landscape: &str, update: &LandscapeParamsUpdate) -> Result<()> {
        self.config.landscape.apply(landscape, update)?;
        info!(landscape, f_max = ?update.f_max, "Landscape parameters updated");
        Ok(())
    }

    /// Simulate `num_years` further years and return one report per year.
    #[instrument(skip(self), fields(start_year = self.year))]
    pub fn simulate(&mut self, num_years: u64) -> Result<Vec<YearStats>> {
        info!("Simulating {} years", num_years);

        let mut reports = Vec::with_capacity(num_years as usize);
        for _ in 0..num_years {
            let stats = self.step()?;

            let interval = self.config.report_interval.max(1);
            if stats.year % interval == 0 {
                self.emit_population_metrics(&stats);
            }
            reports.push(stats);
        }

        let counts = self.num_animals_per_species();
        info!(
            event = "simulation_complete",
            year = self.year,
            herbivores = counts.herbivores,
            carnivores = counts.carnivores,
            total = counts.total(),
            "Simulation finished"
        );
        Ok(reports)
    }

    /// Advance the island by exactly one year.
    pub fn step(&mut self) -> Result<YearStats> {
        self.year += 1;
        let land = self.grid.land().to_vec();

        let mut stats = YearStats {
            year: self.year,
            herbivore_map: vec![vec![0; self.grid.width]; self.grid.height],
            carnivore_map: vec![vec![0; self.grid.width]; self.grid.height],
            ..Default::default()
        };
        let mut counters = YearCounters::default();

        // Pass 1: feeding, procreation, statistics and migration
        for &coord in &land {
            let Some(cell) = self.grid.get_mut(coord) else {
                continue;
            };
            cell.grow_resource(&self.config.landscape);
            counters.prey_killed += cell.feeding_phase(&mut self.rng);
            counters.births += cell.reproduction_phase(&mut self.rng);

            let snapshot = cell.stats();
            let counts = snapshot.counts();
            let (row, col) = ((coord.row - 1) as usize, (coord.col - 1) as usize);
            stats.herbivore_map[row][col] = counts.herbivores;
            stats.carnivore_map[row][col] = counts.carnivores;
            stats.counts += counts;
            stats.herbivore.extend(snapshot.herbivore);
            stats.carnivore.extend(snapshot.carnivore);

            counters.emigrations += self.grid.migrate_from(coord, &mut self.rng)?;
        }

        // Pass 2: settle migrants, then aging and death
        for &coord in &land {
            let Some(cell) = self.grid.get_mut(coord) else {
                continue;
            };
            cell.merge_migrants();
            cell.aging_phase();
            counters.deaths += cell.death_phase(&mut self.rng);
        }

        stats.counters = counters;
        stats.end_of_year = self.grid.population();

        debug!(
            event = "year_complete",
            year = self.year,
            herbivores = stats.end_of_year.herbivores,
            carnivores = stats.end_of_year.carnivores,
            births = counters.births.total(),
            prey_killed = counters.prey_killed,
            emigrations = counters.emigrations.total(),
            deaths = counters.deaths.total(),
            "Year complete"
        );

        Ok(stats)
    }

    fn emit_population_metrics(&self, stats: &YearStats) {
        info!(
            event = "population_metrics",
            year = stats.year,
            herbivores = stats.end_of_year.herbivores,
            carnivores = stats.end_of_year.carnivores,
            herbivore_mean_weight = format!("{:.2}", stats.herbivore.mean_weight()),
            carnivore_mean_weight = format!("{:.2}", stats.carnivore.mean_weight()),
            herbivore_mean_fitness = format!("{:.3}", stats.herbivore.mean_fitness()),
            carnivore_mean_fitness = format!("{:.3}", stats.carnivore.mean_fitness()),
            herbivore_mean_age = format!("{:.1}", stats.herbivore.mean_age()),
            carnivore_mean_age = format!("{:.1}", stats.carnivore.mean_age()),
            "Population metrics snapshot"
        );

        event!(
            Level::INFO,
            gauge_name = "population_total",
            gauge_value = stats.end_of_year.total(),
            year = stats.year,
            "Population gauge"
        );
    }

    /// Last year simulated
    pub fn year(&self) -> u64 {
        self.year
    }

    /// Total number of animals on the island
    pub fn num_animals(&self) -> usize {
        self.grid.population().total()
    }

    pub fn num_animals_per_species(&self) -> SpeciesCounts {
        self.grid.population()
    }

    /// Current per-cell residents of `species`, `height × width`
    pub fn occupancy_map(&self, species: Species) -> Vec<Vec<usize>> {
        self.grid.occupancy_map(species)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}
