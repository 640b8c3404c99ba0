//! Island job: a map, its configuration and a staged population schedule.

use crate::simulation::Simulation;
use biosim_core::{
    LandscapeParamsUpdate, PopulationEntry, Result, SimConfig, SpeciesCounts,
    SpeciesParamsUpdate, YearStats,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Population added before simulating `years` further years
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStage {
    #[serde(default)]
    pub population: Vec<PopulationEntry>,
    pub years: u64,
}

/// A complete island run description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IslandJob {
    pub map: String,
    #[serde(default)]
    pub config: SimConfig,
    /// Species overrides keyed by species name
    #[serde(default)]
    pub animal_parameters: BTreeMap<String, SpeciesParamsUpdate>,
    /// Landscape overrides keyed by map letter
    #[serde(default)]
    pub landscape_parameters: BTreeMap<String, LandscapeParamsUpdate>,
    pub stages: Vec<JobStage>,
}

impl IslandJob {
    pub fn new(map: impl Into<String>, config: SimConfig) -> Self {
        Self {
            map: map.into(),
            config,
            animal_parameters: BTreeMap::new(),
            landscape_parameters: BTreeMap::new(),
            stages: Vec::new(),
        }
    }

    pub fn with_stage(mut self, population: Vec<PopulationEntry>, years: u64) -> Self {
        self.stages.push(JobStage { population, years });
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Total years over all stages
    pub fn total_years(&self) -> u64 {
        self.stages.iter().map(|stage| stage.years).sum()
    }

    /// Execute this island job
    pub fn execute(self) -> Result<IslandResult> {
        let mut simulation = Simulation::new(self.config, &self.map)?;
        for (species, update) in &self.animal_parameters {
            simulation.set_animal_parameters(species, update)?;
        }
        for (landscape, update) in &self.landscape_parameters {
            simulation.set_landscape_parameters(landscape, update)?;
        }

        let mut years = Vec::new();
        for (i, stage) in self.stages.iter().enumerate() {
            simulation.add_population(&stage.population)?;
            info!(stage = i, years = stage.years, "Starting stage");
            years.extend(simulation.simulate(stage.years)?);
        }

        Ok(IslandResult {
            final_year: simulation.year(),
            final_counts: simulation.num_animals_per_species(),
            years,
        })
    }
}

/// Result from executing an island job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslandResult {
    pub final_year: u64,
    pub final_counts: SpeciesCounts,
    pub years: Vec<YearStats>,
}
