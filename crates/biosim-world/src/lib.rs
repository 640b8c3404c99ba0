//! Island ecosystem engine.
//!
//! Herbivores and carnivores live on a grid of landscape cells and are
//! stepped year by year through feeding, procreation, migration, aging and
//! death.

pub mod animal;
pub mod cell;
pub mod grid;
pub mod island;
pub mod simulation;

pub use animal::{Animal, HuntOutcome, SpeciesTable};
pub use cell::{Cell, Migrant};
pub use grid::Grid;
pub use island::{IslandJob, IslandResult, JobStage};
pub use simulation::Simulation;
