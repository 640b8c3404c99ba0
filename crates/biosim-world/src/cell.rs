//! A single grid location and its per-year phases.

use crate::animal::{Animal, SpeciesTable};
use biosim_core::{
    AnimalDescription, CellStats, Coordinate, Error, LandscapeParams, Result, Species,
    SpeciesCounts, SpeciesParams, Terrain,
};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::trace;

/// An animal leaving a cell, bound for `destination`'s transit list
#[derive(Debug, Clone)]
pub struct Migrant {
    pub destination: Coordinate,
    pub animal: Animal,
}

/// Terrain, fodder and the animals living on one grid location.
///
/// Water cells never hold fodder or animals; every phase is a no-op there.
#[derive(Debug, Clone)]
pub struct Cell {
    terrain: Terrain,
    fodder: f64,
    herbivores: Vec<Animal>,
    carnivores: Vec<Animal>,
    incoming_herbivores: Vec<Animal>,
    incoming_carnivores: Vec<Animal>,
}

impl Cell {
    pub fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            fodder: 0.0,
            herbivores: Vec::new(),
            carnivores: Vec::new(),
            incoming_herbivores: Vec::new(),
            incoming_carnivores: Vec::new(),
        }
    }

    pub fn terrain(&self) -> Terrain {
        self.terrain
    }

    pub fn is_passable(&self) -> bool {
        self.terrain.is_passable()
    }

    /// Current fodder; `None` on water
    pub fn fodder(&self) -> Option<f64> {
        self.is_passable().then_some(self.fodder)
    }

    pub fn residents(&self, species: Species) -> &[Animal] {
        match species {
            Species::Herbivore => &self.herbivores,
            Species::Carnivore => &self.carnivores,
        }
    }

    pub fn in_transit(&self, species: Species) -> &[Animal] {
        match species {
            Species::Herbivore => &self.incoming_herbivores,
            Species::Carnivore => &self.incoming_carnivores,
        }
    }

    fn residents_mut(&mut self, species: Species) -> &mut Vec<Animal> {
        match species {
            Species::Herbivore => &mut self.herbivores,
            Species::Carnivore => &mut self.carnivores,
        }
    }

    /// Resident animal count per species
    pub fn population(&self) -> SpeciesCounts {
        SpeciesCounts::new(self.herbivores.len(), self.carnivores.len())
    }

    /// Animals that arrived this year and have not merged yet
    pub fn transit_population(&self) -> SpeciesCounts {
        SpeciesCounts::new(self.incoming_herbivores.len(), self.incoming_carnivores.len())
    }

    /// Place new animals in the resident lists.
    ///
    /// Either every description is placed or none is.
    pub fn add_population<R: Rng + ?Sized>(
        &mut self,
        descriptions: &[AnimalDescription],
        table: &SpeciesTable,
        rng: &mut R,
    ) -> Result<()> {
        if !self.is_passable() {
            return Err(Error::InvalidPlacement(format!(
                "Animals cannot be placed on {:?}",
                self.terrain
            )));
        }

        let animals = descriptions
            .iter()
            .map(|description| Animal::from_description(description, table, rng))
            .collect::<Result<Vec<_>>>()?;

        for animal in animals {
            self.residents_mut(animal.species()).push(animal);
        }
        Ok(())
    }

    pub fn grow_resource(&mut self, landscape: &LandscapeParams) {
        self.fodder = landscape.f_max(self.terrain).unwrap_or(0.0);
    }

    /// Herbivores graze fittest first, then carnivores hunt in random order.
    ///
    /// Prey killed by one carnivore are skipped by the next; the resident
    /// list is compacted once every carnivore has hunted. Returns the number
    /// of prey killed.
    pub fn feeding_phase<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        if !self.is_passable() {
            return 0;
        }

        self.herbivores
            .sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
        for herbivore in &mut self.herbivores {
            let eaten = herbivore.feed(self.fodder);
            self.fodder = (self.fodder - eaten).max(0.0);
        }

        self.carnivores.shuffle(rng);
        let mut killed = vec![false; self.herbivores.len()];
        for carnivore in &mut self.carnivores {
            let prey = self
                .herbivores
                .iter()
                .enumerate()
                .filter(|(i, _)| !killed[*i]);
            let outcome = carnivore.hunt(prey, rng);
            for index in outcome.killed {
                killed[index] = true;
            }
        }

        let n_killed = killed.iter().filter(|&&k| k).count();
        if n_killed > 0 {
            let mut flags = killed.into_iter();
            self.herbivores.retain(|_| !flags.next().unwrap_or(false));
            trace!(killed = n_killed, "Prey removed after hunting");
        }
        n_killed
    }

    /// Every non-newborn animal may give birth once.
    ///
    /// The candidate count is fixed per species before any birth, and
    /// newborns join the resident list only after the whole species is done.
    pub fn reproduction_phase<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SpeciesCounts {
        let mut births = SpeciesCounts::default();
        if !self.is_passable() {
            return births;
        }

        for species in Species::all() {
            let residents = self.residents_mut(species);
            let candidates = residents.iter().filter(|a| a.age() != 0).count();
            let newborns: Vec<Animal> = residents
                .iter_mut()
                .filter(|a| a.age() != 0)
                .filter_map(|parent| parent.attempt_reproduce(candidates, rng))
                .collect();
            births.add(species, newborns.len());
            residents.extend(newborns);
        }
        births
    }

    /// Decide which residents leave this year.
    ///
    /// `neighbors` lists the four orthogonal neighbours with their
    /// passability, in draw order. Decisions are taken over a snapshot of the
    /// resident lists, herbivores first; departing animals are removed here
    /// and returned for delivery.
    pub fn migration_phase<R: Rng + ?Sized>(
        &mut self,
        neighbors: &[(Coordinate, bool); 4],
        rng: &mut R,
    ) -> Vec<Migrant> {
        let mut migrants = Vec::new();
        if !self.is_passable() {
            return migrants;
        }
        emigrate(&mut self.herbivores, neighbors, rng, &mut migrants);
        emigrate(&mut self.carnivores, neighbors, rng, &mut migrants);
        migrants
    }

    /// Hold an arriving animal until [`Cell::merge_migrants`].
    pub fn receive_migrant(&mut self, animal: Animal) -> Result<()> {
        if !self.is_passable() {
            return Err(Error::InvalidPlacement(format!(
                "Animals cannot migrate onto {:?}",
                self.terrain
            )));
        }
        match animal.species() {
            Species::Herbivore => self.incoming_herbivores.push(animal),
            Species::Carnivore => self.incoming_carnivores.push(animal),
        }
        Ok(())
    }

    pub fn merge_migrants(&mut self) {
        self.herbivores.append(&mut self.incoming_herbivores);
        self.carnivores.append(&mut self.incoming_carnivores);
    }

    pub fn aging_phase(&mut self) {
        for animal in self.herbivores.iter_mut().chain(self.carnivores.iter_mut()) {
            animal.age_one_year();
        }
    }

    /// Remove every resident whose death check succeeds. Returns the dead count.
    pub fn death_phase<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SpeciesCounts {
        let mut deaths = SpeciesCounts::default();
        for species in Species::all() {
            let residents = self.residents_mut(species);
            let before = residents.len();
            residents.retain(|animal| !animal.attempt_die(rng));
            deaths.add(species, before - residents.len());
        }
        deaths
    }

    /// Weight, fitness and age of every resident
    pub fn stats(&self) -> CellStats {
        let mut stats = CellStats::default();
        for animal in &self.herbivores {
            stats.herbivore.push(animal.age(), animal.weight(), animal.fitness());
        }
        for animal in &self.carnivores {
            stats.carnivore.push(animal.age(), animal.weight(), animal.fitness());
        }
        stats
    }

    /// Point every animal of `species` at a new parameter record.
    pub fn rebind(&mut self, species: Species, params: &Arc<SpeciesParams>) {
        let (residents, incoming) = match species {
            Species::Herbivore => (&mut self.herbivores, &mut self.incoming_herbivores),
            Species::Carnivore => (&mut self.carnivores, &mut self.incoming_carnivores),
        };
        for animal in residents.iter_mut().chain(incoming.iter_mut()) {
            animal.rebind(params.clone());
        }
    }
}

fn emigrate<R: Rng + ?Sized>(
    residents: &mut Vec<Animal>,
    neighbors: &[(Coordinate, bool); 4],
    rng: &mut R,
    migrants: &mut Vec<Migrant>,
) {
    let destinations: Vec<Option<Coordinate>> = residents
        .iter()
        .map(|animal| {
            let (destination, open) = neighbors[rng.gen_range(0..neighbors.len())];
            (open && rng.gen::<f64>() < animal.migration_probability()).then_some(destination)
        })
        .collect();

    if destinations.iter().all(Option::is_none) {
        return;
    }

    let mut staying = Vec::with_capacity(residents.len());
    for (animal, destination) in residents.drain(..).zip(destinations) {
        match destination {
            Some(destination) => migrants.push(Migrant {
                destination,
                animal,
            }),
            None => staying.push(animal),
        }
    }
    *residents = staying;
}

#[cfg(test)]
mod tests {
    use super::*;
    use biosim_core::SimConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn herds(species: Species, age: u32, weight: f64, count: usize) -> Vec<AnimalDescription> {
        vec![AnimalDescription::new(species, age, weight); count]
    }

    fn populated(terrain: Terrain, herbivores: usize, carnivores: usize) -> Cell {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut cell = Cell::new(terrain);
        let mut pop = herds(Species::Herbivore, 5, 20.0, herbivores);
        pop.extend(herds(Species::Carnivore, 5, 20.0, carnivores));
        cell.add_population(&pop, &SpeciesTable::default(), &mut rng)
            .unwrap();
        cell
    }

    #[test]
    fn test_add_population() {
        let cell = populated(Terrain::Lowland, 3, 2);
        assert_eq!(cell.population(), SpeciesCounts::new(3, 2));
    }

    #[test]
    fn test_add_population_rejects_water_and_unknown_species() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let table = SpeciesTable::default();

        let mut water = Cell::new(Terrain::Water);
        let result = water.add_population(&herds(Species::Herbivore, 1, 10.0, 1), &table, &mut rng);
        assert!(matches!(result, Err(Error::InvalidPlacement(_))));
        assert_eq!(water.population().total(), 0);

        let mut land = Cell::new(Terrain::Desert);
        let mut pop = herds(Species::Herbivore, 1, 10.0, 2);
        pop.push(AnimalDescription {
            species: "Dragon".to_string(),
            age: 1,
            weight: Some(10.0),
        });
        let result = land.add_population(&pop, &table, &mut rng);
        assert!(matches!(result, Err(Error::InvalidPlacement(_))));
        assert_eq!(land.population().total(), 0);
    }

    #[test]
    fn test_grow_resource() {
        let landscape = LandscapeParams::default();
        let mut lowland = Cell::new(Terrain::Lowland);
        lowland.grow_resource(&landscape);
        assert_eq!(lowland.fodder(), Some(800.0));

        let mut highland = Cell::new(Terrain::Highland);
        highland.grow_resource(&landscape);
        assert_eq!(highland.fodder(), Some(500.0));

        let mut desert = Cell::new(Terrain::Desert);
        desert.grow_resource(&landscape);
        assert_eq!(desert.fodder(), Some(0.0));

        let mut water = Cell::new(Terrain::Water);
        water.grow_resource(&landscape);
        assert_eq!(water.fodder(), None);
    }

    #[test]
    fn test_feeding_debits_fodder() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut cell = populated(Terrain::Lowland, 50, 0);
        cell.grow_resource(&LandscapeParams::default());
        cell.feeding_phase(&mut rng);

        // 50 herbivores eating F = 10 each
        assert_eq!(cell.fodder(), Some(300.0));
        for herbivore in cell.residents(Species::Herbivore) {
            assert!((herbivore.weight() - 29.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_feeding_order_follows_fitness() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut cell = Cell::new(Terrain::Highland);
        let pop = vec![
            AnimalDescription::new(Species::Herbivore, 5, 8.0),
            AnimalDescription::new(Species::Herbivore, 5, 30.0),
            AnimalDescription::new(Species::Herbivore, 5, 15.0),
        ];
        cell.add_population(&pop, &SpeciesTable::default(), &mut rng)
            .unwrap();
        let mut landscape = LandscapeParams::default();
        landscape.highland_f_max = 15.0;
        cell.grow_resource(&landscape);
        cell.feeding_phase(&mut rng);

        let weights: Vec<f64> = cell
            .residents(Species::Herbivore)
            .iter()
            .map(Animal::weight)
            .collect();
        // Heaviest eats 10, next eats the remaining 5, lightest gets nothing
        assert!((weights[0] - 39.0).abs() < 1e-12);
        assert!((weights[1] - 19.5).abs() < 1e-12);
        assert!((weights[2] - 8.0).abs() < 1e-12);
        assert_eq!(cell.fodder(), Some(0.0));
    }

    #[test]
    fn test_hunting_removes_prey_once() {
        let mut config = SimConfig::default();
        config.carnivore.delta_phi_max = Some(0.001);
        let table = SpeciesTable::from_config(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let mut cell = Cell::new(Terrain::Desert);
        let mut pop = herds(Species::Herbivore, 60, 10.0, 20);
        pop.extend(herds(Species::Carnivore, 5, 40.0, 3));
        cell.add_population(&pop, &table, &mut rng).unwrap();

        let killed = cell.feeding_phase(&mut rng);
        // Each carnivore eats five 10-weight prey before reaching F = 50
        assert_eq!(killed, 15);
        assert_eq!(cell.population(), SpeciesCounts::new(5, 3));
    }

    #[test]
    fn test_newborns_do_not_breed() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut cell = Cell::new(Terrain::Lowland);
        cell.add_population(
            &herds(Species::Herbivore, 0, 80.0, 30),
            &SpeciesTable::default(),
            &mut rng,
        )
        .unwrap();
        let births = cell.reproduction_phase(&mut rng);
        assert_eq!(births.total(), 0);
        assert_eq!(cell.population().herbivores, 30);
    }

    #[test]
    fn test_reproduction_conserves_biomass() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut cell = Cell::new(Terrain::Lowland);
        cell.add_population(
            &herds(Species::Herbivore, 5, 50.0, 20),
            &SpeciesTable::default(),
            &mut rng,
        )
        .unwrap();
        let mass = |cell: &Cell| -> f64 {
            cell.residents(Species::Herbivore)
                .iter()
                .map(Animal::weight)
                .sum()
        };
        let before = mass(&cell);
        let births = cell.reproduction_phase(&mut rng);

        assert_eq!(births.herbivores, 20);
        assert_eq!(cell.population().herbivores, 40);
        assert!((mass(&cell) - before).abs() < 1e-9);
        let newborns = cell
            .residents(Species::Herbivore)
            .iter()
            .filter(|a| a.age() == 0)
            .count();
        assert_eq!(newborns, 20);
    }

    #[test]
    fn test_migration_blocked_by_water() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut cell = populated(Terrain::Lowland, 50, 10);
        let here = Coordinate::new(2, 2);
        let neighbors = here.neighbors().map(|c| (c, false));
        let migrants = cell.migration_phase(&neighbors, &mut rng);
        assert!(migrants.is_empty());
        assert_eq!(cell.population(), SpeciesCounts::new(50, 10));
    }

    #[test]
    fn test_migration_moves_to_open_neighbors() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut cell = populated(Terrain::Lowland, 400, 0);
        let here = Coordinate::new(2, 2);
        let east = here.step(biosim_core::Direction::East);
        let neighbors = here.neighbors().map(|c| (c, c == east));

        let migrants = cell.migration_phase(&neighbors, &mut rng);
        assert!(!migrants.is_empty());
        assert!(migrants.iter().all(|m| m.destination == east));
        assert_eq!(cell.population().herbivores + migrants.len(), 400);
    }

    #[test]
    fn test_merge_migrants() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut source = populated(Terrain::Lowland, 4, 2);
        let mut target = Cell::new(Terrain::Highland);
        let here = Coordinate::new(2, 2);
        let neighbors = here.neighbors().map(|c| (c, true));

        let mut moved = 0;
        for _ in 0..50 {
            for migrant in source.migration_phase(&neighbors, &mut rng) {
                target.receive_migrant(migrant.animal).unwrap();
                moved += 1;
            }
        }
        assert_eq!(target.population().total(), 0);
        assert_eq!(target.transit_population().total(), moved);

        target.merge_migrants();
        assert_eq!(target.population().total(), moved);
        assert_eq!(target.transit_population().total(), 0);
        assert_eq!(source.population().total() + moved, 6);

        let mut water = Cell::new(Terrain::Water);
        let stray = source
            .residents(Species::Herbivore)
            .first()
            .cloned()
            .or_else(|| target.residents(Species::Herbivore).first().cloned())
            .unwrap();
        assert!(water.receive_migrant(stray).is_err());
    }

    #[test]
    fn test_aging_and_death() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut cell = populated(Terrain::Lowland, 10, 10);
        cell.aging_phase();
        assert!(cell
            .residents(Species::Herbivore)
            .iter()
            .all(|a| a.age() == 6 && (a.weight() - 19.0).abs() < 1e-12));
        assert!(cell
            .residents(Species::Carnivore)
            .iter()
            .all(|a| (a.weight() - 17.5).abs() < 1e-12));

        let before = cell.population().total();
        let deaths = cell.death_phase(&mut rng);
        assert_eq!(deaths.total() + cell.population().total(), before);
    }

    #[test]
    fn test_zero_weight_residents_die() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut cell = Cell::new(Terrain::Lowland);
        cell.add_population(
            &herds(Species::Herbivore, 3, 0.0, 5),
            &SpeciesTable::default(),
            &mut rng,
        )
        .unwrap();
        let deaths = cell.death_phase(&mut rng);
        assert_eq!(deaths.herbivores, 5);
        assert_eq!(cell.population().total(), 0);
    }

    #[test]
    fn test_stats_snapshot() {
        let cell = populated(Terrain::Lowland, 3, 1);
        let stats = cell.stats();
        assert_eq!(stats.counts(), SpeciesCounts::new(3, 1));
        assert_eq!(stats.herbivore.ages, vec![5, 5, 5]);
        assert_eq!(stats.carnivore.weights, vec![20.0]);
    }
}
