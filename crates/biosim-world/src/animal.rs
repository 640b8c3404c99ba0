//! Individual animals and their yearly behaviour.

use biosim_core::{AnimalDescription, Error, Result, SimConfig, Species, SpeciesParams};
use rand::Rng;
use rand_distr::StandardNormal;
use std::sync::Arc;

/// Shared parameter records, one per species
#[derive(Debug, Clone)]
pub struct SpeciesTable {
    herbivore: Arc<SpeciesParams>,
    carnivore: Arc<SpeciesParams>,
}

impl SpeciesTable {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            herbivore: Arc::new(config.herbivore.clone()),
            carnivore: Arc::new(config.carnivore.clone()),
        }
    }

    pub fn get(&self, species: Species) -> &Arc<SpeciesParams> {
        match species {
            Species::Herbivore => &self.herbivore,
            Species::Carnivore => &self.carnivore,
        }
    }

    pub fn set(&mut self, species: Species, params: SpeciesParams) {
        let slot = match species {
            Species::Herbivore => &mut self.herbivore,
            Species::Carnivore => &mut self.carnivore,
        };
        *slot = Arc::new(params);
    }
}

impl Default for SpeciesTable {
    fn default() -> Self {
        Self::from_config(&SimConfig::default())
    }
}

/// Prey a predator brought down during one hunt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HuntOutcome {
    /// Positions of the killed prey in the sequence handed to [`Animal::hunt`]
    pub killed: Vec<usize>,
    /// Prey weight eaten, never above the predator's yearly intake
    pub consumed: f64,
}

/// An animal on the island.
///
/// Fitness is cached and recomputed on every age or weight change, so the
/// state fields are only reachable through accessors.
#[derive(Debug, Clone)]
pub struct Animal {
    species: Species,
    params: Arc<SpeciesParams>,
    age: u32,
    weight: f64,
    fitness: f64,
}

impl Animal {
    pub fn new(species: Species, params: Arc<SpeciesParams>, age: u32, weight: f64) -> Self {
        let mut animal = Self {
            species,
            params,
            age,
            weight: weight.max(0.0),
            fitness: 0.0,
        };
        animal.compute_fitness();
        animal
    }

    /// Age-zero animal with a weight drawn from the species birth distribution.
    ///
    /// The draw is unclamped; callers decide what to do with a non-positive
    /// weight.
    pub(crate) fn newborn<R: Rng + ?Sized>(species: Species, params: Arc<SpeciesParams>, rng: &mut R) -> Self {
        let z: f64 = rng.sample(StandardNormal);
        let weight = params.w_birth + params.sigma_birth * z;
        let mut animal = Self {
            species,
            params,
            age: 0,
            weight,
            fitness: 0.0,
        };
        animal.compute_fitness();
        animal
    }

    /// Build an animal from a population description.
    pub fn from_description<R: Rng + ?Sized>(
        description: &AnimalDescription,
        table: &SpeciesTable,
        rng: &mut R,
    ) -> Result<Self> {
        let species = Species::from_name(&description.species).ok_or_else(|| {
            Error::InvalidPlacement(format!("Unknown species: {:?}", description.species))
        })?;
        let params = table.get(species).clone();

        match description.weight {
            Some(weight) if !weight.is_finite() || weight < 0.0 => Err(Error::Validation(format!(
                "{} weight must be a non-negative number, got {}",
                species, weight
            ))),
            Some(weight) => Ok(Self::new(species, params, description.age, weight)),
            None => {
                let mut animal = Self::newborn(species, params, rng);
                animal.weight = animal.weight.max(0.0);
                animal.age = description.age;
                animal.compute_fitness();
                Ok(animal)
            }
        }
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn params(&self) -> &SpeciesParams {
        &self.params
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Switch to a new parameter record and refresh fitness.
    pub fn rebind(&mut self, params: Arc<SpeciesParams>) {
        self.params = params;
        self.compute_fitness();
    }

    /// Recompute the cached fitness from age and weight.
    ///
    /// Φ = 1/(1+e^{φ_age(a−a½)}) · 1/(1+e^{−φ_w(w−w½)}), zero when w ≤ 0.
    pub fn compute_fitness(&mut self) -> f64 {
        self.fitness = fitness_of(&self.params, self.age, self.weight);
        self.fitness
    }

    pub fn age_one_year(&mut self) {
        self.age += 1;
        self.weight -= self.weight * self.params.eta;
        self.compute_fitness();
    }

    pub fn migration_probability(&self) -> f64 {
        (self.params.mu * self.fitness).clamp(0.0, 1.0)
    }

    /// Graze from `available` fodder and return the amount eaten.
    ///
    /// Carnivores do not graze and always eat nothing.
    pub fn feed(&mut self, available: f64) -> f64 {
        match self.species {
            Species::Herbivore => {
                let eaten = available.max(0.0).min(self.params.f);
                self.weight += self.params.beta * eaten;
                self.compute_fitness();
                eaten
            }
            Species::Carnivore => 0.0,
        }
    }

    /// Hunt through `prey` in the given order.
    ///
    /// Stops as soon as the yearly intake `F` is reached. Herbivores never
    /// hunt and return an empty outcome.
    pub fn hunt<'a, R, I>(&mut self, prey: I, rng: &mut R) -> HuntOutcome
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = (usize, &'a Animal)>,
    {
        let mut outcome = HuntOutcome::default();
        let delta_phi_max = match (self.species, self.params.delta_phi_max) {
            (Species::Carnivore, Some(delta)) => delta,
            _ => return outcome,
        };
        let appetite = self.params.f;

        for (index, victim) in prey {
            if outcome.consumed >= appetite {
                break;
            }

            let gap = self.fitness - victim.fitness;
            if gap <= 0.0 {
                continue;
            }

            let caught = gap >= delta_phi_max || rng.gen::<f64>() < gap / delta_phi_max;
            if caught {
                let portion = (appetite - outcome.consumed).min(victim.weight);
                self.weight += self.params.beta * portion;
                self.compute_fitness();
                outcome.consumed += portion;
                outcome.killed.push(index);
            }
        }

        outcome
    }

    /// Try to give birth given `candidates` breeding animals of this species
    /// in the cell (this animal included).
    ///
    /// The birth draw is always taken. On success the mother loses the
    /// newborn's weight.
    pub fn attempt_reproduce<R: Rng + ?Sized>(&mut self, candidates: usize, rng: &mut R) -> Option<Animal> {
        let others = candidates.saturating_sub(1) as f64;
        let probability = (self.params.gamma * self.fitness * others).min(1.0);
        if rng.gen::<f64>() >= probability {
            return None;
        }
        if self.weight < self.params.birth_weight_threshold() {
            return None;
        }

        let newborn = Animal::newborn(self.species, self.params.clone(), rng);
        if newborn.weight <= 0.0 || newborn.weight > self.weight {
            return None;
        }

        self.weight -= newborn.weight;
        self.compute_fitness();
        Some(newborn)
    }

    /// Death check. Zero weight is fatal without a draw.
    pub fn attempt_die<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        if self.weight <= 0.0 {
            return true;
        }
        rng.gen::<f64>() < self.params.omega * (1.0 - self.fitness)
    }
}

fn fitness_of(params: &SpeciesParams, age: u32, weight: f64) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    let age_term = 1.0 / (1.0 + (params.phi_age * (age as f64 - params.a_half)).exp());
    let weight_term = 1.0 / (1.0 + (-params.phi_weight * (weight - params.w_half)).exp());
    age_term * weight_term
}

#[cfg(test)]
mod tests {
    use super::*;
    use biosim_core::SpeciesParamsUpdate;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn herbivore(age: u32, weight: f64) -> Animal {
        Animal::new(Species::Herbivore, Arc::new(SpeciesParams::herbivore()), age, weight)
    }

    fn carnivore_with(update: SpeciesParamsUpdate, age: u32, weight: f64) -> Animal {
        let mut params = SpeciesParams::carnivore();
        params.apply(Species::Carnivore, &update).unwrap();
        Animal::new(Species::Carnivore, Arc::new(params), age, weight)
    }

    #[test]
    fn test_fitness_formula() {
        let animal = herbivore(40, 10.0);
        // Both sigmoids sit at their half-points
        assert!((animal.fitness() - 0.25).abs() < 1e-12);

        assert_eq!(herbivore(5, 0.0).fitness(), 0.0);
    }

    #[test]
    fn test_fitness_monotonicity() {
        assert!(herbivore(10, 20.0).fitness() < herbivore(10, 30.0).fitness());
        assert!(herbivore(10, 20.0).fitness() > herbivore(30, 20.0).fitness());
    }

    #[test]
    fn test_age_one_year() {
        let mut animal = herbivore(5, 20.0);
        let before = animal.fitness();
        animal.age_one_year();
        assert_eq!(animal.age(), 6);
        assert!((animal.weight() - 19.0).abs() < 1e-12);
        assert!(animal.fitness() < before);
    }

    #[test]
    fn test_feed_scenario() {
        let mut animal = herbivore(5, 20.0);
        let before = animal.fitness();
        let eaten = animal.feed(10.0);
        assert_eq!(eaten, 10.0);
        assert!((animal.weight() - (20.0 + 0.9 * 10.0)).abs() < 1e-12);
        assert!(animal.fitness() > before);
    }

    #[test]
    fn test_feed_limited_by_appetite_and_supply() {
        let mut animal = herbivore(5, 20.0);
        assert_eq!(animal.feed(500.0), 10.0);
        assert_eq!(animal.feed(3.0), 3.0);
        assert_eq!(animal.feed(0.0), 0.0);

        let mut carnivore = carnivore_with(SpeciesParamsUpdate::default(), 5, 20.0);
        assert_eq!(carnivore.feed(100.0), 0.0);
        assert_eq!(carnivore.weight(), 20.0);
    }

    #[test]
    fn test_migration_probability() {
        let animal = herbivore(5, 20.0);
        assert!((animal.migration_probability() - 0.25 * animal.fitness()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weight_always_dies() {
        let animal = herbivore(3, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(animal.attempt_die(&mut rng));
        }
    }

    #[test]
    fn test_no_death_without_death_rate() {
        let mut params = SpeciesParams::herbivore();
        params.omega = 0.0;
        let animal = Animal::new(Species::Herbivore, Arc::new(params), 80, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..100 {
            assert!(!animal.attempt_die(&mut rng));
        }
    }

    #[test]
    fn test_reproduction_transfers_weight() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut mother = herbivore(5, 50.0);
        let newborn = mother
            .attempt_reproduce(10, &mut rng)
            .expect("birth probability is one and the mother is heavy enough");

        assert_eq!(newborn.age(), 0);
        assert_eq!(newborn.species(), Species::Herbivore);
        assert!(newborn.weight() > 0.0);
        assert!((mother.weight() + newborn.weight() - 50.0).abs() < 1e-9);
        assert!((mother.fitness() - fitness_of(mother.params(), 5, mother.weight())).abs() < 1e-15);
    }

    #[test]
    fn test_reproduction_gates() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        // Below zeta * (w_birth + sigma_birth) = 33.25
        let mut light = herbivore(5, 30.0);
        for _ in 0..50 {
            assert!(light.attempt_reproduce(100, &mut rng).is_none());
        }
        assert_eq!(light.weight(), 30.0);

        // Alone in the cell: probability is zero
        let mut lonely = herbivore(5, 80.0);
        for _ in 0..50 {
            assert!(lonely.attempt_reproduce(1, &mut rng).is_none());
        }
        assert_eq!(lonely.weight(), 80.0);
    }

    #[test]
    fn test_offspring_heavier_than_mother_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut params = SpeciesParams::herbivore();
        params
            .apply(
                Species::Herbivore,
                &SpeciesParamsUpdate {
                    zeta: Some(0.0),
                    gamma: Some(10.0),
                    ..Default::default()
                },
            )
            .unwrap();
        let mut mother = Animal::new(Species::Herbivore, Arc::new(params), 5, 1.0);
        let fitness = mother.fitness();

        // Both gates pass; the drawn offspring (mean 8) outweighs the mother
        for _ in 0..50 {
            assert!(mother.attempt_reproduce(10, &mut rng).is_none());
        }
        assert_eq!(mother.weight(), 1.0);
        assert_eq!(mother.fitness(), fitness);
    }

    #[test]
    fn test_predator_kills_until_full() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut predator = carnivore_with(
            SpeciesParamsUpdate {
                delta_phi_max: Some(0.01),
                ..Default::default()
            },
            5,
            50.0,
        );
        let prey: Vec<Animal> = (0..5).map(|_| herbivore(60, 20.0)).collect();
        assert!(predator.fitness() - prey[0].fitness() > 0.01);

        let outcome = predator.hunt(prey.iter().enumerate(), &mut rng);

        // 20 + 20 + 10 reaches F = 50
        assert_eq!(outcome.killed, vec![0, 1, 2]);
        assert!((outcome.consumed - 50.0).abs() < 1e-12);
        assert!(outcome.consumed <= predator.params().f);
        assert!((predator.weight() - (50.0 + 0.75 * 50.0)).abs() < 1e-9);
    }

    #[test]
    fn test_predator_ignores_fitter_prey() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut predator = carnivore_with(SpeciesParamsUpdate::default(), 80, 2.0);
        let prey: Vec<Animal> = (0..5).map(|_| herbivore(2, 40.0)).collect();
        assert!(predator.fitness() < prey[0].fitness());

        let outcome = predator.hunt(prey.iter().enumerate(), &mut rng);
        assert!(outcome.killed.is_empty());
        assert_eq!(outcome.consumed, 0.0);
        assert_eq!(predator.weight(), 2.0);
    }

    #[test]
    fn test_herbivore_does_not_hunt() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut grazer = herbivore(5, 50.0);
        let prey = vec![herbivore(60, 5.0)];
        let outcome = grazer.hunt(prey.iter().enumerate(), &mut rng);
        assert!(outcome.killed.is_empty());
    }

    #[test]
    fn test_from_description() {
        let table = SpeciesTable::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let animal = Animal::from_description(
            &AnimalDescription::new(Species::Carnivore, 5, 20.0),
            &table,
            &mut rng,
        )
        .unwrap();
        assert_eq!(animal.species(), Species::Carnivore);
        assert_eq!(animal.age(), 5);

        let unknown = AnimalDescription {
            species: "Omnivore".to_string(),
            age: 1,
            weight: Some(10.0),
        };
        assert!(matches!(
            Animal::from_description(&unknown, &table, &mut rng),
            Err(Error::InvalidPlacement(_))
        ));

        let negative = AnimalDescription::new(Species::Herbivore, 1, -3.0);
        assert!(matches!(
            Animal::from_description(&negative, &table, &mut rng),
            Err(Error::Validation(_))
        ));

        let drawn = AnimalDescription {
            species: "Herbivore".to_string(),
            age: 2,
            weight: None,
        };
        let animal = Animal::from_description(&drawn, &table, &mut rng).unwrap();
        assert_eq!(animal.age(), 2);
        assert!(animal.weight() >= 0.0);
    }

    #[test]
    fn test_rebind_refreshes_fitness() {
        let mut animal = herbivore(5, 20.0);
        let before = animal.fitness();
        let mut params = SpeciesParams::herbivore();
        params.w_half = 40.0;
        animal.rebind(Arc::new(params));
        assert!(animal.fitness() < before);
    }

    proptest! {
        #[test]
        fn prop_fitness_is_pure_and_bounded(age in 0u32..200, weight in 0.0f64..500.0) {
            let mut animal = herbivore(age, weight);
            let first = animal.compute_fitness();
            let second = animal.compute_fitness();
            prop_assert_eq!(first, second);
            prop_assert!((0.0..=1.0).contains(&first));
        }

        #[test]
        fn prop_weight_stays_non_negative(
            weight in 0.0f64..200.0,
            meals in proptest::collection::vec(0.0f64..50.0, 0..10),
            years in 0usize..30,
        ) {
            let mut animal = herbivore(1, weight);
            for fodder in meals {
                animal.feed(fodder);
                prop_assert!(animal.weight() >= 0.0);
            }
            for _ in 0..years {
                animal.age_one_year();
                prop_assert!(animal.weight() >= 0.0);
            }
        }
    }
}
