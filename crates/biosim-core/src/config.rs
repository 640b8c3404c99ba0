//! Configuration types for the simulation.

use crate::error::{Error, Result};
use crate::types::{Species, Terrain};
use serde::{Deserialize, Deserializer, Serialize};

/// Behavioural constants shared by every animal of one species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesParams {
    /// Mean birth weight
    pub w_birth: f64,
    /// Standard deviation of birth weight
    pub sigma_birth: f64,
    /// Fraction of eaten food converted to weight
    pub beta: f64,
    /// Fraction of weight lost per year of aging
    pub eta: f64,
    /// Age at which the age fitness term is one half
    pub a_half: f64,
    /// Steepness of the age fitness term
    pub phi_age: f64,
    /// Weight at which the weight fitness term is one half
    pub w_half: f64,
    /// Steepness of the weight fitness term
    pub phi_weight: f64,
    /// Migration propensity
    pub mu: f64,
    /// Reproduction propensity
    pub gamma: f64,
    /// Birth weight safety multiplier
    pub zeta: f64,
    /// Death rate
    pub omega: f64,
    /// Maximum intake per year
    #[serde(rename = "F")]
    pub f: f64,
    /// Maximum fitness advantage over prey (predators only)
    #[serde(rename = "DeltaPhiMax", default, skip_serializing_if = "Option::is_none")]
    pub delta_phi_max: Option<f64>,
}

impl SpeciesParams {
    pub fn herbivore() -> Self {
        Self {
            w_birth: 8.0,
            sigma_birth: 1.5,
            beta: 0.9,
            eta: 0.05,
            a_half: 40.0,
            phi_age: 0.6,
            w_half: 10.0,
            phi_weight: 0.1,
            mu: 0.25,
            gamma: 0.2,
            zeta: 3.5,
            omega: 0.4,
            f: 10.0,
            delta_phi_max: None,
        }
    }

    pub fn carnivore() -> Self {
        Self {
            w_birth: 6.0,
            sigma_birth: 1.0,
            beta: 0.75,
            eta: 0.125,
            a_half: 40.0,
            phi_age: 0.3,
            w_half: 4.0,
            phi_weight: 0.4,
            mu: 0.4,
            gamma: 0.8,
            zeta: 3.5,
            omega: 0.8,
            f: 50.0,
            delta_phi_max: Some(10.0),
        }
    }

    pub fn for_species(species: Species) -> Self {
        match species {
            Species::Herbivore => Self::herbivore(),
            Species::Carnivore => Self::carnivore(),
        }
    }

    /// Minimum weight an animal must have before it may give birth
    pub fn birth_weight_threshold(&self) -> f64 {
        self.zeta * (self.w_birth + self.sigma_birth)
    }

    /// Overwrite every field set in `update`, then validate the result.
    pub fn apply(&mut self, species: Species, update: &SpeciesParamsUpdate) -> Result<()> {
        let mut next = self.clone();
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = update.$field {
                    next.$field = value;
                })*
            };
        }
        merge!(w_birth, sigma_birth, beta, eta, a_half, phi_age, w_half, phi_weight, mu, gamma, zeta, omega, f);

        if let Some(value) = update.delta_phi_max {
            if species != Species::Carnivore {
                return Err(Error::Validation(format!(
                    "DeltaPhiMax is not a parameter of {}",
                    species
                )));
            }
            next.delta_phi_max = Some(value);
        }

        next.validate(species)?;
        *self = next;
        Ok(())
    }

    pub fn validate(&self, species: Species) -> Result<()> {
        let fields = [
            ("w_birth", self.w_birth),
            ("sigma_birth", self.sigma_birth),
            ("beta", self.beta),
            ("eta", self.eta),
            ("a_half", self.a_half),
            ("phi_age", self.phi_age),
            ("w_half", self.w_half),
            ("phi_weight", self.phi_weight),
            ("mu", self.mu),
            ("gamma", self.gamma),
            ("zeta", self.zeta),
            ("omega", self.omega),
            ("F", self.f),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(Error::Validation(format!(
                    "{} parameter {} must be finite, got {}",
                    species, name, value
                )));
            }
        }

        let non_negative = [
            ("w_birth", self.w_birth),
            ("sigma_birth", self.sigma_birth),
            ("beta", self.beta),
            ("phi_age", self.phi_age),
            ("phi_weight", self.phi_weight),
            ("mu", self.mu),
            ("gamma", self.gamma),
            ("zeta", self.zeta),
            ("omega", self.omega),
            ("F", self.f),
        ];
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(Error::Validation(format!(
                    "{} parameter {} must be non-negative, got {}",
                    species, name, value
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.eta) {
            return Err(Error::Validation(format!(
                "{} parameter eta must lie in [0, 1], got {}",
                species, self.eta
            )));
        }

        match (species, self.delta_phi_max) {
            (Species::Carnivore, Some(d)) if d.is_finite() && d > 0.0 => Ok(()),
            (Species::Carnivore, Some(d)) => Err(Error::Validation(format!(
                "Carnivore parameter DeltaPhiMax must be positive, got {}",
                d
            ))),
            (Species::Carnivore, None) => Err(Error::Validation(
                "Carnivore requires DeltaPhiMax".to_string(),
            )),
            (Species::Herbivore, Some(_)) => Err(Error::Validation(
                "DeltaPhiMax is not a parameter of Herbivore".to_string(),
            )),
            (Species::Herbivore, None) => Ok(()),
        }
    }
}

/// Partial override of [`SpeciesParams`]; unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesParamsUpdate {
    pub w_birth: Option<f64>,
    pub sigma_birth: Option<f64>,
    pub beta: Option<f64>,
    pub eta: Option<f64>,
    pub a_half: Option<f64>,
    pub phi_age: Option<f64>,
    pub w_half: Option<f64>,
    pub phi_weight: Option<f64>,
    pub mu: Option<f64>,
    pub gamma: Option<f64>,
    pub zeta: Option<f64>,
    pub omega: Option<f64>,
    #[serde(rename = "F")]
    pub f: Option<f64>,
    #[serde(rename = "DeltaPhiMax")]
    pub delta_phi_max: Option<f64>,
}

/// Fodder maxima per landscape type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandscapeParams {
    /// Fodder regrown on lowland each year
    pub lowland_f_max: f64,
    /// Fodder regrown on highland each year
    pub highland_f_max: f64,
}

impl Default for LandscapeParams {
    fn default() -> Self {
        Self {
            lowland_f_max: 800.0,
            highland_f_max: 500.0,
        }
    }
}

impl LandscapeParams {
    /// Yearly fodder for a terrain; `None` for water, which holds no fodder.
    pub fn f_max(&self, terrain: Terrain) -> Option<f64> {
        match terrain {
            Terrain::Lowland => Some(self.lowland_f_max),
            Terrain::Highland => Some(self.highland_f_max),
            Terrain::Desert => Some(0.0),
            Terrain::Water => None,
        }
    }

    /// Apply an override for the landscape with letter `code`.
    ///
    /// Only lowland and highland carry a tunable fodder maximum.
    pub fn apply(&mut self, code: &str, update: &LandscapeParamsUpdate) -> Result<()> {
        let terrain = single_char(code).and_then(Terrain::from_code);
        let slot = match terrain {
            Some(Terrain::Lowland) => &mut self.lowland_f_max,
            Some(Terrain::Highland) => &mut self.highland_f_max,
            _ => {
                return Err(Error::Validation(format!(
                    "Unknown or unsupported landscape type: {:?}",
                    code
                )))
            }
        };

        if let Some(f_max) = update.f_max {
            if !f_max.is_finite() || f_max < 0.0 {
                return Err(Error::Validation(format!(
                    "f_max must be a non-negative number, got {}",
                    f_max
                )));
            }
            *slot = f_max;
        }
        Ok(())
    }
}

fn single_char(code: &str) -> Option<char> {
    let mut chars = code.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LandscapeParamsUpdate {
    pub f_max: Option<f64>,
}

/// Simulation configuration
///
/// Species records may be partial; missing fields take the species defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    #[serde(deserialize_with = "herbivore_params")]
    pub herbivore: SpeciesParams,
    #[serde(deserialize_with = "carnivore_params")]
    pub carnivore: SpeciesParams,
    pub landscape: LandscapeParams,
    /// Years between summary log lines
    pub report_interval: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            herbivore: SpeciesParams::herbivore(),
            carnivore: SpeciesParams::carnivore(),
            landscape: LandscapeParams::default(),
            report_interval: 10,
        }
    }
}

impl SimConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    pub fn species(&self, species: Species) -> &SpeciesParams {
        match species {
            Species::Herbivore => &self.herbivore,
            Species::Carnivore => &self.carnivore,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.herbivore.validate(Species::Herbivore)?;
        self.carnivore.validate(Species::Carnivore)?;
        for terrain in [Terrain::Lowland, Terrain::Highland] {
            match self.landscape.f_max(terrain) {
                Some(f_max) if f_max.is_finite() && f_max >= 0.0 => {}
                other => {
                    return Err(Error::Validation(format!(
                        "f_max for {:?} must be a non-negative number, got {:?}",
                        terrain, other
                    )))
                }
            }
        }
        Ok(())
    }
}

fn herbivore_params<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<SpeciesParams, D::Error> {
    params_over_defaults(deserializer, Species::Herbivore)
}

fn carnivore_params<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<SpeciesParams, D::Error> {
    params_over_defaults(deserializer, Species::Carnivore)
}

fn params_over_defaults<'de, D: Deserializer<'de>>(
    deserializer: D,
    species: Species,
) -> std::result::Result<SpeciesParams, D::Error> {
    let update = SpeciesParamsUpdate::deserialize(deserializer)?;
    let mut params = SpeciesParams::for_species(species);
    params
        .apply(species, &update)
        .map_err(serde::de::Error::custom)?;
    Ok(params)
}
