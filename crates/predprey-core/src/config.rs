use crate::error::WorldError;
use predprey_index::{SquareWindow, Torus};
use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

/// Observation/trait layout of the simulated population.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Wall, predator, prey and health channels.
    #[default]
    Base,
    /// Base channels plus per-agent attack, speed and resilience traits.
    Extended,
}

impl Variant {
    /// Number of observation channels produced for this variant.
    #[must_use]
    pub const fn channel_count(self) -> usize {
        match self {
            Variant::Base => 4,
            Variant::Extended => 7,
        }
    }

    #[must_use]
    pub const fn has_traits(self) -> bool {
        matches!(self, Variant::Extended)
    }
}

/// Uniform sampling range for extended traits.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TraitRange {
    pub min: f32,
    pub max: f32,
}

impl Default for TraitRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Grid extent along x (number of rows in the textual dump).
    pub width: usize,
    /// Grid extent along y.
    pub height: usize,
    /// Predators placed at reset.
    pub initial_predators: usize,
    /// Prey placed at reset.
    pub initial_prey: usize,
    /// Walls placed at reset; fixed for the episode.
    pub wall_count: usize,
    /// Radius of both the hunting neighborhood and the observation window.
    pub scope: usize,
    /// Health a predator gains per kill.
    pub health_gained: f32,
    /// Health removed from every predator each tick.
    pub hunger_decrement: f32,
    /// Health assigned to newly created agents.
    pub initial_health: f32,
    /// Population cap for predators.
    pub max_predators: usize,
    /// Population cap for prey.
    pub max_prey: usize,
    /// Per-tick growth factor for predators.
    pub p_predator: f64,
    /// Per-tick growth factor for prey.
    pub p_prey: f64,
    pub variant: Variant,
    /// Range sampled for attack, speed and resilience in the extended variant.
    pub trait_range: TraitRange,
    /// Random draws allowed per placement before giving up.
    pub placement_attempts: u32,
    /// Number of tick summaries retained; 0 disables history.
    pub history_capacity: usize,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 15,
            height: 15,
            initial_predators: 2,
            initial_prey: 3,
            wall_count: 5,
            scope: 2,
            health_gained: 0.3,
            hunger_decrement: 0.01,
            initial_health: 1.0,
            max_predators: 10_000,
            max_prey: 10_000,
            p_predator: 0.003,
            p_prey: 0.006,
            variant: Variant::Base,
            trait_range: TraitRange::default(),
            placement_attempts: 1_024,
            history_capacity: 256,
            rng_seed: None,
        }
    }
}

impl SimConfig {
    /// Checks every parameter, returning the first violation.
    pub fn validate(&self) -> Result<(), WorldError> {
        let torus = self.torus()?;
        self.window()?;
        let initial = self
            .wall_count
            .checked_add(self.initial_predators)
            .and_then(|n| n.checked_add(self.initial_prey))
            .ok_or(WorldError::InvalidConfig("initial population overflows usize"))?;
        if initial > torus.area() {
            return Err(WorldError::InvalidConfig(
                "walls plus initial agents exceed the number of grid cells",
            ));
        }
        if self.initial_predators > self.max_predators || self.initial_prey > self.max_prey {
            return Err(WorldError::InvalidConfig(
                "initial population cannot exceed its maximum",
            ));
        }
        if !self.health_gained.is_finite() || self.health_gained < 0.0 {
            return Err(WorldError::InvalidConfig(
                "health_gained must be finite and non-negative",
            ));
        }
        if !self.hunger_decrement.is_finite() || self.hunger_decrement <= 0.0 {
            return Err(WorldError::InvalidConfig(
                "hunger_decrement must be finite and positive",
            ));
        }
        if !self.initial_health.is_finite() || self.initial_health <= 0.0 {
            return Err(WorldError::InvalidConfig(
                "initial_health must be finite and positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.p_predator) || !(0.0..=1.0).contains(&self.p_prey) {
            return Err(WorldError::InvalidConfig(
                "growth probabilities must lie in [0, 1]",
            ));
        }
        let TraitRange { min, max } = self.trait_range;
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(WorldError::InvalidConfig(
                "trait_range must be finite with min <= max",
            ));
        }
        if self.placement_attempts == 0 {
            return Err(WorldError::InvalidConfig(
                "placement_attempts must be non-zero",
            ));
        }
        Ok(())
    }

    pub fn torus(&self) -> Result<Torus, WorldError> {
        Ok(Torus::new(self.width, self.height)?)
    }

    pub fn window(&self) -> Result<SquareWindow, WorldError> {
        Ok(SquareWindow::new(self.scope)?)
    }

    /// Returns the configured RNG, generating a seed from entropy if absent.
    pub(crate) fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{ "width": 40, "height": 30, "variant": "extended", "rng_seed": 7 }"#;
        let cfg: SimConfig = serde_json::from_str(json).expect("partial config should parse");
        assert_eq!(cfg.width, 40);
        assert_eq!(cfg.height, 30);
        assert_eq!(cfg.variant, Variant::Extended);
        assert_eq!(cfg.rng_seed, Some(7));
        assert_eq!(cfg.scope, SimConfig::default().scope);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_zero_scope() {
        let cfg = SimConfig {
            scope: 0,
            ..SimConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(WorldError::InvalidConfig("scope must be at least 1"))
        );
    }

    #[test]
    fn rejects_overfull_grid() {
        let cfg = SimConfig {
            width: 3,
            height: 3,
            wall_count: 5,
            initial_predators: 2,
            initial_prey: 3,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(WorldError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_growth() {
        let cfg = SimConfig {
            p_prey: 1.5,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = SimConfig {
            p_predator: f64::NAN,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_hunger_and_attempts() {
        let cfg = SimConfig {
            hunger_decrement: 0.0,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = SimConfig {
            placement_attempts: 0,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn variant_channel_counts() {
        assert_eq!(Variant::Base.channel_count(), 4);
        assert_eq!(Variant::Extended.channel_count(), 7);
        assert!(!Variant::Base.has_traits());
    }
}
