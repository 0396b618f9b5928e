//! Grid simulation engine for predator–prey experience generation.
//!
//! A [`World`] owns a toroidal [`GridWorld`] and an [`AgentRegistry`]. Each
//! call to [`World::step`] resolves one tick: movement, hunting, hunger and
//! spawning, then observation encoding. Actions come from an external policy;
//! the engine only reports observations, rewards and termination flags back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod config;
pub mod error;
pub mod grid;
pub mod hunting;
pub mod movement;
pub mod observation;
pub mod population;
pub mod registry;
pub mod summary;
pub mod world;

pub use config::{SimConfig, TraitRange, Variant};
pub use error::{PlacementTarget, WorldError};
pub use grid::{Cell, GridWorld};
pub use hunting::{Kill, resolve_hunting};
pub use movement::{Action, ActionCode, MovementOutcome, resolve_movement};
pub use observation::{Channel, Observation, ObservationEncoder};
pub use population::{Births, apply_growth, apply_hunger, growth_for, spawn_at_random};
pub use predprey_index::{SquareWindow, Torus};
pub use registry::{
    Agent, AgentHandle, AgentId, AgentRegistry, HandleMap, ParseAgentIdError, Role, Traits,
};
pub use summary::{PopulationStats, TickReport, TickSummary, TraitMeans};
pub use world::{InvariantViolation, StepOutcome, World};

/// Per-agent results keyed by external id, ordered for reproducible iteration.
pub type AgentMap<T> = BTreeMap<AgentId, T>;

/// Grid coordinate `(x, y)`; `x` runs along `width`, `y` along `height`.
pub type Position = (usize, usize);

/// Simulation clock (ticks processed since the last reset).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the tick counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}
