//! Hunger decay, starvation, and per-tick population growth.

use crate::config::{SimConfig, TraitRange};
use crate::error::{PlacementTarget, WorldError};
use crate::grid::GridWorld;
use crate::registry::{AgentHandle, AgentId, AgentRegistry, Role, Traits};
use crate::AgentMap;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Agents added by one growth phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Births {
    pub predators: usize,
    pub prey: usize,
}

impl Births {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.predators + self.prey
    }
}

/// Drain `decrement` health from every predator and remove the starved.
/// Prey do not go hungry.
pub fn apply_hunger(
    grid: &mut GridWorld,
    agents: &mut AgentRegistry,
    decrement: f32,
    dones: &mut AgentMap<bool>,
) -> Vec<AgentId> {
    let mut starved = Vec::new();
    for handle in agents.handles_by_role(Role::Predator) {
        let Some(agent) = agents.get_mut(handle) else {
            continue;
        };
        agent.health -= decrement;
        if agent.health > 0.0 {
            continue;
        }
        let agent = agents
            .remove(handle)
            .expect("starved predator missing from registry");
        grid.clear(agent.position);
        dones.insert(agent.id, true);
        trace!(id = %agent.id, "predator starved");
        starved.push(agent.id);
    }
    starved
}

/// Newcomers for a role with `count` live members.
///
/// At least one agent is added whenever the role is under its cap, even when
/// `count * p` rounds to zero, and growth never pushes the role past `max`.
#[must_use]
pub fn growth_for(count: usize, max: usize, p: f64) -> usize {
    if count >= max {
        return 0;
    }
    let scaled = (count as f64 * p).ceil();
    let raw = if scaled.is_finite() && scaled > 0.0 {
        scaled as usize
    } else {
        0
    };
    raw.max(1).min(max - count)
}

/// Place one agent of `role` on a uniformly random empty cell.
pub fn spawn_at_random(
    grid: &mut GridWorld,
    agents: &mut AgentRegistry,
    rng: &mut dyn RngCore,
    role: Role,
    config: &SimConfig,
) -> Result<AgentHandle, WorldError> {
    let position = grid.random_empty_cell(
        rng,
        config.placement_attempts,
        PlacementTarget::Agent(role),
    )?;
    let traits = config
        .variant
        .has_traits()
        .then(|| sample_traits(rng, config.trait_range));
    let handle = agents.spawn(role, position, config.initial_health, traits);
    grid.place(handle, position);
    Ok(handle)
}

/// Grow both roles: predators first, then prey, counts taken up front.
pub fn apply_growth(
    grid: &mut GridWorld,
    agents: &mut AgentRegistry,
    rng: &mut dyn RngCore,
    config: &SimConfig,
) -> Result<Births, WorldError> {
    let births = Births {
        predators: growth_for(
            agents.count(Role::Predator),
            config.max_predators,
            config.p_predator,
        ),
        prey: growth_for(agents.count(Role::Prey), config.max_prey, config.p_prey),
    };
    for _ in 0..births.predators {
        spawn_at_random(grid, agents, rng, Role::Predator, config)?;
    }
    for _ in 0..births.prey {
        spawn_at_random(grid, agents, rng, Role::Prey, config)?;
    }
    Ok(births)
}

fn sample_traits(rng: &mut dyn RngCore, range: TraitRange) -> Traits {
    let mut draw = || {
        if range.max > range.min {
            rng.random_range(range.min..range.max)
        } else {
            range.min
        }
    };
    Traits {
        attack: draw(),
        speed: draw(),
        resilience: draw(),
    }
}
