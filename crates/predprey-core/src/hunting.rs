//! Nearest-prey kills within each predator's neighborhood.

use crate::grid::{Cell, GridWorld};
use crate::registry::{AgentHandle, AgentId, AgentRegistry, Role};
use crate::{AgentMap, Position};
use predprey_index::{NeighborhoodScan, SquareWindow};
use serde::Serialize;
use tracing::trace;

/// A resolved kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Kill {
    pub predator: AgentId,
    pub prey: AgentId,
    /// Manhattan distance between the two at the time of the kill.
    pub distance: u64,
    /// Cell the prey occupied.
    pub at: Position,
}

/// Let every predator, in registry order, kill at most one prey.
///
/// Each predator scans its window (center excluded, dx ascending then dy
/// ascending) and takes the prey with the smallest Manhattan distance; the
/// first one encountered wins ties. Kills take effect immediately, so a prey
/// eaten by an earlier predator is gone for later ones. The predator gains
/// `health_gained`, rewards move by +1/-1 and the prey is marked done.
pub fn resolve_hunting(
    grid: &mut GridWorld,
    agents: &mut AgentRegistry,
    window: &SquareWindow,
    health_gained: f32,
    rewards: &mut AgentMap<f32>,
    dones: &mut AgentMap<bool>,
) -> Vec<Kill> {
    let mut kills = Vec::new();
    let torus = *grid.torus();

    for predator in agents.handles_by_role(Role::Predator) {
        let Some(center) = agents.get(predator).map(|agent| agent.position) else {
            continue;
        };

        let mut nearest: Option<(u64, AgentHandle, Position)> = None;
        window.scan_ring(&torus, center, &mut |cell| {
            let Cell::Agent(handle) = grid.cell(cell.position) else {
                return;
            };
            let is_prey = agents
                .get(handle)
                .is_some_and(|agent| agent.role == Role::Prey);
            if !is_prey {
                return;
            }
            let distance = cell.manhattan();
            if nearest.is_none_or(|(best, _, _)| distance < best) {
                nearest = Some((distance, handle, cell.position));
            }
        });

        let Some((distance, prey_handle, at)) = nearest else {
            continue;
        };
        let prey = agents
            .remove(prey_handle)
            .expect("grid referenced a prey missing from the registry");
        grid.clear(at);

        let predator_agent = agents
            .get_mut(predator)
            .expect("hunting predator vanished mid-phase");
        predator_agent.health += health_gained;
        let predator_id = predator_agent.id;

        *rewards.entry(predator_id).or_insert(0.0) += 1.0;
        *rewards.entry(prey.id).or_insert(0.0) -= 1.0;
        dones.insert(prey.id, true);
        trace!(predator = %predator_id, prey = %prey.id, distance, "kill");

        kills.push(Kill {
            predator: predator_id,
            prey: prey.id,
            distance,
            at,
        });
    }
    kills
}
