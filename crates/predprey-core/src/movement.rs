//! Discrete movement against a pre-tick occupancy snapshot.

use crate::grid::{Cell, GridWorld};
use crate::registry::{AgentHandle, AgentRegistry, HandleMap};
use crate::{AgentMap, Position};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Raw action code supplied by the external policy.
pub type ActionCode = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    Stay,
    /// x - 1
    Up,
    /// x + 1
    Down,
    /// y - 1
    Left,
    /// y + 1
    Right,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Stay,
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
    ];

    /// Decode an external action code; `None` for unrecognised codes.
    #[must_use]
    pub const fn from_code(code: ActionCode) -> Option<Self> {
        match code {
            0 => Some(Action::Stay),
            1 => Some(Action::Up),
            2 => Some(Action::Down),
            3 => Some(Action::Left),
            4 => Some(Action::Right),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(self) -> ActionCode {
        match self {
            Action::Stay => 0,
            Action::Up => 1,
            Action::Down => 2,
            Action::Left => 3,
            Action::Right => 4,
        }
    }

    #[must_use]
    pub const fn delta(self) -> (i64, i64) {
        match self {
            Action::Stay => (0, 0),
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
            Action::Right => (0, 1),
        }
    }
}

/// Counters produced by one movement phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementOutcome {
    /// Agents that changed cell.
    pub moved: usize,
    /// Agents whose granted destination was already claimed earlier in
    /// registry order; they stayed put.
    pub conflicts: usize,
    /// Unrecognised codes, treated as stay.
    pub invalid_actions: usize,
    /// Actions addressed to ids that are not alive.
    pub unknown_ids: usize,
}

/// Move every live agent one step.
///
/// Destinations are computed against the occupancy before any agent moves;
/// a move is granted only onto a cell that was empty in that snapshot. The
/// grid is then rebuilt (walls first, then agents in registry order) and the
/// first agent to claim a cell keeps it. Agents without an action stay.
pub fn resolve_movement(
    grid: &mut GridWorld,
    agents: &mut AgentRegistry,
    actions: &AgentMap<ActionCode>,
) -> MovementOutcome {
    let mut outcome = MovementOutcome::default();

    let mut intents: HandleMap<Action> = HandleMap::new();
    for (id, &code) in actions {
        let Some(handle) = agents.handle_of(id) else {
            outcome.unknown_ids += 1;
            debug!(%id, code, "ignoring action for agent that is not alive");
            continue;
        };
        let action = Action::from_code(code).unwrap_or_else(|| {
            outcome.invalid_actions += 1;
            trace!(%id, code, "unrecognised action code treated as stay");
            Action::Stay
        });
        intents.insert(handle, action);
    }

    let torus = *grid.torus();
    let plans: Vec<(AgentHandle, Position, Position)> = agents
        .iter()
        .map(|(handle, agent)| {
            let action = intents.get(handle).copied().unwrap_or_default();
            let (dx, dy) = action.delta();
            let candidate = torus.offset(agent.position, dx, dy);
            let destination = if grid.is_empty_at(candidate) {
                candidate
            } else {
                agent.position
            };
            (handle, agent.position, destination)
        })
        .collect();

    grid.rebuild_walls_only();
    for (handle, origin, destination) in plans {
        let target = if destination != origin && !grid.is_empty_at(destination) {
            outcome.conflicts += 1;
            trace!(?origin, ?destination, "movement conflict; later claimant stays");
            origin
        } else {
            destination
        };
        // An origin was occupied in the snapshot, so no granted move targets it.
        assert_eq!(
            grid.cell(target),
            Cell::Empty,
            "movement resolved two agents onto {target:?}"
        );
        grid.place(handle, target);
        if let Some(agent) = agents.get_mut(handle) {
            agent.position = target;
        }
        if target != origin {
            outcome.moved += 1;
        }
    }
    outcome
}
