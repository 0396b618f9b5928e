use crate::registry::Role;
use predprey_index::IndexError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// What a failed random placement was trying to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementTarget {
    Wall,
    Agent(Role),
}

impl fmt::Display for PlacementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementTarget::Wall => f.write_str("wall"),
            PlacementTarget::Agent(Role::Predator) => f.write_str("predator"),
            PlacementTarget::Agent(Role::Prey) => f.write_str("prey"),
        }
    }
}

/// Errors surfaced by world construction, `reset`, and `step`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Random placement found no empty cell within its attempt budget.
    /// Aborts the current `reset` or `step`.
    #[error("no empty cell found for {target} after {attempts} attempts")]
    PlacementExhausted {
        target: PlacementTarget,
        attempts: u32,
    },
}

impl From<IndexError> for WorldError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::InvalidConfig(reason) => WorldError::InvalidConfig(reason),
        }
    }
}
