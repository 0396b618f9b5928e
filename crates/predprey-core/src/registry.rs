//! Live agent records behind generational handles.

use crate::Position;
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap, new_key_type};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

new_key_type! {
    /// Stable handle for agents backed by a generational slot map.
    pub struct AgentHandle;
}

/// Convenience alias for associating side data with agent handles.
pub type HandleMap<T> = SecondaryMap<AgentHandle, T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Predator,
    Prey,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Predator, Role::Prey];

    /// Prefix used in external ids.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Role::Predator => "pr",
            Role::Prey => "py",
        }
    }

    /// Marker used by the textual dump.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Role::Predator => 'X',
            Role::Prey => 'O',
        }
    }

    const fn slot(self) -> usize {
        match self {
            Role::Predator => 0,
            Role::Prey => 1,
        }
    }
}

/// External, role-prefixed agent identity (`pr_3`, `py_12`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct AgentId {
    role: Role,
    index: u32,
}

impl AgentId {
    #[must_use]
    pub const fn new(role: Role, index: u32) -> Self {
        Self { role, index }
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.role.prefix(), self.index)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed agent id `{0}`")]
pub struct ParseAgentIdError(pub String);

impl FromStr for AgentId {
    type Err = ParseAgentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseAgentIdError(s.to_owned());
        let (prefix, index) = s.split_once('_').ok_or_else(malformed)?;
        let role = Role::ALL
            .into_iter()
            .find(|role| role.prefix() == prefix)
            .ok_or_else(malformed)?;
        let index = index.parse().map_err(|_| malformed())?;
        Ok(Self { role, index })
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for AgentId {
    type Error = ParseAgentIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Static per-agent traits carried by the extended variant.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Traits {
    pub attack: f32,
    pub speed: f32,
    pub resilience: f32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub role: Role,
    pub position: Position,
    pub health: f32,
    /// Present only in the extended variant.
    pub traits: Option<Traits>,
}

/// Owner of agent lifetimes. Iteration follows insertion order, which is the
/// precedence order for movement claims and kills.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    slots: SlotMap<AgentHandle, Agent>,
    order: Vec<AgentHandle>,
    by_id: HashMap<AgentId, AgentHandle>,
    next_index: [u32; 2],
}

impl AgentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of live agents with `role`.
    #[must_use]
    pub fn count(&self, role: Role) -> usize {
        self.slots.values().filter(|agent| agent.role == role).count()
    }

    /// Register a new agent and return its handle. Ids come from a per-role
    /// counter that only moves forward until [`AgentRegistry::clear`].
    pub fn spawn(
        &mut self,
        role: Role,
        position: Position,
        health: f32,
        traits: Option<Traits>,
    ) -> AgentHandle {
        let counter = &mut self.next_index[role.slot()];
        let id = AgentId::new(role, *counter);
        *counter += 1;
        let handle = self.slots.insert(Agent {
            id,
            role,
            position,
            health,
            traits,
        });
        self.order.push(handle);
        let previous = self.by_id.insert(id, handle);
        debug_assert!(previous.is_none(), "agent id {id} allocated twice");
        handle
    }

    /// Remove `handle`, returning the record if it was live.
    pub fn remove(&mut self, handle: AgentHandle) -> Option<Agent> {
        let agent = self.slots.remove(handle)?;
        self.by_id.remove(&agent.id);
        if let Some(index) = self.order.iter().position(|h| *h == handle) {
            self.order.remove(index);
        }
        Some(agent)
    }

    #[must_use]
    pub fn get(&self, handle: AgentHandle) -> Option<&Agent> {
        self.slots.get(handle)
    }

    #[must_use]
    pub fn get_mut(&mut self, handle: AgentHandle) -> Option<&mut Agent> {
        self.slots.get_mut(handle)
    }

    #[must_use]
    pub fn contains(&self, handle: AgentHandle) -> bool {
        self.slots.contains_key(handle)
    }

    /// Resolve an external id to the live agent's handle.
    #[must_use]
    pub fn handle_of(&self, id: &AgentId) -> Option<AgentHandle> {
        self.by_id.get(id).copied()
    }

    #[must_use]
    pub fn get_by_id(&self, id: &AgentId) -> Option<&Agent> {
        self.handle_of(id).and_then(|handle| self.slots.get(handle))
    }

    /// Live agents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentHandle, &Agent)> + '_ {
        self.order.iter().map(|&handle| (handle, &self.slots[handle]))
    }

    /// Live handles of `role` in insertion order. The borrow keeps the
    /// registry frozen while iterating; use [`AgentRegistry::handles_by_role`]
    /// to collect before mutating.
    pub fn iter_by_role(&self, role: Role) -> impl Iterator<Item = AgentHandle> + '_ {
        self.iter()
            .filter(move |(_, agent)| agent.role == role)
            .map(|(handle, _)| handle)
    }

    /// Snapshot of live handles of `role` taken at call time.
    #[must_use]
    pub fn handles_by_role(&self, role: Role) -> Vec<AgentHandle> {
        self.iter_by_role(role).collect()
    }

    /// Snapshot of every live handle in insertion order.
    #[must_use]
    pub fn handles(&self) -> Vec<AgentHandle> {
        self.order.clone()
    }

    /// Drop every agent and restart id allocation.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
        self.by_id.clear();
        self.next_index = [0; 2];
    }
}
