//! Egocentric multi-channel views.

use crate::config::Variant;
use crate::grid::{Cell, GridWorld};
use crate::registry::{AgentRegistry, Role};
use crate::{AgentMap, Position};
use predprey_index::{NeighborhoodScan, SquareWindow};
use rayon::prelude::*;
use serde::Serialize;

/// Observation planes, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Wall,
    Predator,
    Prey,
    /// Health of whichever agent occupies the cell.
    Health,
    Attack,
    Speed,
    Resilience,
}

impl Channel {
    pub const BASE: [Channel; 4] = [Channel::Wall, Channel::Predator, Channel::Prey, Channel::Health];
    pub const EXTENDED: [Channel; 7] = [
        Channel::Wall,
        Channel::Predator,
        Channel::Prey,
        Channel::Health,
        Channel::Attack,
        Channel::Speed,
        Channel::Resilience,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Channels emitted for `variant`.
    #[must_use]
    pub const fn for_variant(variant: Variant) -> &'static [Channel] {
        match variant {
            Variant::Base => &Self::BASE,
            Variant::Extended => &Self::EXTENDED,
        }
    }
}

/// Channel-major `[channels][side][side]` tensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    channels: usize,
    side: usize,
    data: Vec<f32>,
}

impl Observation {
    #[must_use]
    pub fn zeros(channels: usize, side: usize) -> Self {
        Self {
            channels,
            side,
            data: vec![0.0; channels * side * side],
        }
    }

    /// `[channels, side, side]`.
    #[must_use]
    pub const fn shape(&self) -> [usize; 3] {
        [self.channels, self.side, self.side]
    }

    #[inline]
    fn offset(&self, channel: Channel, (lx, ly): Position) -> usize {
        debug_assert!(channel.index() < self.channels);
        (channel.index() * self.side + lx) * self.side + ly
    }

    /// Value at local window coordinate `(lx, ly)`.
    ///
    /// # Panics
    /// If `channel` is not part of this observation or the coordinate lies
    /// outside the window.
    #[must_use]
    pub fn get(&self, channel: Channel, local: Position) -> f32 {
        assert!(channel.index() < self.channels, "{channel:?} not encoded");
        self.data[self.offset(channel, local)]
    }

    fn set(&mut self, channel: Channel, local: Position, value: f32) {
        let index = self.offset(channel, local);
        self.data[index] = value;
    }

    /// One channel as a row-major `side * side` slice.
    #[must_use]
    pub fn plane(&self, channel: Channel) -> &[f32] {
        let len = self.side * self.side;
        let start = channel.index() * len;
        &self.data[start..start + len]
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// Builds per-agent observations; holds no world state.
#[derive(Debug, Clone, Copy)]
pub struct ObservationEncoder {
    window: SquareWindow,
    variant: Variant,
}

impl ObservationEncoder {
    #[must_use]
    pub const fn new(window: SquareWindow, variant: Variant) -> Self {
        Self { window, variant }
    }

    #[must_use]
    pub const fn channel_count(&self) -> usize {
        self.variant.channel_count()
    }

    #[must_use]
    pub const fn side(&self) -> usize {
        self.window.side()
    }

    /// Encode the window centered on `center`.
    #[must_use]
    pub fn encode(&self, grid: &GridWorld, agents: &AgentRegistry, center: Position) -> Observation {
        let mut observation = Observation::zeros(self.channel_count(), self.side());
        let extended = self.variant.has_traits();
        self.window.scan(grid.torus(), center, &mut |cell| match grid.cell(cell.position) {
            Cell::Empty => {}
            Cell::Wall => observation.set(Channel::Wall, cell.local, 1.0),
            Cell::Agent(handle) => {
                let Some(agent) = agents.get(handle) else {
                    return;
                };
                let presence = match agent.role {
                    Role::Predator => Channel::Predator,
                    Role::Prey => Channel::Prey,
                };
                observation.set(presence, cell.local, 1.0);
                observation.set(Channel::Health, cell.local, agent.health);
                if extended && let Some(traits) = agent.traits {
                    observation.set(Channel::Attack, cell.local, traits.attack);
                    observation.set(Channel::Speed, cell.local, traits.speed);
                    observation.set(Channel::Resilience, cell.local, traits.resilience);
                }
            }
        });
        observation
    }

    /// Encode every live agent. Work fans out across threads; the result is
    /// keyed by id so it does not depend on scheduling.
    #[must_use]
    pub fn encode_all(&self, grid: &GridWorld, agents: &AgentRegistry) -> AgentMap<Observation> {
        let centers: Vec<_> = agents
            .iter()
            .map(|(_, agent)| (agent.id, agent.position))
            .collect();
        centers
            .into_par_iter()
            .map(|(id, center)| (id, self.encode(grid, agents, center)))
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }
}
