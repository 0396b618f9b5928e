//! Tick orchestration.

use crate::config::SimConfig;
use crate::error::WorldError;
use crate::grid::{Cell, GridWorld};
use crate::hunting::resolve_hunting;
use crate::movement::{ActionCode, resolve_movement};
use crate::observation::{Observation, ObservationEncoder};
use crate::population::{apply_growth, apply_hunger, spawn_at_random};
use crate::registry::{AgentId, AgentRegistry, Role};
use crate::summary::{PopulationStats, TickReport, TickSummary};
use crate::{AgentMap, Position, Tick};
use predprey_index::SquareWindow;
use rand::rngs::SmallRng;
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Everything a caller receives from [`World::step`].
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// One entry per agent alive after the tick.
    pub observations: AgentMap<Observation>,
    /// One entry per agent alive when the tick started.
    pub rewards: AgentMap<f32>,
    /// One entry per agent alive when the tick started.
    pub dones: AgentMap<bool>,
    pub report: TickReport,
}

/// A broken link between the grid and the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("cell {position:?} references an agent missing from the registry")]
    DanglingHandle { position: Position },
    #[error("agent {id} is recorded at {recorded:?} but its cell holds something else")]
    Displaced { id: AgentId, recorded: Position },
    #[error("wall at {position:?} was overwritten")]
    WallLost { position: Position },
    #[error("grid holds {cells} agent cells for {agents} live agents")]
    CountMismatch { cells: usize, agents: usize },
}

/// Single simulation instance. Callers serialize access; run one world per
/// worker to parallelize episodes.
pub struct World {
    config: SimConfig,
    tick: Tick,
    rng: SmallRng,
    grid: GridWorld,
    agents: AgentRegistry,
    window: SquareWindow,
    encoder: ObservationEncoder,
    history: VecDeque<TickSummary>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("tick", &self.tick)
            .field("predators", &self.agents.count(Role::Predator))
            .field("prey", &self.agents.count(Role::Prey))
            .field("walls", &self.grid.walls().len())
            .finish()
    }
}

impl World {
    /// Build an empty world; call [`World::reset`] before stepping.
    pub fn new(config: SimConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let window = config.window()?;
        let rng = config.seeded_rng();
        let history_capacity = config.history_capacity;
        Ok(Self {
            grid: GridWorld::new(config.width, config.height)?,
            encoder: ObservationEncoder::new(window, config.variant),
            window,
            tick: Tick::zero(),
            rng,
            agents: AgentRegistry::new(),
            history: VecDeque::with_capacity(history_capacity),
            config,
        })
    }

    /// Start a new episode: walls, then predators, then prey, each on a
    /// random empty cell. Returns the initial observations.
    pub fn reset(&mut self) -> Result<AgentMap<Observation>, WorldError> {
        self.tick = Tick::zero();
        self.history.clear();
        self.agents.clear();
        self.grid.reset(
            self.config.wall_count,
            &mut self.rng,
            self.config.placement_attempts,
        )?;
        for (role, count) in [
            (Role::Predator, self.config.initial_predators),
            (Role::Prey, self.config.initial_prey),
        ] {
            for _ in 0..count {
                spawn_at_random(
                    &mut self.grid,
                    &mut self.agents,
                    &mut self.rng,
                    role,
                    &self.config,
                )?;
            }
        }
        self.debug_check("reset");
        info!(
            width = self.config.width,
            height = self.config.height,
            walls = self.grid.walls().len(),
            predators = self.config.initial_predators,
            prey = self.config.initial_prey,
            "world reset"
        );
        Ok(self.observe())
    }

    /// Advance one tick: movement, hunting, hunger, growth, then observation.
    ///
    /// Agents missing from `actions` stay put. A placement failure during
    /// growth aborts the tick with the error; the world should then be reset.
    pub fn step(&mut self, actions: &AgentMap<ActionCode>) -> Result<StepOutcome, WorldError> {
        let next_tick = self.tick.next();
        let mut rewards: AgentMap<f32> = self
            .agents
            .iter()
            .map(|(_, agent)| (agent.id, 0.0))
            .collect();
        let mut dones: AgentMap<bool> = rewards.keys().map(|&id| (id, false)).collect();

        let movement = resolve_movement(&mut self.grid, &mut self.agents, actions);
        self.debug_check("movement");

        let kills = resolve_hunting(
            &mut self.grid,
            &mut self.agents,
            &self.window,
            self.config.health_gained,
            &mut rewards,
            &mut dones,
        );
        self.debug_check("hunting");

        let starved = apply_hunger(
            &mut self.grid,
            &mut self.agents,
            self.config.hunger_decrement,
            &mut dones,
        );
        self.debug_check("hunger");

        let births = apply_growth(&mut self.grid, &mut self.agents, &mut self.rng, &self.config)?;
        self.debug_check("growth");

        self.tick = next_tick;
        let report = TickReport {
            tick: next_tick,
            movement,
            kills: kills.len(),
            starvations: starved.len(),
            births,
        };
        self.record(&report);
        debug!(
            tick = next_tick.0,
            kills = report.kills,
            starvations = report.starvations,
            births = births.total(),
            conflicts = movement.conflicts,
            "tick complete"
        );

        Ok(StepOutcome {
            observations: self.observe(),
            rewards,
            dones,
            report,
        })
    }

    /// Observations for every live agent.
    #[must_use]
    pub fn observe(&self) -> AgentMap<Observation> {
        self.encoder.encode_all(&self.grid, &self.agents)
    }

    /// Text dump, one line per `x` row.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.grid.width() * (self.grid.height() + 1));
        for x in 0..self.grid.width() {
            if x > 0 {
                out.push('\n');
            }
            for y in 0..self.grid.height() {
                out.push(match self.grid.cell((x, y)) {
                    Cell::Empty => '.',
                    Cell::Wall => '#',
                    Cell::Agent(handle) => self
                        .agents
                        .get(handle)
                        .map_or('?', |agent| agent.role.glyph()),
                });
            }
        }
        out
    }

    fn record(&mut self, report: &TickReport) {
        if self.config.history_capacity == 0 {
            return;
        }
        let summary = TickSummary::new(report, self.population());
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary);
    }

    /// Verify that grid cells and registry records agree one-to-one and
    /// that every wall is still in place.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut cells = 0;
        for (position, handle) in self.grid.agent_cells() {
            cells += 1;
            let agent = self
                .agents
                .get(handle)
                .ok_or(InvariantViolation::DanglingHandle { position })?;
            if agent.position != position {
                return Err(InvariantViolation::Displaced {
                    id: agent.id,
                    recorded: agent.position,
                });
            }
        }
        if cells != self.agents.len() {
            return Err(InvariantViolation::CountMismatch {
                cells,
                agents: self.agents.len(),
            });
        }
        for (handle, agent) in self.agents.iter() {
            if self.grid.cell(agent.position) != Cell::Agent(handle) {
                return Err(InvariantViolation::Displaced {
                    id: agent.id,
                    recorded: agent.position,
                });
            }
        }
        if let Some(&position) = self
            .grid
            .walls()
            .iter()
            .find(|&&wall| self.grid.cell(wall) != Cell::Wall)
        {
            return Err(InvariantViolation::WallLost { position });
        }
        Ok(())
    }

    fn debug_check(&self, phase: &'static str) {
        if cfg!(debug_assertions)
            && let Err(violation) = self.check_invariants()
        {
            panic!("world inconsistent after {phase}: {violation}");
        }
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Ticks processed since the last reset.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub fn grid(&self) -> &GridWorld {
        &self.grid
    }

    #[must_use]
    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    #[must_use]
    pub fn population(&self) -> PopulationStats {
        PopulationStats::collect(&self.agents)
    }

    /// Iterate over retained tick summaries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &TickSummary> {
        self.history.iter()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Variant;

    fn seeded(seed: u64) -> SimConfig {
        SimConfig {
            rng_seed: Some(seed),
            ..SimConfig::default()
        }
    }

    #[test]
    fn new_rejects_invalid_config() {
        let err = World::new(SimConfig {
            width: 0,
            ..SimConfig::default()
        })
        .expect_err("zero width");
        assert!(matches!(err, WorldError::InvalidConfig(_)));
    }

    #[test]
    fn world_starts_empty_until_reset() {
        let world = World::new(seeded(1)).expect("world");
        assert!(world.agents().is_empty());
        assert!(world.grid().walls().is_empty());
        assert_eq!(world.tick(), Tick::zero());
    }

    #[test]
    fn reset_populates_in_configured_order() {
        let mut world = World::new(seeded(11)).expect("world");
        let observations = world.reset().expect("reset");
        assert_eq!(world.grid().walls().len(), 5);
        assert_eq!(world.agents().count(Role::Predator), 2);
        assert_eq!(world.agents().count(Role::Prey), 3);
        let ids: Vec<String> = observations.keys().map(ToString::to_string).collect();
        assert_eq!(ids, ["pr_0", "pr_1", "py_0", "py_1", "py_2"]);
        assert_eq!(world.check_invariants(), Ok(()));
    }

    #[test]
    fn step_keys_rewards_by_tick_start_population() {
        let mut world = World::new(seeded(5)).expect("world");
        let initial = world.reset().expect("reset");
        let outcome = world.step(&AgentMap::new()).expect("step");
        assert_eq!(outcome.report.tick, Tick(1));
        assert_eq!(world.tick(), Tick(1));
        assert!(outcome.rewards.keys().eq(initial.keys()));
        assert!(outcome.dones.keys().eq(initial.keys()));
        assert_eq!(outcome.observations.len(), world.agents().len());
        for id in outcome.observations.keys() {
            assert!(world.agents().get_by_id(id).is_some());
        }
    }

    #[test]
    fn render_draws_every_cell() {
        let mut world = World::new(SimConfig {
            width: 4,
            height: 6,
            wall_count: 3,
            initial_predators: 1,
            initial_prey: 2,
            rng_seed: Some(8),
            ..SimConfig::default()
        })
        .expect("world");
        world.reset().expect("reset");
        let dump = world.render();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|line| line.len() == 6));
        assert_eq!(dump.matches('#').count(), 3);
        assert_eq!(dump.matches('X').count(), 1);
        assert_eq!(dump.matches('O').count(), 2);
    }

    #[test]
    fn history_is_bounded_and_cleared_on_reset() {
        let mut world = World::new(SimConfig {
            history_capacity: 3,
            rng_seed: Some(2),
            ..SimConfig::default()
        })
        .expect("world");
        world.reset().expect("reset");
        for _ in 0..5 {
            world.step(&AgentMap::new()).expect("step");
        }
        let ticks: Vec<u64> = world.history().map(|summary| summary.tick.0).collect();
        assert_eq!(ticks, [3, 4, 5]);
        world.reset().expect("reset");
        assert_eq!(world.history().count(), 0);
        assert_eq!(world.tick(), Tick::zero());
    }

    #[test]
    fn zero_history_capacity_disables_history() {
        let mut world = World::new(SimConfig {
            history_capacity: 0,
            rng_seed: Some(2),
            ..SimConfig::default()
        })
        .expect("world");
        world.reset().expect("reset");
        world.step(&AgentMap::new()).expect("step");
        assert_eq!(world.history().count(), 0);
    }

    #[test]
    fn extended_variant_reports_trait_means() {
        let mut world = World::new(SimConfig {
            variant: Variant::Extended,
            rng_seed: Some(4),
            ..SimConfig::default()
        })
        .expect("world");
        world.reset().expect("reset");
        assert!(world.population().traits.is_some());
        assert!(world.agents().iter().all(|(_, agent)| agent.traits.is_some()));
    }

    #[test]
    fn debug_output_is_compact() {
        let mut world = World::new(seeded(3)).expect("world");
        world.reset().expect("reset");
        let text = format!("{world:?}");
        assert!(text.contains("predators: 2"));
        assert!(!text.contains("cells"));
    }
}
