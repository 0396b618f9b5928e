//! Per-tick counters and population statistics.

use crate::Tick;
use crate::movement::MovementOutcome;
use crate::population::Births;
use crate::registry::{AgentRegistry, Role};
use serde::{Deserialize, Serialize};

/// Counters for what happened during a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: Tick,
    pub movement: MovementOutcome,
    pub kills: usize,
    pub starvations: usize,
    pub births: Births,
}

/// Trait means tracked in the extended variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitMeans {
    pub predator_attack: f32,
    pub predator_speed: f32,
    pub prey_resilience: f32,
    pub prey_speed: f32,
}

/// Snapshot of the live population. Means are zero for an extinct role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub predators: usize,
    pub prey: usize,
    pub mean_predator_health: f32,
    pub mean_prey_health: f32,
    /// `None` unless agents carry traits.
    pub traits: Option<TraitMeans>,
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    health: f32,
    attack: f32,
    speed: f32,
    resilience: f32,
    with_traits: usize,
}

impl Accumulator {
    fn mean(total: f32, count: usize) -> f32 {
        if count > 0 { total / count as f32 } else { 0.0 }
    }
}

impl PopulationStats {
    #[must_use]
    pub fn collect(agents: &AgentRegistry) -> Self {
        let mut predators = Accumulator::default();
        let mut prey = Accumulator::default();
        for (_, agent) in agents.iter() {
            let acc = match agent.role {
                Role::Predator => &mut predators,
                Role::Prey => &mut prey,
            };
            acc.count += 1;
            acc.health += agent.health;
            if let Some(traits) = agent.traits {
                acc.with_traits += 1;
                acc.attack += traits.attack;
                acc.speed += traits.speed;
                acc.resilience += traits.resilience;
            }
        }

        let traits = (predators.with_traits + prey.with_traits > 0).then(|| TraitMeans {
            predator_attack: Accumulator::mean(predators.attack, predators.with_traits),
            predator_speed: Accumulator::mean(predators.speed, predators.with_traits),
            prey_resilience: Accumulator::mean(prey.resilience, prey.with_traits),
            prey_speed: Accumulator::mean(prey.speed, prey.with_traits),
        });

        Self {
            predators: predators.count,
            prey: prey.count,
            mean_predator_health: Accumulator::mean(predators.health, predators.count),
            mean_prey_health: Accumulator::mean(prey.health, prey.count),
            traits,
        }
    }
}

/// Retained record of one tick, kept in the world history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick: Tick,
    pub population: PopulationStats,
    pub kills: usize,
    pub starvations: usize,
    pub births: Births,
}

impl TickSummary {
    #[must_use]
    pub fn new(report: &TickReport, population: PopulationStats) -> Self {
        Self {
            tick: report.tick,
            population,
            kills: report.kills,
            starvations: report.starvations,
            births: report.births,
        }
    }
}
