use anyhow::{Context, Result};
use clap::Parser;
use predprey_core::{
    Action, ActionCode, AgentMap, Observation, Role, SimConfig, Variant, World, WorldError,
};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "predprey",
    version,
    about = "Run the predator-prey grid simulation with a random stand-in policy"
)]
struct Cli {
    /// JSON file with simulation parameters; omitted fields keep their defaults.
    #[arg(short, long, env = "PREDPREY_CONFIG")]
    config: Option<PathBuf>,

    /// Ticks to simulate.
    #[arg(long, default_value_t = 1_000)]
    steps: u64,

    /// RNG seed for both the world and the policy; overrides the config file.
    #[arg(long)]
    seed: Option<u64>,

    /// Use the extended variant (per-agent traits, seven observation channels).
    #[arg(long)]
    extended: bool,

    /// Probability that the policy picks a uniformly random action instead of staying.
    #[arg(long, default_value_t = 1.0)]
    epsilon: f64,

    /// Print the grid every N ticks; 0 disables.
    #[arg(long, default_value_t = 0)]
    render_every: u64,

    /// Log a population summary every N ticks; 0 disables.
    #[arg(long, default_value_t = 100)]
    summary_every: u64,

    /// Write the retained tick summaries to this file as JSON when the run ends.
    #[arg(long)]
    history_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let report = run(&cli, config)?;
    info!(
        ticks = report.ticks,
        episodes = report.episodes,
        predator_transitions = report.transitions.predators,
        prey_transitions = report.transitions.prey,
        predator_return = report.returns.predators,
        prey_return = report.returns.prey,
        "run finished"
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_config(cli: &Cli) -> Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.rng_seed = Some(seed);
    }
    if cli.extended {
        config.variant = Variant::Extended;
    }
    config.validate().context("invalid simulation config")?;
    Ok(config)
}

/// Stand-in for the external learner: acts epsilon-randomly and otherwise
/// stays put.
struct RandomPolicy {
    rng: SmallRng,
    epsilon: f64,
}

impl RandomPolicy {
    fn new(seed: u64, epsilon: f64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            epsilon: epsilon.clamp(0.0, 1.0),
        }
    }

    fn act(&mut self, observations: &AgentMap<Observation>) -> AgentMap<ActionCode> {
        observations
            .keys()
            .map(|&id| {
                let action = if self.rng.random_bool(self.epsilon) {
                    Action::ALL[self.rng.random_range(0..Action::ALL.len())]
                } else {
                    Action::Stay
                };
                (id, action.code())
            })
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct PerRole<T> {
    predators: T,
    prey: T,
}

impl<T> PerRole<T> {
    fn get_mut(&mut self, role: Role) -> &mut T {
        match role {
            Role::Predator => &mut self.predators,
            Role::Prey => &mut self.prey,
        }
    }
}

#[derive(Debug, Default)]
struct RunReport {
    ticks: u64,
    episodes: u64,
    /// Observation/action/reward/next-observation tuples a learner would store.
    transitions: PerRole<u64>,
    returns: PerRole<f64>,
}

fn run(cli: &Cli, config: SimConfig) -> Result<RunReport> {
    let policy_seed = config.rng_seed.unwrap_or(0xFACA_DEAF_0123_4567_u64);
    let mut policy = RandomPolicy::new(policy_seed, cli.epsilon);
    let mut world = World::new(config).context("failed to build world")?;
    let mut observations = world.reset().context("initial reset failed")?;
    let mut report = RunReport {
        episodes: 1,
        ..RunReport::default()
    };

    for _ in 0..cli.steps {
        let actions = policy.act(&observations);
        let outcome = match world.step(&actions) {
            Ok(outcome) => outcome,
            Err(err @ WorldError::PlacementExhausted { .. }) => {
                warn!(tick = world.tick().0, %err, "grid saturated; starting a new episode");
                observations = world.reset().context("reset after saturation failed")?;
                report.episodes += 1;
                continue;
            }
            Err(err) => return Err(err).context("step failed"),
        };
        report.ticks += 1;

        for (id, reward) in &outcome.rewards {
            *report.transitions.get_mut(id.role()) += 1;
            *report.returns.get_mut(id.role()) += f64::from(*reward);
        }

        let tick = outcome.report.tick.0;
        if cli.summary_every > 0 && tick.is_multiple_of(cli.summary_every) {
            let population = world.population();
            info!(
                tick,
                predators = population.predators,
                prey = population.prey,
                kills = outcome.report.kills,
                starvations = outcome.report.starvations,
                mean_predator_health = population.mean_predator_health,
                "population"
            );
        }
        if cli.render_every > 0 && tick.is_multiple_of(cli.render_every) {
            println!("tick {tick}\n{}\n", world.render());
        }
        observations = outcome.observations;
    }

    if let Some(path) = &cli.history_out {
        let history: Vec<_> = world.history().collect();
        let json = serde_json::to_string_pretty(&history).context("failed to encode history")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write history to {}", path.display()))?;
        info!(path = %path.display(), entries = history.len(), "history written");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("predprey").chain(args.iter().copied()))
    }

    #[test]
    fn flags_override_defaults() {
        let cli = cli(&["--seed", "9", "--extended"]);
        let config = load_config(&cli).expect("config");
        assert_eq!(config.rng_seed, Some(9));
        assert_eq!(config.variant, Variant::Extended);
        assert_eq!(config.width, SimConfig::default().width);
    }

    #[test]
    fn config_file_is_merged_with_defaults() {
        let path = std::env::temp_dir().join(format!("predprey-cfg-{}.json", std::process::id()));
        fs::write(&path, r#"{ "width": 20, "initial_prey": 7 }"#).expect("write config");
        let cli = cli(&["--config", path.to_str().expect("utf-8 path")]);
        let config = load_config(&cli).expect("config");
        fs::remove_file(&path).ok();
        assert_eq!(config.width, 20);
        assert_eq!(config.initial_prey, 7);
        assert_eq!(config.height, SimConfig::default().height);
    }

    #[test]
    fn invalid_config_is_reported() {
        let path =
            std::env::temp_dir().join(format!("predprey-bad-{}.json", std::process::id()));
        fs::write(&path, r#"{ "scope": 0 }"#).expect("write config");
        let cli = cli(&["--config", path.to_str().expect("utf-8 path")]);
        let err = load_config(&cli).expect_err("scope 0 is invalid");
        fs::remove_file(&path).ok();
        assert!(format!("{err:#}").contains("scope must be at least 1"));
    }

    #[test]
    fn zero_epsilon_policy_always_stays() {
        let mut world = World::new(SimConfig {
            rng_seed: Some(1),
            ..SimConfig::default()
        })
        .expect("world");
        let observations = world.reset().expect("reset");
        let mut policy = RandomPolicy::new(1, 0.0);
        let actions = policy.act(&observations);
        assert_eq!(actions.len(), observations.len());
        assert!(actions.values().all(|&code| code == Action::Stay.code()));
    }

    #[test]
    fn short_run_counts_one_transition_per_starting_agent() {
        let cli = cli(&["--steps", "3", "--seed", "4", "--summary-every", "0"]);
        let config = load_config(&cli).expect("config");
        let report = run(&cli, config).expect("run");
        assert_eq!(report.ticks, 3);
        assert_eq!(report.episodes, 1);
        assert!(report.transitions.predators >= 6);
        assert!(report.transitions.prey >= 3);
    }
}
