use anyhow::{Context, Result};
use cashloop_game::{EngineSetup, MemoryStore, SystemClock};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::loader::FileLoader;
use crate::store::FileStore;

use super::policy::GameplayStrategy;
use super::simulation::{SimulationPlan, SimulationRunner, SimulationSummary};

/// Outcome of one (strategy, seed) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub strategy: String,
    pub seed: u64,
    pub passed: bool,
    pub rounds_played: usize,
    pub rounds_won: usize,
    pub grades: Vec<String>,
    pub final_wealth: u32,
    pub town_level: u32,
    pub quiz_stars: u32,
    pub events: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl ScenarioResult {
    fn from_summary(summary: &SimulationSummary, duration: Duration) -> Self {
        Self {
            strategy: summary.strategy.clone(),
            seed: summary.seed,
            passed: summary.violations.is_empty(),
            rounds_played: summary.rounds.len(),
            rounds_won: summary.rounds_won(),
            grades: summary
                .rounds
                .iter()
                .filter_map(|round| round.grade.clone())
                .collect(),
            final_wealth: summary.final_profile.wealth,
            town_level: summary.final_profile.town_level,
            quiz_stars: summary.quiz_stars.values().map(|s| u32::from(*s)).sum(),
            events: summary.events,
            failures: summary.violations.clone(),
            duration,
        }
    }

    fn aborted(
        strategy: GameplayStrategy,
        seed: u64,
        err: &anyhow::Error,
        duration: Duration,
    ) -> Self {
        Self {
            strategy: strategy.label().to_string(),
            seed,
            passed: false,
            rounds_played: 0,
            rounds_won: 0,
            grades: Vec::new(),
            final_wealth: 0,
            town_level: 0,
            quiz_stars: 0,
            events: 0,
            failures: vec![format!("{err:#}")],
            duration,
        }
    }
}

/// Runs every strategy against every seed.
pub struct LogicTester {
    loader: FileLoader,
    save_dir: Option<PathBuf>,
    plan: SimulationPlan,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(
        loader: FileLoader,
        save_dir: Option<PathBuf>,
        plan: SimulationPlan,
        verbose: bool,
    ) -> Self {
        Self {
            loader,
            save_dir,
            plan,
            verbose,
        }
    }

    pub fn run_all(&self, strategies: &[GameplayStrategy], seeds: &[u64]) -> Vec<ScenarioResult> {
        let mut results = Vec::new();
        for &strategy in strategies {
            for &seed in seeds {
                if self.verbose {
                    println!(
                        "🧪 Playing strategy: {} (seed: {seed})",
                        strategy.label().bright_white()
                    );
                }
                let start = Instant::now();
                let result = match self.run_one(strategy, seed) {
                    Ok(summary) => ScenarioResult::from_summary(&summary, start.elapsed()),
                    Err(err) => {
                        log::error!("{strategy} seed {seed} aborted: {err:#}");
                        ScenarioResult::aborted(strategy, seed, &err, start.elapsed())
                    }
                };
                results.push(result);
            }
        }
        results
    }

    fn run_one(&self, strategy: GameplayStrategy, seed: u64) -> Result<SimulationSummary> {
        let setup = EngineSetup::from_loader(&self.loader, seed)
            .context("failed to load rules or content")?;
        match &self.save_dir {
            Some(dir) => {
                let store = FileStore::open(dir.join(format!("{}-{seed}", strategy.key())))?;
                log::debug!("saving profile under {}", store.root().display());
                SimulationRunner::new(setup, store, SystemClock, strategy)?.run(&self.plan)
            }
            None => SimulationRunner::new(setup, MemoryStore::new(), SystemClock, strategy)?
                .run(&self.plan),
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}
