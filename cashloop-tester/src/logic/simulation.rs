use anyhow::{Context, Result, anyhow};
use cashloop_game::{
    BuildingId, ChapterId, Clock, EngineSetup, GameEngine, GameEvent, KeyValueStore, Ledger,
    PersistedProfile, PlotId, RecordingSink, RewardStage, TimerKind,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::invariants::check_transition;
use super::policy::{GameplayStrategy, PlayerPolicy};

/// How much to play per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationPlan {
    pub rounds: u32,
    pub max_turns: u32,
    pub take_quizzes: bool,
}

impl Default for SimulationPlan {
    fn default() -> Self {
        Self {
            rounds: 3,
            max_turns: 5_000,
            take_quizzes: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub round: u32,
    pub turn: u32,
    pub tile: String,
    pub choice: String,
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub turns: u32,
    pub won: bool,
    pub net_worth: u32,
    pub wealth_after: u32,
    pub grade: Option<String>,
    pub placed: Option<(PlotId, BuildingId)>,
    pub goal: Option<BuildingId>,
    pub laps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: String,
    pub rounds: Vec<RoundRecord>,
    pub quiz_stars: BTreeMap<String, u8>,
    pub events: usize,
    pub violations: Vec<String>,
    pub decision_log: Vec<DecisionRecord>,
    pub resumed: bool,
    pub final_profile: PersistedProfile,
}

impl SimulationSummary {
    #[must_use]
    pub fn rounds_won(&self) -> usize {
        self.rounds.iter().filter(|r| r.won).count()
    }
}

/// Drives one engine through a plan with one policy, checking the ledger
/// invariants after every command.
pub struct SimulationRunner<S, C>
where
    S: KeyValueStore,
    C: Clock,
{
    engine: GameEngine<S, RecordingSink, C>,
    sink: RecordingSink,
    policy: Box<dyn PlayerPolicy>,
    strategy: GameplayStrategy,
    seed: u64,
    previous: Ledger,
    violations: Vec<String>,
    decision_log: Vec<DecisionRecord>,
    events: usize,
}

impl<S, C> SimulationRunner<S, C>
where
    S: KeyValueStore,
    C: Clock,
{
    pub fn new(
        setup: EngineSetup,
        store: S,
        clock: C,
        strategy: GameplayStrategy,
    ) -> Result<Self> {
        let seed = setup.seed;
        let sink = RecordingSink::new();
        let engine = GameEngine::new(setup, store, sink.clone(), clock)
            .context("rules or quiz content failed validation")?;
        let previous = engine.snapshot();
        Ok(Self {
            engine,
            sink,
            policy: strategy.create_policy(seed),
            strategy,
            seed,
            previous,
            violations: Vec::new(),
            decision_log: Vec::new(),
            events: 0,
        })
    }

    pub fn run(mut self, plan: &SimulationPlan) -> Result<SimulationSummary> {
        let resumed = self.engine.load().map_err(|err| anyhow!(err))?;
        self.checkpoint("load");
        if resumed {
            log::info!(
                "resumed profile with wealth {}",
                self.engine.ledger().wealth()
            );
        }

        log::debug!("{} policy playing seed {}", self.policy.name(), self.seed);
        let mut rounds = Vec::new();
        for _ in 0..plan.rounds {
            rounds.push(self.play_round(plan)?);
            if plan.take_quizzes {
                self.take_open_quizzes()?;
            }
        }

        let quiz_stars = self
            .engine
            .progress()
            .iter()
            .map(|(chapter, progress)| (chapter.key().to_string(), progress.stars))
            .collect();
        self.events += self.sink.len();
        Ok(SimulationSummary {
            seed: self.seed,
            strategy: self.strategy.label().to_string(),
            rounds,
            quiz_stars,
            events: self.events,
            violations: self.violations,
            decision_log: self.decision_log,
            resumed,
            final_profile: self.engine.ledger().to_profile(),
        })
    }

    fn play_round(&mut self, plan: &SimulationPlan) -> Result<RoundRecord> {
        self.engine.start_round().map_err(|err| anyhow!(err))?;
        self.checkpoint("start_round");
        let round = self.engine.ledger().round();

        let mut turns = 0;
        while self.engine.reward_stage().is_none() && turns < plan.max_turns {
            self.take_turn()
                .with_context(|| format!("round {round} turn {}", turns + 1))?;
            turns += 1;
        }

        let mut record = RoundRecord {
            round,
            turns,
            won: false,
            net_worth: self.engine.ledger().net_worth(),
            wealth_after: self.engine.ledger().wealth(),
            grade: None,
            placed: None,
            goal: None,
            laps: 0,
        };
        if self.engine.reward_stage().is_some() {
            self.run_reward_flow()
                .with_context(|| format!("reward flow after round {round}"))?;
            record.won = true;
        } else {
            log::warn!(
                "{} did not win round {round} within {} turns",
                self.strategy,
                plan.max_turns
            );
            self.engine.abandon_round().map_err(|err| anyhow!(err))?;
            self.checkpoint("abandon_round");
        }
        record.wealth_after = self.engine.ledger().wealth();

        for event in self.sink.drain() {
            self.events += 1;
            match event {
                GameEvent::LapCompleted { .. } => record.laps += 1,
                GameEvent::RoundWon { summary } => record.net_worth = summary.net_worth,
                GameEvent::RoundCompleted { outcome } => {
                    record.grade = Some(outcome.grade.grade.to_string());
                    record.placed = outcome.placed;
                    record.goal = outcome.goal;
                }
                _ => {}
            }
        }
        Ok(record)
    }

    fn take_turn(&mut self) -> Result<()> {
        self.engine.roll_dice().map_err(|err| anyhow!(err))?;
        self.checkpoint("roll_dice");
        self.engine
            .timer_elapsed(TimerKind::DiceRoll)
            .map_err(|err| anyhow!(err))?;
        self.checkpoint("dice timer");
        self.engine
            .timer_elapsed(TimerKind::TokenMove)
            .map_err(|err| anyhow!(err))?;
        self.checkpoint("move timer");

        if let Some(decision) = self.engine.decision().cloned() {
            let picked = self.policy.pick_choice(self.engine.ledger(), &decision);
            self.decision_log.push(DecisionRecord {
                round: self.engine.ledger().round(),
                turn: self.engine.ledger().turn(),
                tile: decision.tile.to_string(),
                choice: picked.choice.to_string(),
                rationale: picked.rationale,
            });
            self.engine
                .resolve_tile_decision(picked.choice)
                .map_err(|err| anyhow!(err))?;
            self.checkpoint("resolve_tile_decision");
        }
        Ok(())
    }

    fn run_reward_flow(&mut self) -> Result<()> {
        while let Some(stage) = self.engine.reward_stage() {
            match stage {
                RewardStage::Reveal => self
                    .engine
                    .timer_elapsed(TimerKind::RewardReveal)
                    .map_err(|err| anyhow!(err))?,
                RewardStage::Inventory => {
                    let cards = self.engine.inventory();
                    if let Some(id) = self.policy.pick_building(self.engine.ledger(), &cards) {
                        self.engine
                            .select_building(&id)
                            .map_err(|err| anyhow!(err))?;
                    }
                    self.engine
                        .advance_reward_stage()
                        .map_err(|err| anyhow!(err))?;
                }
                RewardStage::Placement => self.place_building()?,
                RewardStage::TownUpdated | RewardStage::Recap => self
                    .engine
                    .advance_reward_stage()
                    .map_err(|err| anyhow!(err))?,
                RewardStage::NextGoal => {
                    let goal = self
                        .engine
                        .next_goals()
                        .into_iter()
                        .find(|goal| goal.can_start);
                    if let Some(goal) = goal {
                        self.engine
                            .preview_goal(&goal.id)
                            .map_err(|err| anyhow!(err))?;
                        self.engine
                            .start_goal_module()
                            .map_err(|err| anyhow!(err))?;
                    } else {
                        self.engine.skip_to_recap().map_err(|err| anyhow!(err))?;
                    }
                }
                RewardStage::Loop => break,
            }
            self.checkpoint(stage.label());
        }
        Ok(())
    }

    fn place_building(&mut self) -> Result<()> {
        if self
            .engine
            .pending_timer()
            .is_some_and(|timer| timer.kind == TimerKind::PlacementSettle)
        {
            return self
                .engine
                .timer_elapsed(TimerKind::PlacementSettle)
                .map_err(|err| anyhow!(err));
        }
        let free = self.engine.empty_plots();
        match self.policy.pick_plot(&free) {
            Some(plot) => match self.engine.select_placement_plot(plot) {
                Ok(_) => Ok(()),
                Err(err) => {
                    log::info!("nothing placeable on {plot}: {err}");
                    self.engine
                        .advance_reward_stage()
                        .map_err(|err| anyhow!(err))
                }
            },
            None => self
                .engine
                .advance_reward_stage()
                .map_err(|err| anyhow!(err)),
        }
    }

    fn take_open_quizzes(&mut self) -> Result<()> {
        let open: Vec<ChapterId> = self
            .engine
            .chapters()
            .into_iter()
            .filter(|status| status.unlocked && status.progress.is_none())
            .map(|status| status.chapter)
            .collect();
        for chapter in open {
            self.engine
                .start_quiz(chapter)
                .map_err(|err| anyhow!(err))?;
            while let Some(question) = self.engine.quiz().and_then(|quiz| quiz.current()) {
                let option = self
                    .policy
                    .answer_quiz(question.answer, question.options.len());
                self.engine
                    .answer_quiz_question(option)
                    .map_err(|err| anyhow!(err))
                    .with_context(|| format!("quiz {chapter}"))?;
            }
            self.checkpoint("quiz");
        }
        Ok(())
    }

    fn checkpoint(&mut self, command: &str) {
        let current = self.engine.snapshot();
        let tile_count = self.engine.rules().tile_count();
        for violation in check_transition(&self.previous, &current, tile_count) {
            log::error!("invariant broken after {command}: {violation}");
            self.violations
                .push(format!("after {command} (round {}): {violation}", current.round()));
        }
        self.previous = current;
    }
}
