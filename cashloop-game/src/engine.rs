//! The public command surface.
//!
//! A [`GameEngine`] owns the ledger and every state machine, and is driven by
//! a host: the host issues commands, fires the timers the engine asks for,
//! and renders from the emitted events and ledger snapshots.
use crate::board::Board;
use crate::buildings::{BuildingCatalog, BuildingId, PlotId};
use crate::config::{ConfigError, RulesConfig};
use crate::error::EngineError;
use crate::events::{EventSink, GameEvent};
use crate::ledger::Ledger;
use crate::progression::{
    ChapterId, ChapterProgress, ChapterStatus, Clock, ProgressBook, QuizBank, QuizQuestion,
    QuizSession, QuizStep,
};
use crate::reward::{
    BuildingCard, GoalOption, PlacementResult, RewardFlow, RewardOutcome, RewardStage, StageStep,
    TownView,
};
use crate::storage::{KeyValueStore, ProfileStore};
use crate::timers::{PendingTimer, TimerKind};
use crate::turn::{Arrival, ChoiceId, Decision, TileEngine, TurnPhase, TurnResolution};

/// Static inputs for a new engine.
#[derive(Debug, Clone, Default)]
pub struct EngineSetup {
    pub rules: RulesConfig,
    pub catalog: BuildingCatalog,
    pub quizzes: QuizBank,
    pub seed: u64,
}

impl EngineSetup {
    /// Reference rules, shipped buildings and quizzes.
    #[must_use]
    pub fn reference(seed: u64) -> Self {
        Self {
            rules: RulesConfig::default_config(),
            catalog: BuildingCatalog::default_catalog(),
            quizzes: QuizBank::default_bank(),
            seed,
        }
    }
}

pub struct GameEngine<S, K, C>
where
    S: KeyValueStore,
    K: EventSink,
    C: Clock,
{
    rules: RulesConfig,
    catalog: BuildingCatalog,
    quizzes: QuizBank,
    ledger: Ledger,
    tiles: TileEngine,
    round_open: bool,
    reward: Option<RewardFlow>,
    progress: ProgressBook,
    quiz: Option<QuizSession>,
    store: ProfileStore<S>,
    sink: K,
    clock: C,
}

impl<S, K, C> GameEngine<S, K, C>
where
    S: KeyValueStore,
    K: EventSink,
    C: Clock,
{
    /// Build an engine with an empty ledger. Call [`Self::load`] to resume a
    /// saved profile, then [`Self::start_round`].
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the rules or quiz bank are malformed.
    pub fn new(setup: EngineSetup, store: S, sink: K, clock: C) -> Result<Self, ConfigError> {
        setup.rules.validate()?;
        setup.quizzes.validate()?;
        Ok(Self {
            tiles: TileEngine::new(setup.seed),
            rules: setup.rules,
            catalog: setup.catalog,
            quizzes: setup.quizzes,
            ledger: Ledger::new(),
            round_open: false,
            reward: None,
            progress: ProgressBook::new(),
            quiz: None,
            store: ProfileStore::new(store),
            sink,
            clock,
        })
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub fn snapshot(&self) -> Ledger {
        self.ledger.snapshot()
    }

    #[must_use]
    pub const fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    #[must_use]
    pub const fn catalog(&self) -> &BuildingCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn progress(&self) -> &ProgressBook {
        &self.progress
    }

    #[must_use]
    pub const fn store(&self) -> &ProfileStore<S> {
        &self.store
    }

    #[must_use]
    pub const fn sink(&self) -> &K {
        &self.sink
    }

    #[must_use]
    pub const fn turn_phase(&self) -> &TurnPhase {
        self.tiles.phase()
    }

    #[must_use]
    pub const fn is_round_open(&self) -> bool {
        self.round_open
    }

    /// Open tile prompt, if any.
    #[must_use]
    pub const fn decision(&self) -> Option<&Decision> {
        self.tiles.decision()
    }

    #[must_use]
    pub const fn reward_flow(&self) -> Option<&RewardFlow> {
        self.reward.as_ref()
    }

    #[must_use]
    pub fn reward_stage(&self) -> Option<RewardStage> {
        self.reward.as_ref().map(RewardFlow::stage)
    }

    #[must_use]
    pub const fn quiz(&self) -> Option<&QuizSession> {
        self.quiz.as_ref()
    }

    /// Timer the host must fire before the engine can continue.
    #[must_use]
    pub fn pending_timer(&self) -> Option<PendingTimer> {
        match &self.reward {
            Some(flow) => flow.pending_timer(&self.rules),
            None => self.tiles.pending_timer(&self.rules),
        }
    }

    #[must_use]
    pub fn town(&self) -> TownView {
        TownView::read(&self.ledger, &self.catalog)
    }

    #[must_use]
    pub fn inventory(&self) -> Vec<BuildingCard> {
        RewardFlow::inventory(&self.ledger, &self.catalog)
    }

    #[must_use]
    pub fn empty_plots(&self) -> Vec<PlotId> {
        RewardFlow::empty_plots(&self.ledger, &self.rules)
    }

    #[must_use]
    pub fn next_goals(&self) -> Vec<GoalOption> {
        RewardFlow::next_goals(&self.ledger, &self.catalog)
    }

    #[must_use]
    pub fn chapters(&self) -> Vec<ChapterStatus> {
        self.progress.statuses(&self.ledger)
    }

    /// Reset round-scoped state and credit passive income from the town.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` while a round is open or its reward
    /// flow is running.
    pub fn start_round(&mut self) -> Result<(), EngineError> {
        if self.round_open || self.reward.is_some() || !self.tiles.is_idle() {
            return Err(self.reject("start a round"));
        }
        let income = self.catalog.passive_income(self.ledger.placed_buildings());
        self.ledger.start_round(self.rules.economy.starting_wallet);
        self.ledger.credit(income);
        self.tiles.reset();
        self.round_open = true;
        log::info!(
            "round {} started with wallet {} ({} passive income)",
            self.ledger.round(),
            self.ledger.wallet(),
            income
        );
        self.emit_ledger();
        Ok(())
    }

    /// Give up on the open round between turns. The ledger keeps everything,
    /// including an unpaid loan, and a new round may be started.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` with no round open, mid-turn, or once
    /// the round has been won.
    pub fn abandon_round(&mut self) -> Result<(), EngineError> {
        if !self.round_open || self.reward.is_some() || !self.tiles.is_idle() {
            return Err(self.reject("abandon the round"));
        }
        log::info!(
            "round {} abandoned after {} turns",
            self.ledger.round(),
            self.ledger.turn()
        );
        self.tiles.reset();
        self.round_open = false;
        Ok(())
    }

    /// Roll the seeded dice.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` unless a round is open and idle.
    pub fn roll_dice(&mut self) -> Result<u8, EngineError> {
        self.ensure_round_open("roll the dice")?;
        let roll = self.tiles.roll_dice(&self.rules)?;
        self.sink.emit(GameEvent::DiceResult { roll });
        Ok(roll)
    }

    /// Roll with a host-supplied value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` unless a round is open and idle, or
    /// `InvalidRoll` for values off the dice.
    pub fn roll_with(&mut self, value: u8) -> Result<u8, EngineError> {
        self.ensure_round_open("roll the dice")?;
        let roll = self.tiles.roll_with(value, &self.rules)?;
        self.sink.emit(GameEvent::DiceResult { roll });
        Ok(roll)
    }

    /// The host's timer for `kind` ran out.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedTimer` if `kind` is not the pending timer.
    pub fn timer_elapsed(&mut self, kind: TimerKind) -> Result<(), EngineError> {
        if let Some(flow) = self.reward.as_mut() {
            let step = flow.on_timer(kind, &mut self.ledger, &self.catalog)?;
            return self.after_reward_step(step);
        }
        let expected = self.tiles.pending_timer_kind();
        if expected != Some(kind) {
            log::warn!("timer {kind} fired while {:?} was pending", expected);
            return Err(EngineError::UnexpectedTimer {
                fired: kind,
                expected,
            });
        }
        match kind {
            TimerKind::DiceRoll => {
                let report = self.tiles.finish_roll(&mut self.ledger, &self.rules)?;
                if let Some(repayment) = report.lap {
                    self.sink.emit(GameEvent::LapCompleted { repayment });
                    self.emit_ledger();
                }
                Ok(())
            }
            TimerKind::TokenMove => {
                let arrival = self.tiles.finish_move(&self.ledger, &self.rules)?;
                let index = self.ledger.board_position();
                let tile = Board::new(&self.rules.board).tile_at(index);
                self.sink.emit(GameEvent::TileLanded { index, tile });
                match arrival {
                    Arrival::Prompt(decision) => {
                        self.sink.emit(GameEvent::DecisionPresented { decision });
                        Ok(())
                    }
                    Arrival::Resolved(resolution) => {
                        self.after_resolution(resolution);
                        Ok(())
                    }
                }
            }
            TimerKind::RewardReveal | TimerKind::PlacementSettle => {
                Err(EngineError::UnexpectedTimer {
                    fired: kind,
                    expected,
                })
            }
        }
    }

    /// Apply the player's choice on the open tile prompt.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` with no prompt open, or a rejection
    /// for choices that are not offered or are disabled.
    pub fn resolve_tile_decision(&mut self, choice: ChoiceId) -> Result<(), EngineError> {
        let resolution = self.tiles.resolve(choice, &mut self.ledger, &self.rules)?;
        self.after_resolution(resolution);
        Ok(())
    }

    /// Continue from the current reward stage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` outside of a reward flow or on a
    /// time-boxed stage, or `PlacementPending`.
    pub fn advance_reward_stage(&mut self) -> Result<(), EngineError> {
        let flow = active_flow(&mut self.reward, &self.tiles, "continue")?;
        let step = flow.advance(&mut self.ledger, &self.catalog, &self.rules)?;
        self.after_reward_step(step)
    }

    /// # Errors
    ///
    /// Returns `InvalidStateTransition` outside of a reward flow, or a
    /// rejection for unknown or unaffordable buildings.
    pub fn select_building(&mut self, id: &BuildingId) -> Result<(), EngineError> {
        let flow = active_flow(&mut self.reward, &self.tiles, "select a building")?;
        flow.select_building(id, &self.ledger, &self.catalog)
    }

    /// Click a plot on the placement stage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` outside of placement, `UnknownPlot`,
    /// `NothingPlaceable`, or the ledger's rejection.
    pub fn select_placement_plot(&mut self, plot: PlotId) -> Result<PlacementResult, EngineError> {
        let flow = active_flow(&mut self.reward, &self.tiles, "place a building")?;
        let result = flow.select_plot(plot, &mut self.ledger, &self.catalog, &self.rules)?;
        if matches!(result, PlacementResult::Placed { .. }) {
            self.emit_ledger();
        }
        Ok(result)
    }

    /// # Errors
    ///
    /// Returns `InvalidStateTransition` outside of the next-goal stage, or
    /// `UnknownBuilding`.
    pub fn preview_goal(&mut self, id: &BuildingId) -> Result<GoalOption, EngineError> {
        let flow = active_flow(&mut self.reward, &self.tiles, "preview a goal")?;
        flow.preview_goal(id, &self.ledger, &self.catalog)
    }

    /// # Errors
    ///
    /// Returns `InsufficientWealth` or `InvalidStateTransition`.
    pub fn start_goal_module(&mut self) -> Result<(), EngineError> {
        let flow = active_flow(&mut self.reward, &self.tiles, "start a goal module")?;
        let step = flow.start_goal_module(&mut self.ledger, &self.catalog)?;
        self.after_reward_step(step)
    }

    /// # Errors
    ///
    /// Returns `InvalidStateTransition` on stages without the shortcut.
    pub fn skip_to_recap(&mut self) -> Result<(), EngineError> {
        let flow = active_flow(&mut self.reward, &self.tiles, "skip to recap")?;
        let step = flow.skip_to_recap(&mut self.ledger, &self.catalog)?;
        self.after_reward_step(step)
    }

    /// Begin a chapter quiz, abandoning any quiz already running.
    ///
    /// # Errors
    ///
    /// Returns `ChapterLocked` while the chapter's predicate fails.
    pub fn start_quiz(&mut self, chapter: ChapterId) -> Result<&QuizQuestion, EngineError> {
        if !chapter.is_unlocked(&self.ledger) {
            log::warn!("chapter {chapter} is still locked");
            return Err(EngineError::ChapterLocked {
                chapter: chapter.key().to_string(),
            });
        }
        let questions = self.quizzes.questions(chapter);
        if questions.is_empty() {
            return Err(EngineError::UnknownChapter {
                chapter: chapter.key().to_string(),
            });
        }
        log::debug!("quiz started for {chapter}");
        let session = self.quiz.insert(QuizSession::new(chapter, questions));
        session.current().ok_or_else(|| EngineError::UnknownChapter {
            chapter: chapter.key().to_string(),
        })
    }

    /// [`Self::start_quiz`] addressed by chapter key.
    ///
    /// # Errors
    ///
    /// Returns `UnknownChapter` for keys that name no chapter.
    pub fn start_quiz_by_key(&mut self, key: &str) -> Result<&QuizQuestion, EngineError> {
        let chapter = key
            .parse::<ChapterId>()
            .map_err(|()| EngineError::UnknownChapter {
                chapter: key.to_string(),
            })?;
        self.start_quiz(chapter)
    }

    /// Answer the current quiz question. The last answer scores and persists
    /// the chapter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` with no quiz running, `InvalidOption`,
    /// or `Storage` if the chapter blob cannot be written.
    pub fn answer_quiz_question(&mut self, option: usize) -> Result<QuizStep, EngineError> {
        let quiz = self
            .quiz
            .as_mut()
            .ok_or_else(|| EngineError::transition("no quiz running", "answer a quiz question"))?;
        let step = quiz.answer(option)?;
        if let QuizStep::Finished { result, .. } = step {
            self.quiz = None;
            let progress = ChapterProgress {
                stars: result.stars,
                completed_at: self.clock.now(),
            };
            log::info!(
                "quiz {} finished with {} stars",
                result.chapter,
                result.stars
            );
            if self.progress.record(result.chapter, progress) {
                self.store
                    .save_chapter(result.chapter, &progress)
                    .map_err(|err| EngineError::storage(&err))?;
            }
            self.sink.emit(GameEvent::QuizCompleted { result });
        }
        Ok(step)
    }

    /// Write the profile and every chapter blob.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    pub fn save(&self) -> Result<(), EngineError> {
        self.store
            .save_profile(&self.ledger.to_profile())
            .map_err(|err| EngineError::storage(&err))?;
        self.store
            .save_progress(&self.progress)
            .map_err(|err| EngineError::storage(&err))
    }

    /// Replace the ledger and chapter progress with what the store holds.
    /// Returns whether a profile was found.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` during a round, or `Storage` when the
    /// store fails or holds a corrupt blob.
    pub fn load(&mut self) -> Result<bool, EngineError> {
        if self.round_open || self.reward.is_some() {
            return Err(self.reject("load a profile"));
        }
        let profile = self
            .store
            .load_profile()
            .map_err(|err| EngineError::storage(&err))?;
        let progress = self
            .store
            .load_progress()
            .map_err(|err| EngineError::storage(&err))?;
        self.progress = progress;
        let found = profile.is_some();
        if let Some(profile) = profile {
            self.ledger = Ledger::from_profile(profile);
            log::info!(
                "loaded profile: wealth {}, {} buildings placed",
                self.ledger.wealth(),
                self.ledger.placed_buildings().len()
            );
            self.emit_ledger();
        }
        Ok(found)
    }

    fn after_resolution(&mut self, resolution: TurnResolution) {
        self.emit_ledger();
        if let Some(summary) = resolution.won {
            self.sink.emit(GameEvent::RoundWon {
                summary: summary.clone(),
            });
            self.reward = Some(RewardFlow::new(summary, &self.ledger, &self.catalog));
            self.sink.emit(GameEvent::RewardStageChanged {
                stage: RewardStage::Reveal,
            });
        }
    }

    fn after_reward_step(&mut self, step: StageStep) -> Result<(), EngineError> {
        match step {
            StageStep::Stayed => Ok(()),
            StageStep::Advanced(stage) => {
                if stage == RewardStage::Inventory {
                    self.emit_ledger();
                }
                self.sink.emit(GameEvent::RewardStageChanged { stage });
                Ok(())
            }
            StageStep::Completed(outcome) => {
                self.finish_round(outcome);
                self.save()
            }
        }
    }

    fn finish_round(&mut self, outcome: RewardOutcome) {
        self.sink.emit(GameEvent::RewardStageChanged {
            stage: RewardStage::Loop,
        });
        log::info!(
            "round {} complete: grade {}, town level {}",
            outcome.summary.round,
            outcome.grade.grade,
            outcome.town.level
        );
        self.sink.emit(GameEvent::RoundCompleted {
            outcome: Box::new(outcome),
        });
        self.reward = None;
        self.tiles.reset();
        self.round_open = false;
    }

    fn ensure_round_open(&self, command: &'static str) -> Result<(), EngineError> {
        if self.round_open && self.reward.is_none() {
            Ok(())
        } else {
            Err(self.reject(command))
        }
    }

    fn reject(&self, command: &'static str) -> EngineError {
        let phase = match (&self.reward, self.round_open) {
            (Some(flow), _) => flow.stage().label(),
            (None, false) => "between rounds",
            (None, true) => self.tiles.phase().label(),
        };
        log::warn!("rejected {command} while {phase}");
        EngineError::transition(phase, command)
    }

    fn emit_ledger(&mut self) {
        self.sink.emit(GameEvent::LedgerChanged {
            snapshot: Box::new(self.ledger.snapshot()),
        });
    }
}

fn active_flow<'a>(
    reward: &'a mut Option<RewardFlow>,
    tiles: &TileEngine,
    command: &'static str,
) -> Result<&'a mut RewardFlow, EngineError> {
    reward.as_mut().ok_or_else(|| {
        let phase = tiles.phase().label();
        log::warn!("rejected {command} while {phase}");
        EngineError::transition(phase, command)
    })
}
