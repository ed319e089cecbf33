//! Cashloop Game Engine
//!
//! Platform-agnostic rules engine for the Cashloop financial-literacy board
//! game: dice and tile resolution, the economic ledger, loan repayment on
//! laps, the seven-stage reward flow, and chapter quizzes. Rendering, timers
//! and storage belong to the host.

pub mod board;
pub mod buildings;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod loan;
pub mod progression;
pub mod reward;
pub mod storage;
pub mod timers;
pub mod turn;

// Re-export commonly used types
pub use board::{Board, TileKind, TokenMove};
pub use buildings::{BuildingCatalog, BuildingDef, BuildingId, PlotId, town_level};
pub use config::{ConfigError, EconomyRules, LoanRules, LoanTerms, PacingRules, RulesConfig};
pub use engine::{EngineSetup, GameEngine};
pub use error::EngineError;
pub use events::{EventSink, GameEvent, NullSink, RecordingSink};
pub use ledger::{
    Ledger, LedgerError, LedgerStats, LoanRecord, LoanState, PersistedProfile, TurnStamp,
};
pub use loan::{LapRepayment, apply_lap_repayment};
pub use progression::{
    ChapterId, ChapterProgress, ChapterStatus, Clock, FixedClock, ProgressBook, QuizBank,
    QuizBankError, QuizQuestion, QuizResult, QuizSession, QuizStep, SystemClock,
};
pub use reward::{
    BuildingCard, GoalOption, Grade, PlacementResult, RecapGrade, RewardFlow, RewardOutcome,
    RewardStage, StageStep, TownView, recap_grade,
};
pub use storage::{KeyValueStore, MemoryStore, ProfileStore, StorageError};
pub use timers::{PendingTimer, TimerKind};
pub use turn::{
    Arrival, ChoiceEffect, ChoiceId, Decision, DecisionChoice, DisabledReason, MoveReport,
    RoundSummary, TileEngine, TurnPhase, TurnResolution,
};

/// Trait for abstracting where rules and content come from.
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the rules for a round.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules cannot be loaded or parsed.
    fn load_rules(&self) -> Result<RulesConfig, Self::Error>;

    /// Load the building catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded or parsed.
    fn load_catalog(&self) -> Result<BuildingCatalog, Self::Error>;

    /// Load the chapter quizzes.
    ///
    /// # Errors
    ///
    /// Returns an error if the quizzes cannot be loaded or parsed.
    fn load_quizzes(&self) -> Result<QuizBank, Self::Error>;
}

/// Loader serving the content compiled into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinData;

impl DataLoader for BuiltinData {
    type Error = std::convert::Infallible;

    fn load_rules(&self) -> Result<RulesConfig, Self::Error> {
        Ok(RulesConfig::default_config())
    }

    fn load_catalog(&self) -> Result<BuildingCatalog, Self::Error> {
        Ok(BuildingCatalog::default_catalog())
    }

    fn load_quizzes(&self) -> Result<QuizBank, Self::Error> {
        Ok(QuizBank::default_bank())
    }
}

impl EngineSetup {
    /// Gather rules and content through `loader`.
    ///
    /// # Errors
    ///
    /// Returns the loader's first failure.
    pub fn from_loader<L: DataLoader>(loader: &L, seed: u64) -> Result<Self, L::Error> {
        Ok(Self {
            rules: loader.load_rules()?,
            catalog: loader.load_catalog()?,
            quizzes: loader.load_quizzes()?,
            seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Clone, Copy, Default)]
    struct ShortBoardLoader;

    impl DataLoader for ShortBoardLoader {
        type Error = Infallible;

        fn load_rules(&self) -> Result<RulesConfig, Self::Error> {
            let mut rules = RulesConfig::default_config();
            rules.board = vec![TileKind::Start, TileKind::Save, TileKind::Scam];
            Ok(rules)
        }

        fn load_catalog(&self) -> Result<BuildingCatalog, Self::Error> {
            Ok(BuildingCatalog::default_catalog())
        }

        fn load_quizzes(&self) -> Result<QuizBank, Self::Error> {
            Ok(QuizBank::default_bank())
        }
    }

    #[test]
    fn builtin_loader_matches_reference_setup() {
        let setup = EngineSetup::from_loader(&BuiltinData, 3).unwrap();
        assert_eq!(setup.rules, EngineSetup::reference(3).rules);
        assert_eq!(setup.catalog.len(), 9);
    }

    #[test]
    fn engine_accepts_custom_board() {
        let setup = EngineSetup::from_loader(&ShortBoardLoader, 9).unwrap();
        let mut engine = GameEngine::new(setup, MemoryStore::new(), NullSink, SystemClock)
            .unwrap();
        engine.start_round().unwrap();
        engine.roll_with(4).unwrap();
        engine.timer_elapsed(TimerKind::DiceRoll).unwrap();
        assert_eq!(engine.ledger().board_position(), 1);
    }

    #[test]
    fn engine_rejects_invalid_rules() {
        let mut setup = EngineSetup::reference(1);
        setup.rules.town_plots = 0;
        assert!(matches!(
            GameEngine::new(setup, MemoryStore::new(), NullSink, SystemClock),
            Err(ConfigError::NoTownPlots)
        ));
    }
}
