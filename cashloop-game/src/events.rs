//! Notifications for renderers and hosts.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use crate::board::TileKind;
use crate::ledger::Ledger;
use crate::loan::LapRepayment;
use crate::progression::QuizResult;
use crate::reward::{RewardOutcome, RewardStage};
use crate::turn::{Decision, RoundSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEvent {
    DiceResult { roll: u8 },
    LapCompleted { repayment: LapRepayment },
    TileLanded { index: usize, tile: TileKind },
    DecisionPresented { decision: Decision },
    LedgerChanged { snapshot: Box<Ledger> },
    RoundWon { summary: RoundSummary },
    RewardStageChanged { stage: RewardStage },
    RoundCompleted { outcome: Box<RewardOutcome> },
    QuizCompleted { result: QuizResult },
}

impl GameEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DiceResult { .. } => "dice_result",
            Self::LapCompleted { .. } => "lap_completed",
            Self::TileLanded { .. } => "tile_landed",
            Self::DecisionPresented { .. } => "decision_presented",
            Self::LedgerChanged { .. } => "ledger_changed",
            Self::RoundWon { .. } => "round_won",
            Self::RewardStageChanged { .. } => "reward_stage_changed",
            Self::RoundCompleted { .. } => "round_completed",
            Self::QuizCompleted { .. } => "quiz_completed",
        }
    }
}

pub trait EventSink {
    fn emit(&mut self, event: GameEvent);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: GameEvent) {}
}

/// Keeps every event. Clones share one log, so a host can hand one clone to
/// the engine and read from another.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<GameEvent>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    #[must_use]
    pub fn drain(&self) -> Vec<GameEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(GameEvent::name).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: GameEvent) {
        log::debug!("event {}", event.name());
        self.events.borrow_mut().push(event);
    }
}
