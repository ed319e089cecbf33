//! Engine command rejections.
//!
//! Everything here is recoverable: the rejected command leaves state as it
//! was, and the UI is expected to have disabled the control already.
use thiserror::Error;

use crate::buildings::{BuildingId, PlotId};
use crate::ledger::LedgerError;
use crate::timers::TimerKind;
use crate::turn::{ChoiceId, DisabledReason};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("cannot {command} while {phase}")]
    InvalidStateTransition {
        phase: &'static str,
        command: &'static str,
    },
    #[error("dice roll {value} outside 1..={faces}")]
    InvalidRoll { value: u8, faces: u8 },
    #[error("timer {fired} fired but {expected:?} was pending")]
    UnexpectedTimer {
        fired: TimerKind,
        expected: Option<TimerKind>,
    },
    #[error("choice {choice} is not offered on this tile")]
    UnknownChoice { choice: String },
    #[error("choice {choice} is unavailable: {reason}")]
    ChoiceUnavailable {
        choice: ChoiceId,
        reason: DisabledReason,
    },
    #[error("unknown building {building}")]
    UnknownBuilding { building: BuildingId },
    #[error("{plot} is not on the town map")]
    UnknownPlot { plot: PlotId },
    #[error("empty plots remain; place a building first")]
    PlacementPending,
    #[error("no owned or affordable building to place")]
    NothingPlaceable,
    #[error("unknown chapter {chapter}")]
    UnknownChapter { chapter: String },
    #[error("chapter {chapter} is locked")]
    ChapterLocked { chapter: String },
    #[error("option {index} out of range ({options} options)")]
    InvalidOption { index: usize, options: usize },
    #[error("persistence failed: {message}")]
    Storage { message: String },
}

impl EngineError {
    pub(crate) const fn transition(phase: &'static str, command: &'static str) -> Self {
        Self::InvalidStateTransition { phase, command }
    }

    pub(crate) fn storage(err: &dyn std::error::Error) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Storage { message }
    }
}
