//! Presentational delays between engine transitions.
//!
//! The engine never sleeps. A transition that the UI paces behind an animation
//! is parked until the host reports that the matching timer fired; headless
//! hosts fire it immediately.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PacingRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Dice tumble before the token moves.
    DiceRoll,
    /// Token walk before the tile prompt opens.
    TokenMove,
    /// Reward reveal before wealth is credited.
    RewardReveal,
    /// Building settle animation after placement.
    PlacementSettle,
}

impl TimerKind {
    #[must_use]
    pub const fn delay_ms(self, pacing: &PacingRules) -> u32 {
        match self {
            Self::DiceRoll => pacing.dice_roll_ms,
            Self::TokenMove => pacing.token_move_ms,
            Self::RewardReveal => pacing.reward_reveal_ms,
            Self::PlacementSettle => pacing.placement_settle_ms,
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::DiceRoll => "dice_roll",
            Self::TokenMove => "token_move",
            Self::RewardReveal => "reward_reveal",
            Self::PlacementSettle => "placement_settle",
        };
        f.write_str(label)
    }
}

/// A timer the host must fire before the engine can continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTimer {
    pub kind: TimerKind,
    pub delay_ms: u32,
}

impl PendingTimer {
    #[must_use]
    pub const fn new(kind: TimerKind, pacing: &PacingRules) -> Self {
        Self {
            kind,
            delay_ms: kind.delay_ms(pacing),
        }
    }
}
