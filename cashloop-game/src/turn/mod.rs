//! Dice-roll and tile-resolution state machine.
//!
//! `Idle → Rolling → Moving → AwaitingDecision → Idle`, ending in `RoundWon`
//! once the round net worth reaches the win threshold. Within one turn the lap
//! repayment runs before the tile effect, and the win check runs last.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Board, TileKind, TokenMove};
use crate::config::RulesConfig;
use crate::error::EngineError;
use crate::ledger::{Ledger, LedgerStats};
use crate::loan::{LapRepayment, apply_lap_repayment};
use crate::timers::{PendingTimer, TimerKind};

pub mod decision;
pub use decision::{
    ChoiceEffect, ChoiceId, ChoiceList, Decision, DecisionChoice, DisabledReason, apply_choice,
    build_decision,
};

/// Value object handed to the reward flow when a round is won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: u32,
    pub turns: u32,
    pub net_worth: u32,
    pub final_savings: u32,
    pub wallet: u32,
    pub holdings: u32,
    pub outstanding_loan: u32,
    pub stats: LedgerStats,
}

impl RoundSummary {
    #[must_use]
    pub fn from_ledger(ledger: &Ledger) -> Self {
        Self {
            round: ledger.round(),
            turns: ledger.turn(),
            net_worth: ledger.net_worth(),
            final_savings: ledger.savings(),
            wallet: ledger.wallet(),
            holdings: ledger.holdings(),
            outstanding_loan: ledger.loan().outstanding(),
            stats: ledger.stats().clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    Idle,
    Rolling { roll: u8 },
    Moving { step: TokenMove },
    AwaitingDecision(Decision),
    RoundWon(RoundSummary),
}

impl TurnPhase {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Rolling { .. } => "rolling",
            Self::Moving { .. } => "moving",
            Self::AwaitingDecision(_) => "awaiting a decision",
            Self::RoundWon(_) => "the round is won",
        }
    }
}

/// Token movement after the dice settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    pub step: TokenMove,
    pub lap: Option<LapRepayment>,
}

/// Outcome of applying a tile's effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResolution {
    pub effect: ChoiceEffect,
    pub won: Option<RoundSummary>,
}

/// What happened when the token arrived on its tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arrival {
    /// The player must pick a choice.
    Prompt(Decision),
    /// The tile had nothing to decide and has already resolved.
    Resolved(TurnResolution),
}

#[derive(Debug, Clone)]
pub struct TileEngine {
    phase: TurnPhase,
    rng: ChaCha20Rng,
}

impl TileEngine {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            phase: TurnPhase::Idle,
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub const fn phase(&self) -> &TurnPhase {
        &self.phase
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.phase, TurnPhase::Idle)
    }

    /// Open prompt, if any.
    #[must_use]
    pub const fn decision(&self) -> Option<&Decision> {
        match &self.phase {
            TurnPhase::AwaitingDecision(decision) => Some(decision),
            _ => None,
        }
    }

    /// Return to `Idle` for a fresh round.
    pub fn reset(&mut self) {
        self.phase = TurnPhase::Idle;
    }

    #[must_use]
    pub const fn pending_timer_kind(&self) -> Option<TimerKind> {
        match self.phase {
            TurnPhase::Rolling { .. } => Some(TimerKind::DiceRoll),
            TurnPhase::Moving { .. } => Some(TimerKind::TokenMove),
            _ => None,
        }
    }

    #[must_use]
    pub fn pending_timer(&self, rules: &RulesConfig) -> Option<PendingTimer> {
        self.pending_timer_kind()
            .map(|kind| PendingTimer::new(kind, &rules.pacing))
    }

    /// Draw a roll from the seeded dice. Only valid while idle.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` outside of `Idle`.
    pub fn roll_dice(&mut self, rules: &RulesConfig) -> Result<u8, EngineError> {
        self.ensure_idle("roll the dice")?;
        let roll = self.rng.gen_range(1..=rules.dice_faces.max(1));
        self.begin_roll(roll);
        Ok(roll)
    }

    /// Use a roll supplied by the host.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` outside of `Idle`, or `InvalidRoll`
    /// when the value is not a face of the configured dice.
    pub fn roll_with(&mut self, value: u8, rules: &RulesConfig) -> Result<u8, EngineError> {
        self.ensure_idle("roll the dice")?;
        if value == 0 || value > rules.dice_faces {
            return Err(EngineError::InvalidRoll {
                value,
                faces: rules.dice_faces,
            });
        }
        self.begin_roll(value);
        Ok(value)
    }

    fn begin_roll(&mut self, roll: u8) {
        log::debug!("dice rolled {roll}");
        self.phase = TurnPhase::Rolling { roll };
    }

    /// Dice timer fired: move the token, repaying the loan on a lap.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` unless rolling.
    pub fn finish_roll(
        &mut self,
        ledger: &mut Ledger,
        rules: &RulesConfig,
    ) -> Result<MoveReport, EngineError> {
        let TurnPhase::Rolling { roll } = self.phase else {
            return Err(EngineError::transition(
                self.phase.label(),
                "move the token",
            ));
        };
        let board = Board::new(&rules.board);
        let step = board.advance(ledger.board_position(), roll);
        let lap = step
            .lapped
            .then(|| apply_lap_repayment(ledger, &rules.loans));
        ledger.move_token(step.to);
        log::debug!(
            "token moved {} -> {} (lap: {})",
            step.from,
            step.to,
            step.lapped
        );
        self.phase = TurnPhase::Moving { step };
        Ok(MoveReport { step, lap })
    }

    /// Move timer fired: open the tile prompt, or resolve a passive tile.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` unless moving.
    pub fn finish_move(
        &mut self,
        ledger: &Ledger,
        rules: &RulesConfig,
    ) -> Result<Arrival, EngineError> {
        let TurnPhase::Moving { step } = self.phase else {
            return Err(EngineError::transition(
                self.phase.label(),
                "land on a tile",
            ));
        };
        let tile = Board::new(&rules.board).tile_at(step.to);
        let decision = build_decision(step.to, tile, ledger, rules);
        if decision.is_passive() {
            let effect = effect_snapshot(tile, None, ledger.wallet(), ledger);
            return Ok(Arrival::Resolved(self.settle(effect, ledger, rules)));
        }
        self.phase = TurnPhase::AwaitingDecision(decision.clone());
        Ok(Arrival::Prompt(decision))
    }

    /// Apply the player's choice on the open prompt.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` without an open prompt,
    /// `UnknownChoice`/`ChoiceUnavailable` for choices not on offer, or the
    /// ledger's rejection. State is unchanged on error.
    pub fn resolve(
        &mut self,
        choice: ChoiceId,
        ledger: &mut Ledger,
        rules: &RulesConfig,
    ) -> Result<TurnResolution, EngineError> {
        let TurnPhase::AwaitingDecision(decision) = &self.phase else {
            return Err(EngineError::transition(
                self.phase.label(),
                "resolve a tile decision",
            ));
        };
        let offered = decision
            .choice(choice)
            .ok_or_else(|| EngineError::UnknownChoice {
                choice: choice.key().to_string(),
            })?;
        if let Some(reason) = offered.disabled {
            return Err(EngineError::ChoiceUnavailable { choice, reason });
        }
        let tile = decision.tile;
        let wallet_before = ledger.wallet();
        apply_choice(tile, choice, ledger, rules)?;
        let effect = effect_snapshot(tile, Some(choice), wallet_before, ledger);
        log::debug!("resolved {tile} with {choice}");
        Ok(self.settle(effect, ledger, rules))
    }

    fn settle(
        &mut self,
        effect: ChoiceEffect,
        ledger: &Ledger,
        rules: &RulesConfig,
    ) -> TurnResolution {
        if ledger.net_worth() >= rules.economy.win_threshold {
            let summary = RoundSummary::from_ledger(ledger);
            log::info!(
                "round {} won on turn {} with net worth {}",
                summary.round,
                summary.turns,
                summary.net_worth
            );
            self.phase = TurnPhase::RoundWon(summary.clone());
            TurnResolution {
                effect,
                won: Some(summary),
            }
        } else {
            self.phase = TurnPhase::Idle;
            TurnResolution { effect, won: None }
        }
    }

    fn ensure_idle(&self, command: &'static str) -> Result<(), EngineError> {
        if self.is_idle() {
            Ok(())
        } else {
            log::warn!("rejected {command} while {}", self.phase.label());
            Err(EngineError::transition(self.phase.label(), command))
        }
    }
}

const fn effect_snapshot(
    tile: TileKind,
    choice: Option<ChoiceId>,
    wallet_before: u32,
    ledger: &Ledger,
) -> ChoiceEffect {
    ChoiceEffect {
        tile,
        choice,
        wallet_before,
        wallet_after: ledger.wallet(),
        savings_after: ledger.savings(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(wallet: u32) -> (TileEngine, Ledger, RulesConfig) {
        let mut ledger = Ledger::new();
        ledger.start_round(wallet);
        (TileEngine::new(7), ledger, RulesConfig::default_config())
    }

    #[test]
    fn second_roll_rejected_until_turn_finishes() {
        let (mut engine, mut ledger, rules) = setup(200);
        engine.roll_with(2, &rules).unwrap();
        assert!(matches!(
            engine.roll_dice(&rules),
            Err(EngineError::InvalidStateTransition { phase: "rolling", .. })
        ));
        engine.finish_roll(&mut ledger, &rules).unwrap();
        assert!(engine.roll_with(1, &rules).is_err());
        let arrival = engine.finish_move(&mut ledger, &rules).unwrap();
        let Arrival::Prompt(decision) = arrival else {
            panic!("save tile should prompt");
        };
        assert_eq!(decision.tile, TileKind::Save);
        assert!(engine.roll_with(1, &rules).is_err());
        engine.resolve(ChoiceId::Deposit, &mut ledger, &rules).unwrap();
        assert!(engine.is_idle());
        assert_eq!(ledger.savings(), 50);
    }

    #[test]
    fn seeded_rolls_stay_on_the_dice() {
        let (mut engine, mut ledger, rules) = setup(200);
        for _ in 0..50 {
            let roll = engine.roll_dice(&rules).unwrap();
            assert!((1..=6).contains(&roll));
            engine.finish_roll(&mut ledger, &rules).unwrap();
            if let Arrival::Prompt(decision) = engine.finish_move(&mut ledger, &rules).unwrap() {
                let choice = decision.enabled_choices().last().unwrap().id;
                engine.resolve(choice, &mut ledger, &rules).unwrap();
            }
            if matches!(engine.phase(), TurnPhase::RoundWon(_)) {
                break;
            }
        }
    }

    #[test]
    fn invalid_roll_values_rejected() {
        let (mut engine, _, rules) = setup(200);
        assert_eq!(
            engine.roll_with(0, &rules),
            Err(EngineError::InvalidRoll { value: 0, faces: 6 })
        );
        assert!(engine.roll_with(7, &rules).is_err());
        assert!(engine.is_idle());
    }

    #[test]
    fn normal_tile_resolves_on_arrival() {
        let (mut engine, mut ledger, rules) = setup(200);
        engine.roll_with(1, &rules).unwrap();
        engine.finish_roll(&mut ledger, &rules).unwrap();
        let arrival = engine.finish_move(&mut ledger, &rules).unwrap();
        assert!(matches!(arrival, Arrival::Resolved(TurnResolution { won: None, .. })));
        assert!(engine.is_idle());
        assert_eq!(ledger.board_position(), 1);
    }

    #[test]
    fn disabled_choice_is_rejected_without_side_effects() {
        let (mut engine, mut ledger, rules) = setup(10);
        engine.roll_with(2, &rules).unwrap();
        engine.finish_roll(&mut ledger, &rules).unwrap();
        engine.finish_move(&mut ledger, &rules).unwrap();
        let before = ledger.snapshot();
        assert_eq!(
            engine.resolve(ChoiceId::Deposit, &mut ledger, &rules),
            Err(EngineError::ChoiceUnavailable {
                choice: ChoiceId::Deposit,
                reason: DisabledReason::InsufficientFunds
            })
        );
        assert!(matches!(
            engine.resolve(ChoiceId::TakeLoan, &mut ledger, &rules),
            Err(EngineError::UnknownChoice { .. })
        ));
        assert_eq!(ledger, before);
        assert!(engine.decision().is_some());
    }

    #[test]
    fn lap_repays_before_tile_effect() {
        let (mut engine, mut ledger, rules) = setup(100);
        ledger.take_loan(100, 120).unwrap();
        ledger.repay_loan(80);
        for _ in 0..3 {
            engine.roll_with(6, &rules).unwrap();
            engine.finish_roll(&mut ledger, &rules).unwrap();
            if let Arrival::Prompt(decision) = engine.finish_move(&mut ledger, &rules).unwrap() {
                let choice = decision.enabled_choices().last().unwrap().id;
                engine.resolve(choice, &mut ledger, &rules).unwrap();
            }
        }
        assert_eq!(ledger.board_position(), 18);
        let wallet = ledger.wallet();
        engine.roll_with(2, &rules).unwrap();
        let report = engine.finish_roll(&mut ledger, &rules).unwrap();
        assert!(report.step.lapped);
        assert_eq!(report.lap.map(|lap| lap.cleared), Some(true));
        assert_eq!(ledger.wallet(), wallet - 40);
        assert!(ledger.stats().loans_history[0].fully_repaid);

        let Arrival::Prompt(decision) = engine.finish_move(&mut ledger, &rules).unwrap() else {
            panic!("start tile prompts a collect");
        };
        assert_eq!(decision.tile, TileKind::Start);
        engine.resolve(ChoiceId::Collect, &mut ledger, &rules).unwrap();
        assert_eq!(ledger.wallet(), wallet - 40 + 20);
    }

    #[test]
    fn reaching_threshold_wins_round() {
        let (mut engine, mut ledger, rules) = setup(490);
        engine.roll_with(3, &rules).unwrap();
        engine.finish_roll(&mut ledger, &rules).unwrap();
        engine.finish_move(&mut ledger, &rules).unwrap();
        let resolution = engine
            .resolve(ChoiceId::ReportScam, &mut ledger, &rules)
            .unwrap();
        assert!(resolution.won.is_some());
        assert!(!engine.is_idle());
        let summary = match engine.phase() {
            TurnPhase::RoundWon(summary) => summary.clone(),
            other => panic!("expected win, got {other:?}"),
        };
        assert!(summary.net_worth >= 500);
        assert!(engine.roll_dice(&rules).is_err());
    }
}
