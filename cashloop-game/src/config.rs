//! Tunable rules for a Cashloop round.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::TileKind;
use crate::constants::{
    BUDGET_AMOUNT, DICE_FACES, DICE_ROLL_MS, INTEREST_RATE_PERCENT, LAP_REPAYMENT,
    LOAN_TILE_BORROW, LOAN_TILE_OWED, PLACEMENT_SETTLE_MS, PROPERTY_LOAN_BORROW,
    PROPERTY_LOAN_OWED, PROPERTY_PRICE, REWARD_REVEAL_MS, SAVE_TILE_DEPOSIT, SCAM_LOSS,
    SCAM_REPORT_REWARD, START_TILE_CREDIT, STARTING_WALLET, TOKEN_MOVE_MS, TOWN_PLOTS,
    WIN_THRESHOLD,
};
use crate::progression::QuizBankError;

/// Errors raised when rules configuration invariants are violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("board must contain at least two tiles (got {len})")]
    BoardTooShort { len: usize },
    #[error("board must begin with a start tile (found {found})")]
    BoardMissingStart { found: TileKind },
    #[error("dice must have at least one face")]
    NoDiceFaces,
    #[error("{field} owes {owed}, less than the {borrow} borrowed")]
    LoanUnderwater {
        field: &'static str,
        borrow: u32,
        owed: u32,
    },
    #[error("interest rate {rate}% exceeds 100%")]
    InterestRateTooHigh { rate: u32 },
    #[error("win threshold must be positive")]
    ZeroWinThreshold,
    #[error("town must have at least one plot")]
    NoTownPlots,
    #[error(transparent)]
    Quiz(#[from] QuizBankError),
}

/// Borrow/owe pair offered by a loan decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub borrow: u32,
    pub owed: u32,
}

impl LoanTerms {
    #[must_use]
    pub const fn new(borrow: u32, owed: u32) -> Self {
        Self { borrow, owed }
    }
}

/// Per-tile amounts and the round-level economy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyRules {
    #[serde(default = "EconomyRules::default_starting_wallet")]
    pub starting_wallet: u32,
    #[serde(default = "EconomyRules::default_win_threshold")]
    pub win_threshold: u32,
    #[serde(default = "EconomyRules::default_start_credit")]
    pub start_credit: u32,
    #[serde(default = "EconomyRules::default_save_deposit")]
    pub save_deposit: u32,
    #[serde(default = "EconomyRules::default_interest_rate_percent")]
    pub interest_rate_percent: u32,
    #[serde(default = "EconomyRules::default_scam_loss")]
    pub scam_loss: u32,
    #[serde(default = "EconomyRules::default_scam_report_reward")]
    pub scam_report_reward: u32,
    #[serde(default = "EconomyRules::default_budget_amount")]
    pub budget_amount: u32,
    #[serde(default = "EconomyRules::default_property_price")]
    pub property_price: u32,
}

impl EconomyRules {
    const fn default_starting_wallet() -> u32 {
        STARTING_WALLET
    }

    const fn default_win_threshold() -> u32 {
        WIN_THRESHOLD
    }

    const fn default_start_credit() -> u32 {
        START_TILE_CREDIT
    }

    const fn default_save_deposit() -> u32 {
        SAVE_TILE_DEPOSIT
    }

    const fn default_interest_rate_percent() -> u32 {
        INTEREST_RATE_PERCENT
    }

    const fn default_scam_loss() -> u32 {
        SCAM_LOSS
    }

    const fn default_scam_report_reward() -> u32 {
        SCAM_REPORT_REWARD
    }

    const fn default_budget_amount() -> u32 {
        BUDGET_AMOUNT
    }

    const fn default_property_price() -> u32 {
        PROPERTY_PRICE
    }
}

impl Default for EconomyRules {
    fn default() -> Self {
        Self {
            starting_wallet: Self::default_starting_wallet(),
            win_threshold: Self::default_win_threshold(),
            start_credit: Self::default_start_credit(),
            save_deposit: Self::default_save_deposit(),
            interest_rate_percent: Self::default_interest_rate_percent(),
            scam_loss: Self::default_scam_loss(),
            scam_report_reward: Self::default_scam_report_reward(),
            budget_amount: Self::default_budget_amount(),
            property_price: Self::default_property_price(),
        }
    }
}

/// Loan offers and the automatic lap repayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanRules {
    pub loan_tile: LoanTerms,
    pub property_finance: LoanTerms,
    pub lap_repayment: u32,
}

impl Default for LoanRules {
    fn default() -> Self {
        Self {
            loan_tile: LoanTerms::new(LOAN_TILE_BORROW, LOAN_TILE_OWED),
            property_finance: LoanTerms::new(PROPERTY_LOAN_BORROW, PROPERTY_LOAN_OWED),
            lap_repayment: LAP_REPAYMENT,
        }
    }
}

/// Presentational delays. The engine only uses these to label pending timers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingRules {
    pub dice_roll_ms: u32,
    pub token_move_ms: u32,
    pub reward_reveal_ms: u32,
    pub placement_settle_ms: u32,
}

impl Default for PacingRules {
    fn default() -> Self {
        Self {
            dice_roll_ms: DICE_ROLL_MS,
            token_move_ms: TOKEN_MOVE_MS,
            reward_reveal_ms: REWARD_REVEAL_MS,
            placement_settle_ms: PLACEMENT_SETTLE_MS,
        }
    }
}

/// Complete rule set for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "RulesConfig::default_board")]
    pub board: Vec<TileKind>,
    #[serde(default = "RulesConfig::default_dice_faces")]
    pub dice_faces: u8,
    #[serde(default = "RulesConfig::default_town_plots")]
    pub town_plots: u8,
    #[serde(default)]
    pub economy: EconomyRules,
    #[serde(default)]
    pub loans: LoanRules,
    #[serde(default)]
    pub pacing: PacingRules,
}

impl RulesConfig {
    /// Reference rules used by the shipped board.
    #[must_use]
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Parse a rules file, filling omitted fields with reference values.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn default_board() -> Vec<TileKind> {
        use TileKind::{Budget, Interest, Loan, Normal, Property, Save, Scam, Start};
        vec![
            Start, Normal, Save, Scam, Budget, Interest, Property, Normal, Loan, Save, //
            Scam, Budget, Normal, Property, Interest, Save, Scam, Loan, Budget, Normal,
        ]
    }

    const fn default_dice_faces() -> u8 {
        DICE_FACES
    }

    const fn default_town_plots() -> u8 {
        TOWN_PLOTS
    }

    /// Number of tiles in the loop.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.board.len()
    }

    /// Check the invariants the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board.len() < 2 {
            return Err(ConfigError::BoardTooShort {
                len: self.board.len(),
            });
        }
        if self.board[0] != TileKind::Start {
            return Err(ConfigError::BoardMissingStart {
                found: self.board[0],
            });
        }
        if self.dice_faces == 0 {
            return Err(ConfigError::NoDiceFaces);
        }
        if self.town_plots == 0 {
            return Err(ConfigError::NoTownPlots);
        }
        if self.economy.win_threshold == 0 {
            return Err(ConfigError::ZeroWinThreshold);
        }
        if self.economy.interest_rate_percent > 100 {
            return Err(ConfigError::InterestRateTooHigh {
                rate: self.economy.interest_rate_percent,
            });
        }
        for (field, terms) in [
            ("loans.loan_tile", self.loans.loan_tile),
            ("loans.property_finance", self.loans.property_finance),
        ] {
            if terms.owed < terms.borrow {
                return Err(ConfigError::LoanUnderwater {
                    field,
                    borrow: terms.borrow,
                    owed: terms.owed,
                });
            }
        }
        Ok(())
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            board: Self::default_board(),
            dice_faces: Self::default_dice_faces(),
            town_plots: Self::default_town_plots(),
            economy: EconomyRules::default(),
            loans: LoanRules::default(),
            pacing: PacingRules::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_rules_validate() {
        let cfg = RulesConfig::default_config();
        assert_eq!(cfg.tile_count(), 20);
        assert_eq!(cfg.loans.lap_repayment, 40);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_reference_values() {
        let cfg = RulesConfig::from_json(r#"{ "economy": { "win_threshold": 300 } }"#).unwrap();
        assert_eq!(cfg.economy.win_threshold, 300);
        assert_eq!(cfg.economy.starting_wallet, STARTING_WALLET);
        assert_eq!(cfg.board, RulesConfig::default_board());
    }

    #[test]
    fn validation_rejects_bad_boards_and_loans() {
        let mut cfg = RulesConfig::default_config();
        cfg.board = vec![TileKind::Normal, TileKind::Start];
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::BoardMissingStart {
                found: TileKind::Normal
            })
        );

        let mut cfg = RulesConfig::default_config();
        cfg.loans.loan_tile = LoanTerms::new(100, 90);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::LoanUnderwater {
                field: "loans.loan_tile",
                ..
            })
        ));
    }
}
