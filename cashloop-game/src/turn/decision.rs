//! Per-tile decision prompts and their ledger effects.
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::fmt;
use std::str::FromStr;

use crate::board::TileKind;
use crate::config::RulesConfig;
use crate::ledger::{Ledger, LedgerError};

/// Choice identifiers the UI sends back with `resolve_tile_decision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceId {
    Collect,
    Deposit,
    Skip,
    FallForScam,
    ReportScam,
    SpendOnWant,
    SaveForGoal,
    BuyOutright,
    Finance,
    Pass,
    TakeLoan,
    Decline,
}

impl ChoiceId {
    pub const ALL: [Self; 12] = [
        Self::Collect,
        Self::Deposit,
        Self::Skip,
        Self::FallForScam,
        Self::ReportScam,
        Self::SpendOnWant,
        Self::SaveForGoal,
        Self::BuyOutright,
        Self::Finance,
        Self::Pass,
        Self::TakeLoan,
        Self::Decline,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::Deposit => "deposit",
            Self::Skip => "skip",
            Self::FallForScam => "fall_for_scam",
            Self::ReportScam => "report_scam",
            Self::SpendOnWant => "spend_on_want",
            Self::SaveForGoal => "save_for_goal",
            Self::BuyOutright => "buy_outright",
            Self::Finance => "finance",
            Self::Pass => "pass",
            Self::TakeLoan => "take_loan",
            Self::Decline => "decline",
        }
    }
}

impl fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ChoiceId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|choice| choice.key().eq_ignore_ascii_case(needle))
            .ok_or(())
    }
}

/// Why a choice is greyed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledReason {
    InsufficientFunds,
    LoanAlreadyActive,
}

impl fmt::Display for DisabledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientFunds => f.write_str("insufficient funds"),
            Self::LoanAlreadyActive => f.write_str("a loan is already active"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionChoice {
    pub id: ChoiceId,
    /// Coins involved, for display.
    pub amount: u32,
    #[serde(default)]
    pub disabled: Option<DisabledReason>,
}

impl DecisionChoice {
    const fn enabled(id: ChoiceId, amount: u32) -> Self {
        Self {
            id,
            amount,
            disabled: None,
        }
    }

    const fn gated(id: ChoiceId, amount: u32, disabled: Option<DisabledReason>) -> Self {
        Self {
            id,
            amount,
            disabled,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.disabled.is_none()
    }
}

pub type ChoiceList = SmallVec<[DecisionChoice; 3]>;

/// Prompt presented after the token lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub tile_index: usize,
    pub tile: TileKind,
    pub choices: ChoiceList,
}

impl Decision {
    #[must_use]
    pub fn choice(&self, id: ChoiceId) -> Option<&DecisionChoice> {
        self.choices.iter().find(|choice| choice.id == id)
    }

    pub fn enabled_choices(&self) -> impl Iterator<Item = &DecisionChoice> {
        self.choices.iter().filter(|choice| choice.is_enabled())
    }

    /// Nothing to decide; the tile resolves on arrival.
    #[must_use]
    pub fn is_passive(&self) -> bool {
        self.choices.is_empty()
    }
}

fn funds_gate(ledger: &Ledger, amount: u32) -> Option<DisabledReason> {
    (!ledger.can_afford(amount)).then_some(DisabledReason::InsufficientFunds)
}

fn loan_gate(ledger: &Ledger) -> Option<DisabledReason> {
    ledger
        .loan()
        .active
        .then_some(DisabledReason::LoanAlreadyActive)
}

/// Build the prompt for `tile`, greying out anything the ledger cannot cover.
#[must_use]
pub fn build_decision(
    tile_index: usize,
    tile: TileKind,
    ledger: &Ledger,
    rules: &RulesConfig,
) -> Decision {
    let economy = &rules.economy;
    let choices: ChoiceList = match tile {
        TileKind::Start => smallvec![DecisionChoice::enabled(
            ChoiceId::Collect,
            economy.start_credit
        )],
        TileKind::Save => smallvec![
            DecisionChoice::gated(
                ChoiceId::Deposit,
                economy.save_deposit,
                funds_gate(ledger, economy.save_deposit)
            ),
            DecisionChoice::enabled(ChoiceId::Skip, 0),
        ],
        TileKind::Interest => {
            let bonus =
                u64::from(ledger.savings()) * u64::from(economy.interest_rate_percent) / 100;
            smallvec![DecisionChoice::enabled(
                ChoiceId::Collect,
                u32::try_from(bonus).unwrap_or(u32::MAX)
            )]
        }
        TileKind::Scam => smallvec![
            DecisionChoice::enabled(
                ChoiceId::FallForScam,
                economy.scam_loss.min(ledger.wallet())
            ),
            DecisionChoice::enabled(ChoiceId::ReportScam, economy.scam_report_reward),
        ],
        TileKind::Budget => {
            let gate = funds_gate(ledger, economy.budget_amount);
            let mut choices: ChoiceList = smallvec![
                DecisionChoice::gated(ChoiceId::SpendOnWant, economy.budget_amount, gate),
                DecisionChoice::gated(ChoiceId::SaveForGoal, economy.budget_amount, gate),
            ];
            if gate.is_some() {
                choices.push(DecisionChoice::enabled(ChoiceId::Skip, 0));
            }
            choices
        }
        TileKind::Property => {
            let finance = rules.loans.property_finance;
            smallvec![
                DecisionChoice::gated(
                    ChoiceId::BuyOutright,
                    economy.property_price,
                    funds_gate(ledger, economy.property_price)
                ),
                DecisionChoice::gated(ChoiceId::Finance, finance.owed, finance_gate(ledger, rules)),
                DecisionChoice::enabled(ChoiceId::Pass, 0),
            ]
        }
        TileKind::Loan => smallvec![
            DecisionChoice::gated(
                ChoiceId::TakeLoan,
                rules.loans.loan_tile.borrow,
                loan_gate(ledger)
            ),
            DecisionChoice::enabled(ChoiceId::Decline, 0),
        ],
        TileKind::Normal => ChoiceList::new(),
    };
    Decision {
        tile_index,
        tile,
        choices,
    }
}

fn finance_gate(ledger: &Ledger, rules: &RulesConfig) -> Option<DisabledReason> {
    if let Some(reason) = loan_gate(ledger) {
        return Some(reason);
    }
    // The loan proceeds must cover the purchase together with the wallet.
    let reachable = ledger
        .wallet()
        .saturating_add(rules.loans.property_finance.borrow);
    (reachable < rules.economy.property_price).then_some(DisabledReason::InsufficientFunds)
}

/// Ledger effect of a resolved choice, for events and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceEffect {
    pub tile: TileKind,
    pub choice: Option<ChoiceId>,
    pub wallet_before: u32,
    pub wallet_after: u32,
    pub savings_after: u32,
}

/// Apply an enabled choice to the ledger.
///
/// Callers check `is_enabled` first; the ledger still rejects anything that
/// would break its invariants, leaving state untouched.
///
/// # Errors
///
/// Propagates ledger rejections.
pub fn apply_choice(
    tile: TileKind,
    choice: ChoiceId,
    ledger: &mut Ledger,
    rules: &RulesConfig,
) -> Result<(), LedgerError> {
    let economy = &rules.economy;
    match (tile, choice) {
        (TileKind::Start, ChoiceId::Collect) => ledger.credit(economy.start_credit),
        (TileKind::Save, ChoiceId::Deposit) => ledger.deposit(economy.save_deposit)?,
        (TileKind::Interest, ChoiceId::Collect) => {
            ledger.apply_interest(economy.interest_rate_percent);
        }
        (TileKind::Scam, ChoiceId::FallForScam) => {
            ledger.debit_saturating(economy.scam_loss);
            ledger.record_scam(false);
        }
        (TileKind::Scam, ChoiceId::ReportScam) => {
            ledger.credit(economy.scam_report_reward);
            ledger.record_scam(true);
        }
        (TileKind::Budget, ChoiceId::SpendOnWant) => ledger.debit(economy.budget_amount)?,
        (TileKind::Budget, ChoiceId::SaveForGoal) => ledger.deposit(economy.budget_amount)?,
        (TileKind::Property, ChoiceId::BuyOutright) => {
            ledger.buy_property(economy.property_price)?
        }
        (TileKind::Property, ChoiceId::Finance) => {
            let terms = rules.loans.property_finance;
            if ledger.wallet().saturating_add(terms.borrow) < economy.property_price {
                return Err(LedgerError::InsufficientFunds {
                    needed: economy.property_price,
                    available: ledger.wallet().saturating_add(terms.borrow),
                });
            }
            ledger.take_loan(terms.borrow, terms.owed)?;
            ledger.buy_property(economy.property_price)?;
        }
        (TileKind::Loan, ChoiceId::TakeLoan) => {
            let terms = rules.loans.loan_tile;
            ledger.take_loan(terms.borrow, terms.owed)?;
        }
        _ => {}
    }
    Ok(())
}
