//! Loan amortization applied when the token completes a lap.
use serde::{Deserialize, Serialize};

use crate::config::LoanRules;
use crate::ledger::Ledger;

/// What the lap repayment did to the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LapRepayment {
    /// Taken from the wallet (floored at an empty wallet).
    pub deducted: u32,
    /// Recorded against the loan balance.
    pub applied: u32,
    /// The loan was paid off by this lap.
    pub cleared: bool,
}

impl LapRepayment {
    #[must_use]
    pub const fn none() -> Self {
        Self {
            deducted: 0,
            applied: 0,
            cleared: false,
        }
    }

    /// The player paid less than the loan was credited with.
    #[must_use]
    pub const fn underpaid(&self) -> bool {
        self.deducted < self.applied
    }
}

/// Apply the automatic lap repayment if a loan is active.
///
/// The wallet deduction floors at zero while the loan is still credited with
/// the full installment (capped at what is owed).
pub fn apply_lap_repayment(ledger: &mut Ledger, rules: &LoanRules) -> LapRepayment {
    if !ledger.loan().active {
        return LapRepayment::none();
    }
    let installment = rules.lap_repayment;
    let deducted = ledger.debit_saturating(installment);
    let applied = ledger.repay_loan(installment);
    let cleared = !ledger.loan().active;
    if deducted < installment {
        log::warn!(
            "lap repayment short: wallet covered {deducted} of {installment}, loan credited {applied}"
        );
    }
    log::info!("lap repayment: deducted {deducted}, applied {applied}, cleared {cleared}");
    LapRepayment {
        deducted,
        applied,
        cleared,
    }
}
