use cashloop_game::{
    BuildingId, Ledger, LedgerError, LoanRules, PlotId, apply_lap_repayment,
};

fn fresh(wallet: u32) -> Ledger {
    let mut ledger = Ledger::new();
    ledger.start_round(wallet);
    ledger
}

#[test]
fn deposit_moves_wallet_into_savings() {
    let mut ledger = fresh(200);
    ledger.deposit(50).unwrap();
    assert_eq!(ledger.wallet(), 150);
    assert_eq!(ledger.savings(), 50);
    assert_eq!(ledger.stats().total_saved, 50);
}

#[test]
fn interest_is_floored_and_tracked() {
    let mut ledger = fresh(400);
    ledger.deposit(200).unwrap();
    assert_eq!(ledger.apply_interest(10), 20);
    assert_eq!(ledger.savings(), 220);
    assert_eq!(ledger.apply_interest(10), 22);
    assert_eq!(ledger.stats().total_interest_earned, 42);

    let mut odd = fresh(15);
    odd.deposit(15).unwrap();
    assert_eq!(odd.apply_interest(10), 1);
}

#[test]
fn taking_a_loan_appends_a_record() {
    let mut ledger = fresh(50);
    let record = ledger.take_loan(100, 120).unwrap().clone();
    assert!(!record.fully_repaid);
    assert_eq!(record.borrowed_amount, 100);
    let loan = ledger.loan();
    assert!(loan.active);
    assert_eq!(
        (loan.principal, loan.total_owed, loan.repaid),
        (100, 120, 0)
    );
    assert_eq!(ledger.wallet(), 150);
    assert_eq!(
        ledger.take_loan(100, 120).map(|r| r.id),
        Err(LedgerError::LoanAlreadyActive)
    );
    assert_eq!(ledger.stats().loans_history.len(), 1);
}

#[test]
fn final_lap_clears_the_loan() {
    let mut ledger = fresh(100);
    ledger.take_loan(100, 120).unwrap();
    ledger.repay_loan(80);
    let lap = apply_lap_repayment(&mut ledger, &LoanRules::default());
    assert!(lap.cleared);
    assert_eq!(ledger.loan().repaid, 120);
    assert!(!ledger.loan().active);
    assert!(ledger.stats().loans_history[0].fully_repaid);

    let after = apply_lap_repayment(&mut ledger, &LoanRules::default());
    assert_eq!(after.deducted, 0);
}

#[test]
fn short_wallet_still_records_full_lap_payment() {
    let mut ledger = fresh(0);
    ledger.take_loan(100, 120).unwrap();
    ledger.debit(90).unwrap();
    let lap = apply_lap_repayment(&mut ledger, &LoanRules::default());
    assert_eq!(lap.deducted, 10);
    assert_eq!(lap.applied, 40);
    assert!(lap.underpaid());
    assert_eq!(ledger.wallet(), 0);
    assert_eq!(ledger.loan().repaid, 40);
}

#[test]
fn placing_a_locked_building_changes_nothing() {
    let mut ledger = fresh(200);
    ledger.claim_reward(600, 0);
    let before = ledger.snapshot();
    let house = BuildingId::new("house");
    assert_eq!(
        ledger.place_building(PlotId(7), &house, 10),
        Err(LedgerError::BuildingNotOwned { building: house })
    );
    assert_eq!(ledger, before);
}

#[test]
fn unlocking_twice_charges_once() {
    let mut ledger = fresh(0);
    ledger.claim_reward(500, 0);
    let bank = BuildingId::new("bank");
    assert_eq!(ledger.unlock_building(&bank, 400), Ok(true));
    assert_eq!(ledger.unlock_building(&bank, 400), Ok(false));
    assert_eq!(ledger.wealth(), 100);
}

#[test]
fn ledger_survives_json_round_trip() {
    let mut ledger = fresh(300);
    ledger.deposit(100).unwrap();
    ledger.take_loan(150, 180).unwrap();
    ledger.buy_property(150).unwrap();
    ledger.record_scam(false);
    ledger.record_scam(true);
    ledger.claim_reward(400, 100);
    let cottage = BuildingId::new("cottage");
    ledger.unlock_building(&cottage, 100).unwrap();
    ledger.place_building(PlotId(2), &cottage, 20).unwrap();

    let json = serde_json::to_string(&ledger).unwrap();
    let restored: Ledger = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, ledger.snapshot());
}

#[test]
fn buildings_only_accumulate() {
    let mut ledger = fresh(0);
    ledger.claim_reward(1_000, 0);
    let cottage = BuildingId::new("cottage");
    ledger.unlock_building(&cottage, 100).unwrap();
    ledger.place_building(PlotId(0), &cottage, 20).unwrap();
    assert_eq!(
        ledger.place_building(PlotId(0), &cottage, 20),
        Err(LedgerError::PlotOccupied { plot: PlotId(0) })
    );
    ledger.start_round(200);
    assert!(ledger.is_unlocked(&cottage));
    assert_eq!(ledger.placed_buildings().get(&PlotId(0)), Some(&cottage));
}
