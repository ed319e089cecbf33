//! Ledger properties that must hold after every engine command.
use cashloop_game::Ledger;

/// Compare the ledger before and after one command. Returns every broken
/// property as a readable line.
#[must_use]
pub fn check_transition(before: &Ledger, after: &Ledger, tile_count: usize) -> Vec<String> {
    let mut violations = Vec::new();
    let loan = after.loan();

    if loan.repaid > loan.total_owed {
        violations.push(format!(
            "loan repaid {} exceeds total owed {}",
            loan.repaid, loan.total_owed
        ));
    }
    if loan.total_owed > 0 && loan.active == (loan.repaid == loan.total_owed) {
        violations.push(format!(
            "loan active={} with repaid {} of {}",
            loan.active, loan.repaid, loan.total_owed
        ));
    }
    if loan.total_owed == 0 && (loan.active || loan.repaid != 0) {
        violations.push("never-taken loan is not empty".to_string());
    }
    if before.loan().active && !loan.active && loan.repaid < loan.total_owed.max(1) {
        violations.push("active loan vanished without being repaid".to_string());
    }
    for record in &after.stats().loans_history {
        if !record.fully_repaid && loan.record_id != Some(record.id) {
            violations.push(format!("unpaid loan record {} has no active loan", record.id));
        }
    }
    if after.board_position() >= tile_count.max(1) {
        violations.push(format!(
            "board position {} off a {tile_count}-tile board",
            after.board_position()
        ));
    }

    for id in before.unlocked_buildings() {
        if !after.is_unlocked(id) {
            violations.push(format!("building {id} was locked again"));
        }
    }
    for (plot, building) in before.placed_buildings() {
        if after.placed_buildings().get(plot) != Some(building) {
            violations.push(format!("{plot} lost or replaced {building}"));
        }
    }

    let (old, new) = (before.stats(), after.stats());
    if new.loans_history.len() < old.loans_history.len() {
        violations.push("loan history shrank".to_string());
    }
    for (prev, now) in old.loans_history.iter().zip(&new.loans_history) {
        if prev.fully_repaid && prev != now {
            violations.push(format!("repaid loan record {} changed", prev.id));
        }
    }
    if new.total_saved < old.total_saved
        || new.total_interest_earned < old.total_interest_earned
        || new.scams_encountered < old.scams_encountered
        || new.scams_avoided < old.scams_avoided
    {
        violations.push("lifetime stats went backwards".to_string());
    }
    if new.scams_avoided > new.scams_encountered {
        violations.push("more scams avoided than encountered".to_string());
    }
    violations
}
