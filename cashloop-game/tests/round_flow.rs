use cashloop_game::{
    BuildingId, ChoiceId, EngineError, EngineSetup, FixedClock, GameEngine, GameEvent, LoanTerms,
    MemoryStore, PlacementResult, PlotId, RecordingSink, RewardStage, TimerKind, TurnPhase,
};
use chrono::{TimeZone, Utc};

type Engine = GameEngine<MemoryStore, RecordingSink, FixedClock>;

fn clock() -> FixedClock {
    FixedClock(Utc.timestamp_opt(1_735_689_600, 0).single().unwrap())
}

fn engine_with_threshold(threshold: u32, seed: u64) -> (Engine, RecordingSink, MemoryStore) {
    let mut setup = EngineSetup::reference(seed);
    setup.rules.economy.win_threshold = threshold;
    let sink = RecordingSink::new();
    let store = MemoryStore::new();
    let engine = GameEngine::new(setup, store.clone(), sink.clone(), clock()).unwrap();
    (engine, sink, store)
}

fn take_turn(engine: &mut Engine, roll: u8) {
    engine.roll_with(roll).unwrap();
    engine.timer_elapsed(TimerKind::DiceRoll).unwrap();
    engine.timer_elapsed(TimerKind::TokenMove).unwrap();
}

/// Prefer growth: report scams, save, collect, decline debt.
fn cautious_choice(engine: &Engine) -> Option<ChoiceId> {
    let decision = engine.decision()?;
    let order = [
        ChoiceId::ReportScam,
        ChoiceId::Collect,
        ChoiceId::Deposit,
        ChoiceId::SaveForGoal,
        ChoiceId::BuyOutright,
        ChoiceId::Pass,
        ChoiceId::Decline,
        ChoiceId::Skip,
    ];
    order.into_iter().find(|id| {
        decision
            .choice(*id)
            .is_some_and(cashloop_game::DecisionChoice::is_enabled)
    })
}

#[test]
fn scripted_round_runs_every_reward_stage() {
    let (mut engine, sink, store) = engine_with_threshold(210, 1);
    engine.start_round().unwrap();

    take_turn(&mut engine, 3);
    engine
        .resolve_tile_decision(ChoiceId::ReportScam)
        .unwrap();
    assert!(matches!(engine.turn_phase(), TurnPhase::RoundWon(_)));
    assert_eq!(engine.reward_stage(), Some(RewardStage::Reveal));
    assert!(matches!(
        engine.roll_with(1),
        Err(EngineError::InvalidStateTransition { .. })
    ));
    assert!(engine.advance_reward_stage().is_err());

    engine.timer_elapsed(TimerKind::RewardReveal).unwrap();
    assert_eq!(engine.ledger().wealth(), 210);
    assert_eq!(engine.reward_stage(), Some(RewardStage::Inventory));

    let cottage = BuildingId::new("cottage");
    engine.select_building(&cottage).unwrap();
    engine.advance_reward_stage().unwrap();
    assert_eq!(engine.empty_plots().len(), 12);
    assert_eq!(
        engine.select_placement_plot(PlotId(7)).unwrap(),
        PlacementResult::Placed {
            plot: PlotId(7),
            building: cottage.clone()
        }
    );
    assert_eq!(engine.ledger().wealth(), 210 - 100 + 20);
    assert!(engine.ledger().is_unlocked(&cottage));

    engine.timer_elapsed(TimerKind::PlacementSettle).unwrap();
    assert_eq!(engine.reward_stage(), Some(RewardStage::TownUpdated));
    assert_eq!(engine.town().passive_income, 5);
    engine.advance_reward_stage().unwrap();

    let goals = engine.next_goals();
    assert_eq!(goals.len(), 3);
    assert_eq!(goals[0].id, BuildingId::new("bakery"));
    assert!(!goals[0].can_start);
    engine.preview_goal(&goals[0].id).unwrap();
    assert!(engine.start_goal_module().is_err());
    engine.skip_to_recap().unwrap();
    assert_eq!(engine.reward_stage(), Some(RewardStage::Recap));

    engine.advance_reward_stage().unwrap();
    assert_eq!(engine.reward_stage(), None);
    assert!(!engine.is_round_open());

    let events = sink.drain();
    let stages: Vec<RewardStage> = events
        .iter()
        .filter_map(|event| match event {
            GameEvent::RewardStageChanged { stage } => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(stages, RewardStage::ALL);
    let completed = events.iter().find_map(|event| match event {
        GameEvent::RoundCompleted { outcome } => Some(outcome),
        _ => None,
    });
    let outcome = completed.unwrap();
    assert_eq!(outcome.placed, Some((PlotId(7), cottage)));
    assert_eq!(outcome.summary.net_worth, 210);
    assert!(!store.is_empty());

    engine.start_round().unwrap();
    assert_eq!(engine.ledger().wallet(), 200 + 5);
    assert_eq!(engine.ledger().round(), 2);
}

#[test]
fn occupied_plot_is_ignored_and_placement_is_required() {
    let (mut engine, _, _) = engine_with_threshold(210, 2);
    engine.start_round().unwrap();
    take_turn(&mut engine, 3);
    engine
        .resolve_tile_decision(ChoiceId::ReportScam)
        .unwrap();
    engine.timer_elapsed(TimerKind::RewardReveal).unwrap();
    engine.advance_reward_stage().unwrap();
    assert_eq!(
        engine.advance_reward_stage(),
        Err(EngineError::PlacementPending)
    );
    assert!(matches!(
        engine.select_placement_plot(PlotId(40)),
        Err(EngineError::UnknownPlot { .. })
    ));
    engine.select_placement_plot(PlotId(0)).unwrap();
    assert!(matches!(
        engine.timer_elapsed(TimerKind::RewardReveal),
        Err(EngineError::UnexpectedTimer { .. })
    ));
}

#[test]
fn seeded_cautious_play_wins_reference_round() {
    let (mut engine, sink, _) = engine_with_threshold(500, 0x00C0_FFEE);
    engine.start_round().unwrap();
    let mut turns = 0;
    while engine.reward_stage().is_none() {
        assert!(turns < 5_000, "round should be winnable");
        engine.roll_dice().unwrap();
        engine.timer_elapsed(TimerKind::DiceRoll).unwrap();
        engine.timer_elapsed(TimerKind::TokenMove).unwrap();
        if let Some(choice) = cautious_choice(&engine) {
            engine.resolve_tile_decision(choice).unwrap();
        }
        let loan = engine.ledger().loan();
        assert!(loan.repaid <= loan.total_owed);
        turns += 1;
    }
    assert!(engine.ledger().net_worth() >= 500);
    assert!(sink.names().contains(&"round_won"));
}

#[test]
fn restarting_an_open_round_keeps_the_debt() {
    let (mut engine, _, _) = engine_with_threshold(500, 3);
    engine.start_round().unwrap();
    take_turn(&mut engine, 6);
    engine.resolve_tile_decision(ChoiceId::Pass).unwrap();
    take_turn(&mut engine, 2);
    engine.resolve_tile_decision(ChoiceId::TakeLoan).unwrap();
    assert_eq!(engine.ledger().loan().outstanding(), 120);

    assert!(matches!(
        engine.start_round(),
        Err(EngineError::InvalidStateTransition { .. })
    ));
    assert_eq!(engine.ledger().loan().outstanding(), 120);

    engine.abandon_round().unwrap();
    engine.start_round().unwrap();
    let ledger = engine.ledger();
    assert_eq!(ledger.round(), 2);
    assert_eq!(ledger.wallet(), 200);
    assert!(ledger.loan().active);
    assert_eq!(ledger.loan().outstanding(), 120);
    let record = &ledger.stats().loans_history[0];
    assert_eq!(ledger.loan().record_id, Some(record.id));
    assert!(!record.fully_repaid);
}

#[test]
fn winner_carries_unpaid_loan_into_next_round() {
    let mut setup = EngineSetup::reference(4);
    setup.rules.economy.win_threshold = 210;
    setup.rules.loans.loan_tile = LoanTerms::new(100, 100);
    let store = MemoryStore::new();
    let mut engine =
        GameEngine::new(setup.clone(), store.clone(), RecordingSink::new(), clock()).unwrap();
    engine.start_round().unwrap();
    take_turn(&mut engine, 6);
    engine.resolve_tile_decision(ChoiceId::Pass).unwrap();
    take_turn(&mut engine, 2);
    engine.resolve_tile_decision(ChoiceId::TakeLoan).unwrap();
    take_turn(&mut engine, 2);
    engine.resolve_tile_decision(ChoiceId::ReportScam).unwrap();
    assert_eq!(engine.reward_stage(), Some(RewardStage::Reveal));

    engine.timer_elapsed(TimerKind::RewardReveal).unwrap();
    engine.advance_reward_stage().unwrap();
    engine.select_placement_plot(PlotId(0)).unwrap();
    engine.timer_elapsed(TimerKind::PlacementSettle).unwrap();
    engine.advance_reward_stage().unwrap();
    engine.skip_to_recap().unwrap();
    engine.advance_reward_stage().unwrap();
    assert_eq!(engine.reward_stage(), None);

    engine.start_round().unwrap();
    assert_eq!(engine.ledger().loan().outstanding(), 100);
    take_turn(&mut engine, 6);
    engine.resolve_tile_decision(ChoiceId::Pass).unwrap();
    take_turn(&mut engine, 2);
    let decision = engine.decision().unwrap();
    assert!(
        !decision
            .choice(ChoiceId::TakeLoan)
            .is_some_and(cashloop_game::DecisionChoice::is_enabled)
    );

    let mut reloaded = GameEngine::new(setup, store, RecordingSink::new(), clock()).unwrap();
    assert_eq!(reloaded.load(), Ok(true));
    assert!(reloaded.ledger().loan().active);
    assert_eq!(reloaded.ledger().loan().outstanding(), 100);
}
