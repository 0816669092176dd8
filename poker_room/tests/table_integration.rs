//! Table actor integration tests.
//!
//! Drives tables through `TableManager` and `TableHandle` with in-memory
//! stores, checking what players see, what gets persisted and where the
//! chips end up.

use poker_room::{
    db::{MemoryTableStore, MemoryWallet, SeatRecordStatus, TableStore, WalletStore},
    game::{Action, Chips, GamePhase, PlayerId, SeatIndex, SeatStatus},
    table::{
        EventBus, EventPublisher, TableConfig, TableEvent, TableHandle, TableManager,
        TableResponse, TableSpeed,
    },
    wallet::EntryType,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

const TABLE: i64 = 1;

struct Fixture {
    manager: TableManager,
    store: Arc<MemoryTableStore>,
    wallet: Arc<MemoryWallet>,
    events: Arc<EventBus>,
}

fn config() -> TableConfig {
    TableConfig {
        name: "Integration".to_string(),
        small_blind: 5,
        big_blind: 10,
        min_buy_in_bb: 10,
        max_buy_in_bb: 100,
        ..Default::default()
    }
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryTableStore::new());
    let wallet = Arc::new(MemoryWallet::new());
    let events = Arc::new(EventBus::new());
    let manager = TableManager::new(store.clone(), wallet.clone(), events.clone());
    Fixture {
        manager,
        store,
        wallet,
        events,
    }
}

/// Table with every player funded with 1000 chips and seated.
async fn table_with(
    config: TableConfig,
    players: &[(PlayerId, SeatIndex, Chips)],
) -> (Fixture, TableHandle) {
    let fx = fixture();
    let table = fx.manager.create_table(TABLE, config).await.unwrap();
    for &(player_id, seat, buy_in) in players {
        fx.wallet.deposit(player_id, 1_000).await;
        let response = table
            .sit_down(player_id, format!("player{player_id}"), seat, buy_in)
            .await
            .unwrap();
        assert_eq!(response, TableResponse::Success);
    }
    (fx, table)
}

// ============================================================================
// Betting through the actor
// ============================================================================

#[tokio::test]
async fn test_three_handed_preflop_round() {
    let (fx, table) = table_with(config(), &[(1, 0, 100), (2, 1, 100), (3, 2, 100)]).await;

    assert!(table.start_hand().await.unwrap().is_success());
    let state = table.state(None).await.unwrap();
    assert_eq!(state.dealer_seat, Some(0));
    assert_eq!(state.small_blind_seat, Some(1));
    assert_eq!(state.big_blind_seat, Some(2));
    assert_eq!(state.active_seat, Some(0));
    assert_eq!(state.pot, 15);

    assert_eq!(table.place_bet(1, Action::Call).await.unwrap(), TableResponse::Success);
    let state = table.state(None).await.unwrap();
    assert_eq!(state.seat(0).unwrap().stack, 90);
    assert_eq!(state.pot, 25);

    assert_eq!(table.place_bet(2, Action::Call).await.unwrap(), TableResponse::Success);
    assert_eq!(table.state(None).await.unwrap().pot, 30);

    assert_eq!(table.place_bet(3, Action::Check).await.unwrap(), TableResponse::Success);
    let state = table.state(None).await.unwrap();
    assert_eq!(state.phase, GamePhase::Flop);
    assert_eq!(state.pot, 30);
    assert_eq!(state.community_cards.len(), 3);
    assert_eq!(state.active_seat, Some(1));

    // Buy-ins sit in escrow while the hand plays out
    assert_eq!(fx.wallet.escrow_balance(TABLE).await, 300);
    assert_eq!(fx.wallet.balance(1).await.unwrap(), 900);
}

#[tokio::test]
async fn test_out_of_turn_action_changes_nothing() {
    let (fx, table) = table_with(config(), &[(1, 0, 100), (2, 1, 100), (3, 2, 100)]).await;
    table.start_hand().await.unwrap();
    let before = table.state(None).await.unwrap();

    let response = table.place_bet(3, Action::Raise(20)).await.unwrap();
    assert_eq!(response, TableResponse::NotYourTurn);

    let after = table.state(None).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(fx.store.stored_version(TABLE).await, Some(before.version));
}

#[tokio::test]
async fn test_invalid_check_is_rejected() {
    let (_fx, table) = table_with(config(), &[(1, 0, 100), (2, 1, 100), (3, 2, 100)]).await;
    table.start_hand().await.unwrap();

    let response = table.place_bet(1, Action::Check).await.unwrap();
    assert!(matches!(response, TableResponse::InvalidAction { .. }));
    assert_eq!(
        response.error_message().as_deref(),
        Some("Invalid action: can't check while facing a bet of 10")
    );
}

#[tokio::test]
async fn test_award_pot_after_showdown() {
    let (fx, table) = table_with(config(), &[(1, 0, 100), (2, 1, 100)]).await;
    table.start_hand().await.unwrap();

    // Both all-in pre-flop; the board runs out to showdown
    table.place_bet(1, Action::AllIn).await.unwrap();
    table.place_bet(2, Action::Call).await.unwrap();
    let state = table.state(None).await.unwrap();
    assert_eq!(state.phase, GamePhase::Showdown);
    assert_eq!(state.pot, 200);
    assert_eq!(state.community_cards.len(), 5);

    let response = table.award_pot(vec![1]).await.unwrap();
    assert_eq!(
        response,
        TableResponse::SuccessWithMessage {
            message: "seat 1 wins 200".to_string()
        }
    );

    let state = table.state(None).await.unwrap();
    assert_eq!(state.phase, GamePhase::Waiting);
    assert_eq!(state.pot, 0);
    assert_eq!(state.seat(1).unwrap().stack, 200);
    assert!(state.seat(1).unwrap().is_winner);
    assert_eq!(state.seat(0).unwrap().stack, 0);

    let record = fx.store.seat_record(TABLE, 2).await.unwrap();
    assert_eq!(record.stack, 200);
    assert_eq!(record.status, SeatRecordStatus::Seated);
}

// ============================================================================
// Seating and wallet
// ============================================================================

#[tokio::test]
async fn test_sit_down_rejections() {
    let (fx, table) = table_with(config(), &[(1, 0, 100)]).await;

    fx.wallet.deposit(2, 1_000).await;
    assert_eq!(
        table.sit_down(2, "bob", 0, 100).await.unwrap(),
        TableResponse::SeatTaken { seat: 0 }
    );
    assert!(matches!(
        table.sit_down(2, "bob", 1, 50).await.unwrap(),
        TableResponse::Error { .. }
    ));

    fx.wallet.deposit(3, 50).await;
    assert_eq!(
        table.sit_down(3, "carol", 2, 100).await.unwrap(),
        TableResponse::InsufficientChips {
            required: 100,
            available: 50
        }
    );
    let state = table.state(None).await.unwrap();
    assert_eq!(state.occupied_count(), 1);
    assert_eq!(fx.wallet.balance(3).await.unwrap(), 50);
}

#[tokio::test]
async fn test_leave_between_hands_cashes_out() {
    let (fx, table) = table_with(config(), &[(1, 0, 500)]).await;
    assert_eq!(fx.wallet.balance(1).await.unwrap(), 500);

    assert_eq!(table.leave(1).await.unwrap(), TableResponse::Success);
    assert_eq!(fx.wallet.balance(1).await.unwrap(), 1_000);
    assert_eq!(fx.wallet.escrow_balance(TABLE).await, 0);

    let record = fx.store.seat_record(TABLE, 1).await.unwrap();
    assert_eq!(record.status, SeatRecordStatus::Left);
    assert_eq!(record.seat_number, 0);
    assert_eq!(record.stack, 500);

    assert_eq!(table.leave(1).await.unwrap(), TableResponse::NotAtTable);
}

#[tokio::test]
async fn test_leave_mid_hand_folds_and_releases_seat() {
    let (fx, table) = table_with(config(), &[(1, 0, 100), (2, 1, 100)]).await;
    table.start_hand().await.unwrap();

    // Heads-up the dealer posted the small blind and is first to act
    let response = table.leave(1).await.unwrap();
    assert!(response.is_success());

    let state = table.state(None).await.unwrap();
    assert_eq!(state.phase, GamePhase::Waiting);
    assert!(state.seat(0).is_none());
    assert_eq!(state.seat(1).unwrap().stack, 105);

    assert_eq!(fx.wallet.balance(1).await.unwrap(), 995);
    let record = fx.store.seat_record(TABLE, 1).await.unwrap();
    assert_eq!(record.status, SeatRecordStatus::Left);
    assert_eq!(record.stack, 95);
}

#[tokio::test]
async fn test_rebuy_rules() {
    let (fx, table) = table_with(config(), &[(1, 0, 100), (2, 1, 100)]).await;

    assert_eq!(table.rebuy(1, 200).await.unwrap(), TableResponse::Success);
    assert_eq!(table.state(None).await.unwrap().seat(0).unwrap().stack, 300);
    assert_eq!(fx.wallet.balance(1).await.unwrap(), 700);
    let entries = fx.wallet.entries(1).await;
    assert_eq!(entries.last().unwrap().entry_type, EntryType::Rebuy);

    // Stack can't go above the max buy-in
    assert!(matches!(
        table.rebuy(1, 800).await.unwrap(),
        TableResponse::Error { .. }
    ));
    assert_eq!(table.rebuy(3, 100).await.unwrap(), TableResponse::NotAtTable);

    table.start_hand().await.unwrap();
    assert_eq!(
        table.rebuy(2, 100).await.unwrap(),
        TableResponse::HandInProgress
    );
}

#[tokio::test]
async fn test_rebuy_needs_wallet_balance() {
    let (fx, table) = table_with(config(), &[(1, 0, 950)]).await;
    assert_eq!(fx.wallet.balance(1).await.unwrap(), 50);

    assert_eq!(
        table.rebuy(1, 50).await.unwrap(),
        TableResponse::Success
    );
    assert_eq!(
        table.rebuy(1, 1).await.unwrap(),
        TableResponse::Error {
            message: "Rebuy would take the stack above 1000 chips".to_string()
        }
    );

    let (fx, table) = table_with(config(), &[(1, 0, 100)]).await;
    fx.wallet.deposit(1, -850).await;
    assert_eq!(
        table.rebuy(1, 100).await.unwrap(),
        TableResponse::InsufficientChips {
            required: 100,
            available: 50
        }
    );
    assert_eq!(table.state(None).await.unwrap().seat(0).unwrap().stack, 100);
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_failed_save_keeps_state_and_skips_broadcast() {
    let (fx, table) = table_with(config(), &[(1, 0, 100), (2, 1, 100)]).await;
    table.start_hand().await.unwrap();
    let before = table.state(None).await.unwrap();
    let mut events = fx.events.subscribe(TABLE);

    fx.store.set_fail_writes(true);
    let response = table.place_bet(1, Action::Call).await.unwrap();
    assert!(matches!(response, TableResponse::PersistenceFailed { .. }));
    assert_eq!(table.state(None).await.unwrap(), before);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    fx.store.set_fail_writes(false);
    assert_eq!(table.place_bet(1, Action::Call).await.unwrap(), TableResponse::Success);
    match events.recv().await.unwrap() {
        TableEvent::GameUpdate { table_id, state } => {
            assert_eq!(table_id, TABLE);
            assert_eq!(state.version, before.version + 1);
            assert_eq!(state.pot, 20);
        }
    }
}

#[tokio::test]
async fn test_failed_sit_down_refunds_wallet() {
    let (fx, table) = table_with(config(), &[]).await;
    fx.wallet.deposit(1, 1_000).await;

    fx.store.set_fail_writes(true);
    let response = table.sit_down(1, "alice", 0, 400).await.unwrap();
    assert!(matches!(response, TableResponse::PersistenceFailed { .. }));

    assert_eq!(fx.wallet.balance(1).await.unwrap(), 1_000);
    assert_eq!(fx.wallet.escrow_balance(TABLE).await, 0);
    let types: Vec<EntryType> = fx
        .wallet
        .entries(1)
        .await
        .iter()
        .map(|e| e.entry_type)
        .collect();
    assert_eq!(types, vec![EntryType::BuyIn, EntryType::Reversal]);
    assert!(table.state(None).await.unwrap().seat(0).is_none());
}

#[tokio::test]
async fn test_stale_version_reloads_stored_snapshot() {
    let (fx, table) = table_with(config(), &[(1, 0, 100), (2, 1, 100)]).await;

    // Another writer saves a newer snapshot behind the actor's back
    let mut newer = table.state(None).await.unwrap();
    let seen = newer.version;
    newer.version = seen + 1;
    newer.hand_number = 99;
    fx.store.save_state(TABLE, seen, &newer, &[]).await.unwrap();

    let response = table.start_hand().await.unwrap();
    assert_eq!(
        response,
        TableResponse::PersistenceFailed {
            reason: "table changed, try again".to_string()
        }
    );

    let state = table.state(None).await.unwrap();
    assert_eq!(state.version, seen + 1);
    assert_eq!(state.hand_number, 99);
}

// ============================================================================
// Events and timer
// ============================================================================

#[tokio::test]
async fn test_broadcast_hides_hole_cards() {
    let (fx, table) = table_with(config(), &[(1, 0, 100), (2, 1, 100)]).await;
    let mut events = fx.manager.subscribe(TABLE).await.unwrap();

    table.start_hand().await.unwrap();
    let TableEvent::GameUpdate { state, .. } = events.recv().await.unwrap();
    assert_eq!(state.phase, GamePhase::Preflop);
    assert!(state.seats.iter().flatten().all(|s| s.hole_cards.is_empty()));

    let own = table.state(Some(1)).await.unwrap();
    assert_eq!(own.seat(0).unwrap().hole_cards.len(), 2);
    assert!(own.seat(1).unwrap().hole_cards.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_turn_timer_folds_idle_player() {
    let config = TableConfig {
        speed: TableSpeed::Hyper,
        ..config()
    };
    let (_fx, table) = table_with(config, &[(1, 0, 100), (2, 1, 100)]).await;
    table.start_hand().await.unwrap();

    tokio::time::sleep(Duration::from_secs(6)).await;

    let state = table.state(None).await.unwrap();
    assert_eq!(state.phase, GamePhase::Waiting);
    assert_eq!(state.seat(1).unwrap().stack, 105);
    assert_eq!(state.seat(0).unwrap().stack, 95);
}

#[tokio::test(start_paused = true)]
async fn test_turn_timer_checks_when_nothing_to_call() {
    let config = TableConfig {
        speed: TableSpeed::Hyper,
        ..config()
    };
    let (_fx, table) = table_with(config, &[(1, 0, 100), (2, 1, 100)]).await;
    table.start_hand().await.unwrap();
    table.place_bet(1, Action::Call).await.unwrap();

    // Big blind's option times out into a check, which closes the round
    tokio::time::sleep(Duration::from_secs(6)).await;

    let state = table.state(None).await.unwrap();
    assert_eq!(state.phase, GamePhase::Flop);
    assert_eq!(state.pot, 20);
    assert_eq!(state.seat(1).unwrap().status, SeatStatus::Active);
}

#[tokio::test]
async fn test_closed_table_rejects_commands() {
    let (fx, table) = table_with(config(), &[(1, 0, 100)]).await;
    fx.manager.close_table(TABLE).await.unwrap();

    assert!(table.place_bet(1, Action::Fold).await.is_err());
    assert!(fx.manager.get_table(TABLE).await.is_err());
}
