/// Property-based tests for the betting engine using proptest
///
/// Random tables play random action sequences; after every accepted action
/// the pot, bet and turn bookkeeping must still agree with the seats.
use poker_room::game::{
    Action, Blinds, BlindsManager, Chips, GamePhase, GameState, Seat, SeatStatus, apply_action,
    award_pot, is_betting_round_complete, sit_down, start_hand,
};
use proptest::prelude::*;

// Strategy for a single player decision; bet sizes are clamped later
fn action_strategy() -> impl Strategy<Value = (u8, Chips)> {
    (0u8..6, 1u32..300)
}

fn stacks_strategy() -> impl Strategy<Value = Vec<Chips>> {
    prop::collection::vec(20u32..500, 2..=6)
}

fn table(stacks: &[Chips]) -> GameState {
    let mut state = GameState::new(9);
    for (seat, &stack) in stacks.iter().enumerate() {
        sit_down(&mut state, seat as i64 + 1, format!("p{seat}"), seat, stack).unwrap();
    }
    state
}

fn to_action((kind, amount): (u8, Chips)) -> Action {
    match kind {
        0 => Action::Fold,
        1 => Action::Check,
        2 => Action::Call,
        3 => Action::Bet(amount),
        4 => Action::Raise(amount),
        _ => Action::AllIn,
    }
}

fn chips_in_play(state: &GameState) -> Chips {
    state.seats.iter().flatten().map(|s| s.stack).sum::<Chips>() + state.pot
}

fn check_invariants(state: &GameState, total: Chips) -> Result<(), TestCaseError> {
    let contributions: Chips = state.seats.iter().flatten().map(|s| s.total_bet).sum();
    prop_assert_eq!(state.pot, contributions, "pot must equal all contributions");
    prop_assert_eq!(chips_in_play(state), total, "chips must be conserved");

    if state.phase.is_betting() {
        let max_live_bet = state
            .seats
            .iter()
            .flatten()
            .filter(|s| s.is_live())
            .map(|s| s.current_bet)
            .max()
            .unwrap_or(0);
        prop_assert_eq!(state.current_bet, max_live_bet);
    }

    if let Some(active) = state.active_seat {
        let seat = state.seat(active);
        prop_assert!(seat.is_some_and(Seat::is_active), "active seat must be able to act");
    }
    Ok(())
}

proptest! {
    #[test]
    fn test_random_hands_keep_pot_and_turn_consistent(
        stacks in stacks_strategy(),
        actions in prop::collection::vec(action_strategy(), 0..60),
    ) {
        let blinds = BlindsManager::new(Blinds { small: 5, big: 10 });
        let mut state = table(&stacks);
        let total: Chips = stacks.iter().sum();

        start_hand(&mut state, &blinds).unwrap();
        check_invariants(&state, total)?;

        for raw in actions {
            if state.phase == GamePhase::Showdown {
                let winner = state
                    .seats
                    .iter()
                    .position(|s| s.as_ref().is_some_and(Seat::is_live))
                    .unwrap();
                award_pot(&mut state, &[winner]).unwrap();
            }
            if state.phase == GamePhase::Waiting && start_hand(&mut state, &blinds).is_err() {
                break;
            }

            let Some(active) = state.active_seat else { continue };
            let player_id = state.seat(active).unwrap().player_id;
            let before = state.clone();

            match apply_action(&mut state, player_id, &to_action(raw)) {
                Ok(_) => check_invariants(&state, total)?,
                Err(_) => prop_assert_eq!(&state, &before, "rejected action must not mutate"),
            }
        }
    }

    #[test]
    fn test_opening_round_pot_is_sum_of_round_bets(
        stacks in stacks_strategy(),
        calls in 0usize..6,
    ) {
        let blinds = BlindsManager::new(Blinds { small: 5, big: 10 });
        let mut state = table(&stacks);
        start_hand(&mut state, &blinds).unwrap();

        for _ in 0..calls {
            if state.phase != GamePhase::Preflop {
                break;
            }
            let Some(active) = state.active_seat else { break };
            let player_id = state.seat(active).unwrap().player_id;
            let action = if state.call_amount(active) > 0 { Action::Call } else { Action::Check };
            apply_action(&mut state, player_id, &action).unwrap();
        }

        if state.phase == GamePhase::Preflop {
            let round_bets: Chips = state.seats.iter().flatten().map(|s| s.current_bet).sum();
            prop_assert_eq!(state.pot, round_bets);
        }
    }

    #[test]
    fn test_heads_up_dealer_posts_small_blind(a in 20u32..500, b in 20u32..500, hands in 1usize..5) {
        let blinds = BlindsManager::new(Blinds { small: 5, big: 10 });
        let mut state = table(&[a, b]);

        for _ in 0..hands {
            if start_hand(&mut state, &blinds).is_err() {
                break;
            }
            prop_assert_eq!(state.dealer_seat, state.small_blind_seat);
            prop_assert_ne!(state.small_blind_seat, state.big_blind_seat);

            // Fold whoever acts first so the next hand can start
            if let Some(active) = state.active_seat {
                let player_id = state.seat(active).unwrap().player_id;
                apply_action(&mut state, player_id, &Action::Fold).unwrap();
            }
            if state.phase == GamePhase::Showdown {
                let winner = state.seats.iter().position(|s| s.as_ref().is_some_and(Seat::is_live)).unwrap();
                award_pot(&mut state, &[winner]).unwrap();
            }
        }
    }

    #[test]
    fn test_call_never_overdraws(stack in 1u32..50, bet in 51u32..200) {
        let blinds = BlindsManager::new(Blinds { small: 1, big: 2 });
        let mut state = table(&[500, stack.max(3)]);
        start_hand(&mut state, &blinds).unwrap();

        // Seat 0 is dealer and small blind heads-up, so it acts first
        let opener = state.seat(0).unwrap().player_id;
        apply_action(&mut state, opener, &Action::Raise(bet)).unwrap();

        let caller = state.seat(1).unwrap().player_id;
        let before = state.seat(1).unwrap().stack;
        apply_action(&mut state, caller, &Action::Call).unwrap();

        let after = state.seat(1).unwrap();
        prop_assert!(after.stack <= before);
        if after.stack == 0 {
            prop_assert!(matches!(after.status, SeatStatus::AllIn) || state.phase == GamePhase::Waiting);
        }
    }

    #[test]
    fn test_round_complete_iff_active_bets_match(
        seats in prop::collection::vec((0u8..4, 0u32..50), 2..8),
    ) {
        let seats: Vec<Option<Seat>> = seats
            .iter()
            .enumerate()
            .map(|(idx, &(status, bet))| {
                let mut seat = Seat::new(idx as i64, format!("p{idx}"), 100);
                seat.current_bet = bet;
                seat.status = match status {
                    0 => SeatStatus::Active,
                    1 => SeatStatus::Folded,
                    2 => SeatStatus::AllIn,
                    _ => SeatStatus::Active,
                };
                Some(seat)
            })
            .collect();

        let live = seats.iter().flatten().filter(|s| s.is_live()).count();
        let mut active_bets = seats
            .iter()
            .flatten()
            .filter(|s| s.is_active())
            .map(|s| s.current_bet);
        let first = active_bets.next();
        let all_equal = active_bets.all(|bet| Some(bet) == first);

        prop_assert_eq!(is_betting_round_complete(&seats), live <= 1 || all_equal);
    }
}
