//! Dealer button rotation and turn order.

use super::{
    entities::{GamePhase, Seat, SeatIndex, SeatStatus},
    errors::GameError,
    state::GameState,
};

/// Button and blind seats for one hand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Positions {
    pub dealer: SeatIndex,
    pub small_blind: SeatIndex,
    pub big_blind: SeatIndex,
}

fn is_dealt_in(seat: &Seat) -> bool {
    seat.status.is_live()
}

/// Move the button to the next seat dealt into the hand and assign blinds.
///
/// Heads-up, the dealer posts the small blind and the other seat the big
/// blind. With three or more seats the blinds follow the button clockwise.
/// Seats that are empty or sitting out are skipped.
pub fn assign_positions(state: &mut GameState) -> Result<Positions, GameError> {
    let dealt_in = state.seats.iter().flatten().filter(|s| is_dealt_in(s)).count();
    if dealt_in < 2 {
        return Err(GameError::NotEnoughPlayers);
    }

    let dealer = state
        .next_seat_matching(state.dealer_seat, is_dealt_in)
        .ok_or(GameError::NotEnoughPlayers)?;
    let (small_blind, big_blind) = if dealt_in == 2 {
        let other = state
            .next_seat_matching(Some(dealer), is_dealt_in)
            .ok_or(GameError::NotEnoughPlayers)?;
        (dealer, other)
    } else {
        let small_blind = state
            .next_seat_matching(Some(dealer), is_dealt_in)
            .ok_or(GameError::NotEnoughPlayers)?;
        let big_blind = state
            .next_seat_matching(Some(small_blind), is_dealt_in)
            .ok_or(GameError::NotEnoughPlayers)?;
        (small_blind, big_blind)
    };

    for seat in state.seats.iter_mut().flatten() {
        seat.clear_roles();
    }
    if let Some(seat) = state.seat_mut(dealer) {
        seat.is_dealer = true;
    }
    if let Some(seat) = state.seat_mut(small_blind) {
        seat.is_small_blind = true;
    }
    if let Some(seat) = state.seat_mut(big_blind) {
        seat.is_big_blind = true;
    }

    state.dealer_seat = Some(dealer);
    state.small_blind_seat = Some(small_blind);
    state.big_blind_seat = Some(big_blind);

    Ok(Positions {
        dealer,
        small_blind,
        big_blind,
    })
}

/// Set the seat that opens the current betting round.
///
/// Pre-flop the action starts left of the big blind, which heads-up is the
/// dealer. On later streets it starts left of the dealer.
pub fn set_first_player_to_act(state: &mut GameState) -> Option<SeatIndex> {
    let anchor = if state.phase == GamePhase::Preflop {
        state.big_blind_seat
    } else {
        state.dealer_seat
    };
    state.active_seat = anchor.and_then(|idx| state.next_seat_matching(Some(idx), Seat::is_active));
    state.active_seat
}

/// Pass the turn to the next seat clockwise that is still able to act.
///
/// The search covers at most one lap. When no seat can act, the active seat
/// is cleared.
pub fn set_next_active_player(state: &mut GameState) -> Option<SeatIndex> {
    state.active_seat = state
        .active_seat
        .and_then(|idx| state.next_seat_matching(Some(idx), |s| s.status == SeatStatus::Active));
    state.active_seat
}
