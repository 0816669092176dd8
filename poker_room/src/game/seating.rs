//! Seating changes: sitting down, leaving and adding chips.

use super::{
    entities::{Chips, PlayerId, Seat, SeatIndex, SeatStatus},
    errors::GameError,
    hand::{HandProgress, fold_out_of_turn},
    state::GameState,
};

/// Result of a leave request.
#[derive(Clone, Debug, PartialEq)]
pub enum LeaveOutcome {
    /// The seat was cleared immediately.
    Removed { seat: SeatIndex, vacated: Seat },
    /// The player is in a hand. The seat was folded and is cleared once the
    /// hand ends.
    Deferred {
        seat: SeatIndex,
        progress: HandProgress,
    },
}

/// Seat a player with `buy_in` chips. Buy-in bounds are checked by the table.
pub fn sit_down(
    state: &mut GameState,
    player_id: PlayerId,
    display_name: impl Into<String>,
    seat: SeatIndex,
    buy_in: Chips,
) -> Result<(), GameError> {
    let slot = state.seats.get(seat).ok_or(GameError::SeatOutOfRange(seat))?;
    if slot.is_some() {
        return Err(GameError::SeatOccupied(seat));
    }
    if state.seat_of(player_id).is_some() {
        return Err(GameError::AlreadySeated(player_id));
    }
    state.seats[seat] = Some(Seat::new(player_id, display_name, buy_in));
    Ok(())
}

/// Remove a player from the table.
///
/// Between hands the seat is cleared straight away, as is a seat that sat
/// down after the deal. A seat dealt into the current hand keeps its place
/// (and any dealer or blind role) until the hand ends: it is folded and
/// flagged, and the table clears it then. On error `state` is left as it
/// was.
pub fn leave_seat(state: &mut GameState, player_id: PlayerId) -> Result<LeaveOutcome, GameError> {
    let idx = state
        .seat_of(player_id)
        .ok_or(GameError::PlayerNotSeated(player_id))?;

    let in_hand = state.is_hand_in_progress()
        && state.seat(idx).is_some_and(|s| {
            !matches!(s.status, SeatStatus::Waiting | SeatStatus::SittingOut) || s.total_bet > 0
        });
    if !in_hand {
        let vacated = state.seats[idx]
            .take()
            .ok_or(GameError::PlayerNotSeated(player_id))?;
        return Ok(LeaveOutcome::Removed { seat: idx, vacated });
    }

    let mut next = state.clone();
    if let Some(seat) = next.seat_mut(idx) {
        seat.leaving = true;
    }
    let progress = fold_out_of_turn(&mut next, idx)?;
    *state = next;
    Ok(LeaveOutcome::Deferred {
        seat: idx,
        progress,
    })
}

/// Add chips to a seated player's stack between hands.
pub fn add_chips(state: &mut GameState, player_id: PlayerId, amount: Chips) -> Result<Chips, GameError> {
    if state.is_hand_in_progress() {
        return Err(GameError::HandInProgress);
    }
    let idx = state
        .seat_of(player_id)
        .ok_or(GameError::PlayerNotSeated(player_id))?;
    let seat = state
        .seat_mut(idx)
        .ok_or(GameError::PlayerNotSeated(player_id))?;
    seat.stack = seat
        .stack
        .checked_add(amount)
        .ok_or(GameError::StackOverflow)?;
    Ok(seat.stack)
}
