//! Action validation and application.
//!
//! [`process_action`] is the only place a player action mutates a seat.
//! Every rule is checked before the first field changes, so a rejected
//! action leaves the state exactly as it was.

use super::{
    entities::{Action, ActionKind, Chips, LastAction, PlayerId, Seat, SeatIndex, SeatStatus},
    errors::GameError,
    state::GameState,
};

/// What an accepted action did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActionOutcome {
    pub seat: SeatIndex,
    pub action: ActionKind,
    /// Chips moved from the stack into the pot.
    pub amount: Chips,
    /// Whether the action raised the table bet and reopened the round.
    pub reopened: bool,
}

/// Validate and apply one action for `player_id`.
///
/// The actor must occupy the active seat. On success the seat's stack and
/// bets, the table bet and the pot are updated and the action is recorded
/// as the last action. Turn order is left to the caller.
pub fn process_action(
    state: &mut GameState,
    player_id: PlayerId,
    action: &Action,
) -> Result<ActionOutcome, GameError> {
    let active = state.active_seat.ok_or(GameError::NoActionExpected)?;
    let idx = state
        .seat_of(player_id)
        .ok_or(GameError::PlayerNotSeated(player_id))?;
    if idx != active {
        return Err(GameError::OutOfTurnAction);
    }
    let table_bet = state.current_bet;
    let call_amount = state.call_amount(idx);
    let pot = state.pot;
    let seat = state.seat_mut(idx).ok_or(GameError::EmptySeat(idx))?;
    if !seat.is_active() {
        return Err(GameError::OutOfTurnAction);
    }
    // Whatever the seat commits must fit in the pot.
    if !matches!(*action, Action::Fold | Action::Check) && pot.checked_add(seat.stack).is_none() {
        return Err(GameError::PotOverflow);
    }

    let amount = match *action {
        Action::Fold => {
            seat.status = SeatStatus::Folded;
            0
        }
        Action::Check => {
            if call_amount > 0 {
                return Err(GameError::CannotCheck { call_amount });
            }
            0
        }
        Action::Call => {
            if call_amount == 0 {
                return Err(GameError::NothingToCall);
            }
            seat.commit(call_amount)
        }
        Action::Bet(amount) | Action::Raise(amount) => {
            validate_wager(seat, amount, table_bet)?;
            seat.commit(amount)
        }
        Action::AllIn => {
            let stack = seat.stack;
            seat.commit(stack)
        }
    };
    seat.has_acted = true;
    let seat_bet = seat.current_bet;

    state.pot = pot + amount;
    let reopened = seat_bet > table_bet;
    if reopened {
        state.current_bet = seat_bet;
        for (other, seat) in state.seats.iter_mut().enumerate() {
            if other != idx
                && let Some(seat) = seat
            {
                seat.has_acted = false;
            }
        }
    }
    state.last_action = Some(LastAction {
        seat: idx,
        player_id,
        action: action.kind(),
        amount,
    });

    log::debug!("Seat {} {} (moved {})", idx, action, amount);
    Ok(ActionOutcome {
        seat: idx,
        action: action.kind(),
        amount,
        reopened,
    })
}

fn validate_wager(seat: &Seat, amount: Chips, table_bet: Chips) -> Result<(), GameError> {
    if amount == 0 {
        return Err(GameError::ZeroBet);
    }
    if amount > seat.stack {
        return Err(GameError::InsufficientChips {
            required: amount,
            available: seat.stack,
        });
    }
    if seat.current_bet.saturating_add(amount) <= table_bet {
        return Err(GameError::BetTooSmall {
            amount,
            current_bet: table_bet,
        });
    }
    Ok(())
}

/// Whether the live bets are settled: at most one seat is left in the hand,
/// or every seat still able to act has committed the same amount this round.
#[must_use]
pub fn is_betting_round_complete(seats: &[Option<Seat>]) -> bool {
    let in_hand = seats.iter().flatten().filter(|s| s.is_live()).count();
    if in_hand <= 1 {
        return true;
    }
    let mut bets = seats
        .iter()
        .flatten()
        .filter(|s| s.is_active())
        .map(|s| s.current_bet);
    match bets.next() {
        Some(first) => bets.all(|bet| bet == first),
        None => true,
    }
}

/// Whether the current street needs no further action.
///
/// Stricter than [`is_betting_round_complete`]: every active seat must also
/// have acted since the last bet or raise, which gives the big blind its
/// option pre-flop. A lone active seat that already covers the table bet
/// has nobody left to play against.
#[must_use]
pub fn is_round_finished(state: &GameState) -> bool {
    if state.live_count() <= 1 {
        return true;
    }
    let active: Vec<&Seat> = state.seats.iter().flatten().filter(|s| s.is_active()).collect();
    match active.as_slice() {
        [] => true,
        [only] => only.current_bet >= state.current_bet,
        seats => seats
            .iter()
            .all(|s| s.has_acted && s.current_bet == state.current_bet),
    }
}

/// Action injected when the active player's turn times out: fold when
/// facing a bet, otherwise check.
#[must_use]
pub fn default_action(state: &GameState) -> Option<(PlayerId, Action)> {
    let idx = state.active_seat?;
    let seat = state.seat(idx)?;
    let action = if state.call_amount(idx) > 0 {
        Action::Fold
    } else {
        Action::Check
    };
    Some((seat.player_id, action))
}
