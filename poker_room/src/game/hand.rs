//! Hand lifecycle: dealing, street advancement and pot awards.

use serde::{Deserialize, Serialize};

use super::{
    actions::{is_round_finished, process_action},
    blinds::BlindsManager,
    entities::{Action, Chips, GamePhase, HOLE_CARDS, PlayerId, SeatIndex, SeatStatus},
    errors::GameError,
    positions::{assign_positions, set_first_player_to_act, set_next_active_player},
    state::GameState,
};

/// Chips paid to one seat when a hand ends.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Payout {
    pub seat: SeatIndex,
    pub player_id: PlayerId,
    pub amount: Chips,
}

/// Where the hand stands after a state change.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HandProgress {
    /// Waiting on the given seat.
    Betting { active_seat: SeatIndex },
    /// Betting is over; winners must be named with [`award_pot`].
    Showdown,
    /// The hand is over and the table is waiting again.
    Finished { payouts: Vec<Payout> },
}

/// Deal a new hand: rotate the button, post blinds, deal hole cards and open
/// pre-flop betting.
pub fn start_hand(state: &mut GameState, blinds: &BlindsManager) -> Result<HandProgress, GameError> {
    if state.is_hand_in_progress() {
        return Err(GameError::HandInProgress);
    }
    let funded = state
        .seats
        .iter()
        .flatten()
        .filter(|s| s.stack > 0 && !s.leaving)
        .count();
    if funded < 2 {
        return Err(GameError::NotEnoughPlayers);
    }

    for seat in state.seats.iter_mut().flatten() {
        seat.reset_for_hand();
        if seat.leaving {
            seat.status = SeatStatus::SittingOut;
        }
    }
    state.pot = 0;
    state.current_bet = 0;
    state.community_cards.clear();
    state.last_action = None;
    state.active_seat = None;
    state.phase = GamePhase::Preflop;
    state.hand_number += 1;

    let positions = assign_positions(state)?;
    blinds.post_blinds(&mut state.seats, positions.small_blind, positions.big_blind)?;
    state.recompute_totals()?;
    deal_hole_cards(state, positions.dealer)?;

    log::info!(
        "Hand #{} started: dealer {}, blinds {} at seats {}/{}",
        state.hand_number,
        positions.dealer,
        blinds.blinds(),
        positions.small_blind,
        positions.big_blind
    );

    if is_round_finished(state) {
        return Ok(advance_street(state));
    }
    match set_first_player_to_act(state) {
        Some(active_seat) => Ok(HandProgress::Betting { active_seat }),
        None => Ok(advance_street(state)),
    }
}

fn deal_hole_cards(state: &mut GameState, dealer: SeatIndex) -> Result<(), GameError> {
    state.deck.shuffle();
    let len = state.seats.len();
    for _ in 0..HOLE_CARDS {
        for step in 1..=len {
            let idx = (dealer + step) % len;
            if !state.seat(idx).is_some_and(|s| s.is_live()) {
                continue;
            }
            let card = state.deck.deal_card().ok_or(GameError::DeckExhausted)?;
            if let Some(seat) = state.seat_mut(idx) {
                seat.hole_cards.push(card);
            }
        }
    }
    Ok(())
}

/// Apply one player action and move the hand forward.
///
/// This is the single entry point for in-hand actions: the active seat is
/// re-checked, totals are rebuilt from the seats, and the turn passes to the
/// next seat, the next street or the end of the hand. On error `state` is
/// left as it was.
pub fn apply_action(
    state: &mut GameState,
    player_id: PlayerId,
    action: &Action,
) -> Result<HandProgress, GameError> {
    let mut next = state.clone();
    process_action(&mut next, player_id, action)?;
    next.recompute_totals()?;
    let progress = after_change(&mut next, true)?;
    *state = next;
    Ok(progress)
}

/// Fold a seat out of turn, used when a player leaves mid-hand.
pub(crate) fn fold_out_of_turn(
    state: &mut GameState,
    idx: SeatIndex,
) -> Result<HandProgress, GameError> {
    if state.active_seat == Some(idx)
        && let Some(player_id) = state.seat(idx).map(|s| s.player_id)
    {
        return apply_action(state, player_id, &Action::Fold);
    }
    if let Some(seat) = state.seat_mut(idx)
        && seat.is_active()
    {
        seat.status = SeatStatus::Folded;
    }
    state.recompute_totals()?;
    after_change(state, false)
}

fn after_change(state: &mut GameState, turn_taken: bool) -> Result<HandProgress, GameError> {
    if state.live_count() <= 1 {
        let payouts = award_uncontested(state)?;
        return Ok(HandProgress::Finished { payouts });
    }
    if is_round_finished(state) {
        return Ok(advance_street(state));
    }
    if turn_taken {
        set_next_active_player(state);
    }
    Ok(match state.active_seat {
        Some(active_seat) => HandProgress::Betting { active_seat },
        None => advance_street(state),
    })
}

/// Close the current street and deal the next one. When fewer than two
/// seats can still act the board is run out to showdown.
fn advance_street(state: &mut GameState) -> HandProgress {
    loop {
        let Some(next) = state.phase.next_street() else {
            state.active_seat = None;
            return HandProgress::Showdown;
        };
        for seat in state.seats.iter_mut().flatten() {
            seat.current_bet = 0;
            seat.has_acted = false;
        }
        state.current_bet = 0;
        state.active_seat = None;
        state.phase = next;
        for _ in 0..next.cards_dealt() {
            if let Some(card) = state.deck.deal_card() {
                state.community_cards.push(card);
            }
        }
        log::debug!("Hand #{} moved to {}", state.hand_number, next);

        if next == GamePhase::Showdown {
            return HandProgress::Showdown;
        }
        if state.active_count() >= 2
            && let Some(active_seat) = set_first_player_to_act(state)
        {
            return HandProgress::Betting { active_seat };
        }
    }
}

/// Pay the whole pot to the last live seat. The pot is never cleared
/// without being paid.
fn award_uncontested(state: &mut GameState) -> Result<Vec<Payout>, GameError> {
    let winner = state
        .seats
        .iter()
        .position(|s| s.as_ref().is_some_and(|s| s.is_live()));
    let payouts = match winner {
        Some(idx) => split_pot(state, &[idx]).inspect_err(|e| {
            log::error!("Hand #{}: failed to award pot: {}", state.hand_number, e);
        })?,
        None if state.pot > 0 => return Err(GameError::NoWinners),
        None => Vec::new(),
    };
    pay_out(state, &payouts);
    end_hand(state);
    Ok(payouts)
}

/// Split the pot between the named winners at showdown.
///
/// Each winner must still be in the hand. The pot is split evenly, and any
/// remainder goes one chip at a time to the winners closest to the left of
/// the dealer.
pub fn award_pot(state: &mut GameState, winners: &[SeatIndex]) -> Result<Vec<Payout>, GameError> {
    if state.phase != GamePhase::Showdown {
        return Err(GameError::WrongPhase {
            expected: GamePhase::Showdown,
            actual: state.phase,
        });
    }
    let payouts = split_pot(state, winners)?;
    pay_out(state, &payouts);
    end_hand(state);
    Ok(payouts)
}

fn split_pot(state: &GameState, winners: &[SeatIndex]) -> Result<Vec<Payout>, GameError> {
    let mut winners = winners.to_vec();
    winners.sort_unstable();
    winners.dedup();
    if winners.is_empty() {
        return Err(GameError::NoWinners);
    }
    for &idx in &winners {
        if !state.seat(idx).is_some_and(|s| s.is_live()) {
            return Err(GameError::IneligibleWinner(idx));
        }
    }

    let len = state.seats.len();
    let dealer = state.dealer_seat.unwrap_or(len - 1);
    winners.sort_by_key(|&idx| (idx + len - dealer - 1) % len);

    let count = Chips::try_from(winners.len()).map_err(|_| GameError::NoWinners)?;
    let share = state.pot / count;
    let mut remainder = state.pot % count;
    let mut payouts = Vec::with_capacity(winners.len());
    for idx in winners {
        let Some(seat) = state.seat(idx) else {
            return Err(GameError::IneligibleWinner(idx));
        };
        let amount = share + Chips::from(remainder > 0);
        remainder = remainder.saturating_sub(1);
        seat.stack.checked_add(amount).ok_or(GameError::StackOverflow)?;
        payouts.push(Payout {
            seat: idx,
            player_id: seat.player_id,
            amount,
        });
    }
    Ok(payouts)
}

fn pay_out(state: &mut GameState, payouts: &[Payout]) {
    for payout in payouts {
        if let Some(seat) = state.seat_mut(payout.seat) {
            seat.stack += payout.amount;
            seat.is_winner = true;
            seat.win_amount = Some(payout.amount);
        }
        log::info!(
            "Hand #{}: seat {} wins {}",
            state.hand_number,
            payout.seat,
            payout.amount
        );
    }
}

fn end_hand(state: &mut GameState) {
    for seat in state.seats.iter_mut().flatten() {
        seat.current_bet = 0;
        seat.total_bet = 0;
        seat.has_acted = false;
        seat.hole_cards.clear();
        seat.status = if seat.stack == 0 {
            SeatStatus::SittingOut
        } else {
            SeatStatus::Waiting
        };
    }
    state.pot = 0;
    state.current_bet = 0;
    state.active_seat = None;
    state.phase = GamePhase::Waiting;
}
