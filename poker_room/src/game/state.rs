//! Table snapshot shared by every engine component.

use serde::{Deserialize, Serialize};

use super::{
    entities::{Card, Chips, Deck, GamePhase, LastAction, PlayerId, Seat, SeatIndex, SeatStatus},
    errors::GameError,
};

/// Complete state of one table: the seats plus the hand being played.
///
/// Every table operation produces a new `GameState`; the table actor persists
/// it and publishes it as a `game_update` event.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GameState {
    pub phase: GamePhase,
    /// Single flat pot; equals the sum of every seat's `total_bet`.
    pub pot: Chips,
    /// Highest seat `current_bet` this round.
    pub current_bet: Chips,
    pub dealer_seat: Option<SeatIndex>,
    pub small_blind_seat: Option<SeatIndex>,
    pub big_blind_seat: Option<SeatIndex>,
    /// Seat currently permitted to act.
    pub active_seat: Option<SeatIndex>,
    pub community_cards: Vec<Card>,
    pub last_action: Option<LastAction>,
    pub seats: Vec<Option<Seat>>,
    pub hand_number: u64,
    /// Bumped on every persisted change. Writers must present the version
    /// they read.
    pub version: u64,
    pub(crate) deck: Deck,
}

impl GameState {
    #[must_use]
    pub fn new(max_seats: usize) -> Self {
        Self {
            phase: GamePhase::Waiting,
            pot: 0,
            current_bet: 0,
            dealer_seat: None,
            small_blind_seat: None,
            big_blind_seat: None,
            active_seat: None,
            community_cards: Vec::with_capacity(5),
            last_action: None,
            seats: vec![None; max_seats],
            hand_number: 0,
            version: 0,
            deck: Deck::default(),
        }
    }

    #[must_use]
    pub fn seat(&self, idx: SeatIndex) -> Option<&Seat> {
        self.seats.get(idx).and_then(Option::as_ref)
    }

    pub fn seat_mut(&mut self, idx: SeatIndex) -> Option<&mut Seat> {
        self.seats.get_mut(idx).and_then(Option::as_mut)
    }

    /// Seat index occupied by a player.
    #[must_use]
    pub fn seat_of(&self, player_id: PlayerId) -> Option<SeatIndex> {
        self.seats
            .iter()
            .position(|seat| seat.as_ref().is_some_and(|s| s.player_id == player_id))
    }

    #[must_use]
    pub fn is_hand_in_progress(&self) -> bool {
        self.phase != GamePhase::Waiting
    }

    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    /// Seats still contesting the pot (active or all-in).
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.seats.iter().flatten().filter(|s| s.is_live()).count()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.seats.iter().flatten().filter(|s| s.is_active()).count()
    }

    /// Walk clockwise from `from` (exclusive) and return the first seat that
    /// matches. The walk is bounded to one lap, so `from` itself is the last
    /// candidate. With no starting seat, the walk begins at seat 0.
    #[must_use]
    pub fn next_seat_matching<P>(&self, from: Option<SeatIndex>, predicate: P) -> Option<SeatIndex>
    where
        P: Fn(&Seat) -> bool,
    {
        let len = self.seats.len();
        if len == 0 {
            return None;
        }
        let start = from.map_or(len - 1, |idx| idx % len);
        (1..=len)
            .map(|step| (start + step) % len)
            .find(|&idx| self.seat(idx).is_some_and(&predicate))
    }

    /// Chips the seat must add to match the table bet.
    #[must_use]
    pub fn call_amount(&self, idx: SeatIndex) -> Chips {
        self.seat(idx)
            .map_or(0, |seat| self.current_bet.saturating_sub(seat.current_bet))
    }

    /// Rebuild `pot` and `current_bet` from the seats.
    pub fn recompute_totals(&mut self) -> Result<(), GameError> {
        self.pot = self
            .seats
            .iter()
            .flatten()
            .try_fold(0, |pot: Chips, s| pot.checked_add(s.total_bet))
            .ok_or(GameError::PotOverflow)?;
        self.current_bet = self
            .seats
            .iter()
            .flatten()
            .filter(|s| s.is_live())
            .map(|s| s.current_bet)
            .max()
            .unwrap_or(0);
        Ok(())
    }

    /// Remove seats whose players asked to leave mid-hand. Only runs between
    /// hands.
    pub fn remove_departed(&mut self) -> Vec<(SeatIndex, Seat)> {
        if self.is_hand_in_progress() {
            return Vec::new();
        }
        let mut departed = Vec::new();
        for (idx, slot) in self.seats.iter_mut().enumerate() {
            if slot.as_ref().is_some_and(|s| s.leaving)
                && let Some(seat) = slot.take()
            {
                departed.push((idx, seat));
            }
        }
        departed
    }

    /// Copy of the state as seen by one viewer: other players' hole cards
    /// are hidden until showdown, and the deck is never exposed.
    #[must_use]
    pub fn view_for(&self, viewer: Option<PlayerId>) -> Self {
        let mut view = self.clone();
        view.deck = Deck::exhausted();
        let reveal = self.phase == GamePhase::Showdown;
        for seat in view.seats.iter_mut().flatten() {
            let own = viewer == Some(seat.player_id);
            let shown = reveal && seat.status != SeatStatus::Folded;
            if !own && !shown {
                seat.hole_cards.clear();
            }
        }
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit;

    fn state_with(seats: &[(SeatIndex, Chips)]) -> GameState {
        let mut state = GameState::new(9);
        for &(idx, stack) in seats {
            state.seats[idx] = Some(Seat::new(idx as PlayerId + 1, format!("p{idx}"), stack));
        }
        state
    }

    #[test]
    fn test_next_seat_wraps_and_skips_empty() {
        let state = state_with(&[(1, 100), (4, 100), (7, 100)]);
        assert_eq!(state.next_seat_matching(Some(1), |_| true), Some(4));
        assert_eq!(state.next_seat_matching(Some(7), |_| true), Some(1));
        assert_eq!(state.next_seat_matching(None, |_| true), Some(1));
    }

    #[test]
    fn test_next_seat_returns_self_last() {
        let state = state_with(&[(3, 100)]);
        assert_eq!(state.next_seat_matching(Some(3), |_| true), Some(3));
        assert_eq!(state.next_seat_matching(Some(3), |s| s.stack > 100), None);
    }

    #[test]
    fn test_seat_of_finds_player() {
        let state = state_with(&[(2, 100), (5, 100)]);
        assert_eq!(state.seat_of(6), Some(5));
        assert_eq!(state.seat_of(42), None);
    }

    #[test]
    fn test_recompute_totals_ignores_folded_for_current_bet() {
        let mut state = state_with(&[(0, 100), (1, 100)]);
        for (idx, bet) in [(0, 30), (1, 50)] {
            let seat = state.seat_mut(idx).unwrap();
            seat.status = SeatStatus::Active;
            seat.commit(bet);
        }
        state.seat_mut(1).unwrap().status = SeatStatus::Folded;
        state.recompute_totals().unwrap();
        assert_eq!(state.pot, 80);
        assert_eq!(state.current_bet, 30);
    }

    #[test]
    fn test_recompute_totals_rejects_pot_past_chip_range() {
        let mut state = state_with(&[(0, Chips::MAX), (1, Chips::MAX)]);
        for idx in 0..2 {
            let seat = state.seat_mut(idx).unwrap();
            seat.status = SeatStatus::AllIn;
            seat.total_bet = Chips::MAX / 2 + 1;
        }
        assert_eq!(state.recompute_totals(), Err(GameError::PotOverflow));
    }

    #[test]
    fn test_view_hides_other_hole_cards() {
        let mut state = state_with(&[(0, 100), (1, 100)]);
        state.phase = GamePhase::Flop;
        for seat in state.seats.iter_mut().flatten() {
            seat.status = SeatStatus::Active;
            seat.hole_cards = vec![Card(2, Suit::Club)];
        }
        let view = state.view_for(Some(1));
        assert_eq!(view.seat(0).unwrap().hole_cards.len(), 1);
        assert!(view.seat(1).unwrap().hole_cards.is_empty());
        assert_eq!(view.deck.remaining(), 0);

        state.phase = GamePhase::Showdown;
        let view = state.view_for(None);
        assert_eq!(view.seat(1).unwrap().hole_cards.len(), 1);
    }

    #[test]
    fn test_remove_departed_waits_for_hand_end() {
        let mut state = state_with(&[(0, 100), (1, 100)]);
        state.seat_mut(1).unwrap().leaving = true;
        state.phase = GamePhase::River;
        assert!(state.remove_departed().is_empty());
        state.phase = GamePhase::Waiting;
        let departed = state.remove_departed();
        assert_eq!(departed.len(), 1);
        assert_eq!(departed[0].0, 1);
        assert!(state.seat(1).is_none());
    }
}
