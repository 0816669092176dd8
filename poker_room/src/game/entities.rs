use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type alias for whole chips. Stacks, bets and the pot are all counted
/// in whole chips, and an unsigned type keeps every stack at or above zero.
pub type Chips = u32;

/// Type alias for the external identity of a player.
pub type PlayerId = i64;

/// Type alias for seat positions at a table.
pub type SeatIndex = usize;

/// Seat capacity of a full-ring table.
pub const DEFAULT_MAX_SEATS: usize = 9;

/// Number of private cards dealt to each seat in a hand.
pub const HOLE_CARDS: usize = 2;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Club => "c",
            Self::Spade => "s",
            Self::Diamond => "d",
            Self::Heart => "h",
        };
        write!(f, "{repr}")
    }
}

/// Card value, 2 through 14 (ace high).
pub type Value = u8;

/// A playing card. The betting engine never looks inside a card; it only
/// deals them and carries them in snapshots.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Card(pub Value, pub Suit);

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self.0 {
            11 => "J".to_string(),
            12 => "Q".to_string(),
            13 => "K".to_string(),
            14 => "A".to_string(),
            v => v.to_string(),
        };
        write!(f, "{value}{}", self.1)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Deck {
    cards: Vec<Card>,
    deck_idx: usize,
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = Vec::with_capacity(52);
        for suit in [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart] {
            for value in 2..=14 {
                cards.push(Card(value, suit));
            }
        }
        Self { cards, deck_idx: 0 }
    }
}

impl Deck {
    /// A deck with no cards left, used to redact snapshots.
    #[must_use]
    pub fn exhausted() -> Self {
        Self {
            cards: Vec::new(),
            deck_idx: 0,
        }
    }

    pub fn deal_card(&mut self) -> Option<Card> {
        let card = self.cards.get(self.deck_idx).copied()?;
        self.deck_idx += 1;
        Some(card)
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.deck_idx)
    }

    pub fn shuffle(&mut self) {
        if self.cards.len() != 52 {
            *self = Self::default();
        }
        self.cards.shuffle(&mut rand::rng());
        self.deck_idx = 0;
    }
}

/// Phase of the hand currently being played at a table.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    #[default]
    Waiting,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl GamePhase {
    /// The street that follows this one. Showdown and waiting have no
    /// successor inside a hand.
    #[must_use]
    pub fn next_street(self) -> Option<Self> {
        match self {
            Self::Preflop => Some(Self::Flop),
            Self::Flop => Some(Self::Turn),
            Self::Turn => Some(Self::River),
            Self::River => Some(Self::Showdown),
            Self::Waiting | Self::Showdown => None,
        }
    }

    /// Number of community cards dealt when entering this phase.
    #[must_use]
    pub fn cards_dealt(self) -> usize {
        match self {
            Self::Flop => 3,
            Self::Turn | Self::River => 1,
            Self::Waiting | Self::Preflop | Self::Showdown => 0,
        }
    }

    #[must_use]
    pub fn is_betting(self) -> bool {
        matches!(self, Self::Preflop | Self::Flop | Self::Turn | Self::River)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "WAITING",
            Self::Preflop => "PREFLOP",
            Self::Flop => "FLOP",
            Self::Turn => "TURN",
            Self::River => "RIVER",
            Self::Showdown => "SHOWDOWN",
        };
        write!(f, "{repr}")
    }
}

/// Playing status of an occupied seat.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    /// Seated but not dealt into the current hand.
    #[default]
    Waiting,
    /// In the hand and still able to act.
    Active,
    /// Forfeited the hand.
    Folded,
    /// Committed the whole stack; no further action this hand.
    AllIn,
    /// Seated with an empty stack; skipped when dealing.
    SittingOut,
}

impl SeatStatus {
    /// Dealt into the hand and not folded.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Active | Self::AllIn)
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Folded => "folded",
            Self::AllIn => "all-in",
            Self::SittingOut => "sitting out",
        };
        write!(f, "{repr}")
    }
}

/// A player action. Bets and raises always carry their amount, which is
/// the number of chips added to the seat's round commitment.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", content = "amount", rename_all = "snake_case")]
pub enum Action {
    Fold,
    Check,
    Call,
    Bet(Chips),
    Raise(Chips),
    AllIn,
}

impl Action {
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Fold => ActionKind::Fold,
            Self::Check => ActionKind::Check,
            Self::Call => ActionKind::Call,
            Self::Bet(_) => ActionKind::Bet,
            Self::Raise(_) => ActionKind::Raise,
            Self::AllIn => ActionKind::AllIn,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Fold => write!(f, "folds"),
            Self::Check => write!(f, "checks"),
            Self::Call => write!(f, "calls"),
            Self::Bet(amount) => write!(f, "bets {amount}"),
            Self::Raise(amount) => write!(f, "raises {amount}"),
            Self::AllIn => write!(f, "goes all-in"),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    AllIn,
}

/// The last action applied at the table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LastAction {
    pub seat: SeatIndex,
    pub player_id: PlayerId,
    pub action: ActionKind,
    /// Chips actually moved into the pot by the action.
    pub amount: Chips,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Blinds {
    pub small: Chips,
    pub big: Chips,
}

impl fmt::Display for Blinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.small, self.big)
    }
}

/// An occupied seat.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Seat {
    pub player_id: PlayerId,
    pub display_name: String,
    pub stack: Chips,
    /// Chips committed in the current betting round.
    pub current_bet: Chips,
    /// Chips committed over the whole hand.
    pub total_bet: Chips,
    pub hole_cards: Vec<Card>,
    pub status: SeatStatus,
    pub is_dealer: bool,
    pub is_small_blind: bool,
    pub is_big_blind: bool,
    pub is_winner: bool,
    pub win_amount: Option<Chips>,
    /// Whether the seat has acted since the last bet or raise this round.
    pub has_acted: bool,
    /// Set when the player asked to leave mid-hand.
    pub leaving: bool,
    pub joined_at: DateTime<Utc>,
}

impl Seat {
    #[must_use]
    pub fn new(player_id: PlayerId, display_name: impl Into<String>, stack: Chips) -> Self {
        Self {
            player_id,
            display_name: display_name.into(),
            stack,
            current_bet: 0,
            total_bet: 0,
            hole_cards: Vec::with_capacity(HOLE_CARDS),
            status: SeatStatus::Waiting,
            is_dealer: false,
            is_small_blind: false,
            is_big_blind: false,
            is_winner: false,
            win_amount: None,
            has_acted: false,
            leaving: false,
            joined_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SeatStatus::Active
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    /// Clear every per-hand field and deal the seat in if it has chips.
    pub fn reset_for_hand(&mut self) {
        self.current_bet = 0;
        self.total_bet = 0;
        self.hole_cards.clear();
        self.is_dealer = false;
        self.is_small_blind = false;
        self.is_big_blind = false;
        self.is_winner = false;
        self.win_amount = None;
        self.has_acted = false;
        self.status = if self.stack == 0 {
            SeatStatus::SittingOut
        } else {
            SeatStatus::Active
        };
    }

    pub fn clear_roles(&mut self) {
        self.is_dealer = false;
        self.is_small_blind = false;
        self.is_big_blind = false;
    }

    /// Move up to `amount` chips from the stack into the round commitment.
    /// Returns the chips actually moved. An emptied stack goes all-in.
    pub fn commit(&mut self, amount: Chips) -> Chips {
        let actual = amount.min(self.stack);
        self.stack -= actual;
        self.current_bet += actual;
        self.total_bet += actual;
        if self.stack == 0 && actual > 0 {
            self.status = SeatStatus::AllIn;
        }
        actual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_has_52_unique_cards() {
        let mut deck = Deck::default();
        deck.shuffle();
        let mut seen = std::collections::HashSet::new();
        while let Some(card) = deck.deal_card() {
            assert!((2..=14).contains(&card.0));
            assert!(seen.insert(card));
        }
        assert_eq!(seen.len(), 52);
        assert_eq!(deck.remaining(), 0);
    }

    #[test]
    fn test_exhausted_deck_reshuffles_full() {
        let mut deck = Deck::exhausted();
        assert!(deck.deal_card().is_none());
        deck.shuffle();
        assert_eq!(deck.remaining(), 52);
    }

    #[test]
    fn test_card_display() {
        assert_eq!(Card(14, Suit::Spade).to_string(), "As");
        assert_eq!(Card(10, Suit::Heart).to_string(), "10h");
    }

    #[test]
    fn test_phase_progression() {
        let mut phase = GamePhase::Preflop;
        let mut seen = vec![phase];
        while let Some(next) = phase.next_street() {
            seen.push(next);
            phase = next;
        }
        assert_eq!(
            seen,
            vec![
                GamePhase::Preflop,
                GamePhase::Flop,
                GamePhase::Turn,
                GamePhase::River,
                GamePhase::Showdown
            ]
        );
        assert_eq!(GamePhase::Waiting.next_street(), None);
    }

    #[test]
    fn test_phase_serializes_upper_case() {
        let json = serde_json::to_string(&GamePhase::Preflop).unwrap();
        assert_eq!(json, "\"PREFLOP\"");
    }

    #[test]
    fn test_action_serde_carries_amount() {
        let json = serde_json::to_string(&Action::Raise(40)).unwrap();
        assert_eq!(json, r#"{"type":"raise","amount":40}"#);
        let parsed: Action = serde_json::from_str(r#"{"type":"fold"}"#).unwrap();
        assert_eq!(parsed, Action::Fold);
    }

    #[test]
    fn test_bet_without_amount_is_rejected() {
        let parsed: Result<Action, _> = serde_json::from_str(r#"{"type":"bet"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_commit_short_stack_goes_all_in() {
        let mut seat = Seat::new(1, "alice", 8);
        seat.status = SeatStatus::Active;
        let moved = seat.commit(10);
        assert_eq!(moved, 8);
        assert_eq!(seat.stack, 0);
        assert_eq!(seat.current_bet, 8);
        assert_eq!(seat.status, SeatStatus::AllIn);
    }

    #[test]
    fn test_commit_zero_keeps_status() {
        let mut seat = Seat::new(1, "alice", 0);
        seat.status = SeatStatus::Active;
        assert_eq!(seat.commit(0), 0);
        assert_eq!(seat.status, SeatStatus::Active);
    }

    #[test]
    fn test_reset_for_hand_sits_out_empty_stack() {
        let mut broke = Seat::new(1, "alice", 0);
        broke.is_winner = true;
        broke.reset_for_hand();
        assert_eq!(broke.status, SeatStatus::SittingOut);
        assert!(!broke.is_winner);

        let mut funded = Seat::new(2, "bob", 50);
        funded.reset_for_hand();
        assert_eq!(funded.status, SeatStatus::Active);
    }
}
