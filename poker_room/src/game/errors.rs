//! Game rule errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{Chips, GamePhase, PlayerId, SeatIndex};

/// Errors raised when a command breaks a betting or seating rule. A command
/// that fails with one of these leaves the game state untouched.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("not your turn")]
    OutOfTurnAction,
    #[error("no action expected right now")]
    NoActionExpected,
    #[error("player {0} is not seated")]
    PlayerNotSeated(PlayerId),
    #[error("player {0} is already seated")]
    AlreadySeated(PlayerId),
    #[error("seat {0} is occupied")]
    SeatOccupied(SeatIndex),
    #[error("seat {0} does not exist")]
    SeatOutOfRange(SeatIndex),
    #[error("seat {0} is empty")]
    EmptySeat(SeatIndex),
    #[error("can't check while facing a bet of {call_amount}")]
    CannotCheck { call_amount: Chips },
    #[error("nothing to call")]
    NothingToCall,
    #[error("bet of {amount} doesn't exceed the current bet of {current_bet}")]
    BetTooSmall { amount: Chips, current_bet: Chips },
    #[error("bet amount must be positive")]
    ZeroBet,
    #[error("need {required} chips, have {available}")]
    InsufficientChips { required: Chips, available: Chips },
    #[error("need 2+ players with chips")]
    NotEnoughPlayers,
    #[error("hand already in progress")]
    HandInProgress,
    #[error("expected phase {expected}, table is in {actual}")]
    WrongPhase {
        expected: GamePhase,
        actual: GamePhase,
    },
    #[error("seat {0} can't win the pot")]
    IneligibleWinner(SeatIndex),
    #[error("at least one winner is required")]
    NoWinners,
    #[error("deck exhausted")]
    DeckExhausted,
    #[error("stack would overflow")]
    StackOverflow,
    #[error("pot would overflow")]
    PotOverflow,
}
