//! Table actor message types.

use serde::Serialize;
use tokio::sync::oneshot;

use super::config::TableSpeed;
use crate::game::{
    entities::{Action, Blinds, Chips, GamePhase, PlayerId, SeatIndex},
    errors::GameError,
    hand::Payout,
    state::GameState,
};
use crate::wallet::TableId;

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// Sit down with chips taken from the player's wallet
    SitDown {
        player_id: PlayerId,
        display_name: String,
        seat: SeatIndex,
        buy_in: Chips,
        response: oneshot::Sender<TableResponse>,
    },

    /// Leave the table, cashing out the stack
    LeaveSeat {
        player_id: PlayerId,
        response: oneshot::Sender<TableResponse>,
    },

    /// Player action (fold, check, call, bet, raise, all-in)
    PlaceBet {
        player_id: PlayerId,
        action: Action,
        response: oneshot::Sender<TableResponse>,
    },

    /// Add chips from the wallet between hands
    Rebuy {
        player_id: PlayerId,
        amount: Chips,
        response: oneshot::Sender<TableResponse>,
    },

    /// Deal the next hand
    StartHand {
        response: oneshot::Sender<TableResponse>,
    },

    /// Name the showdown winners
    AwardPot {
        winners: Vec<SeatIndex>,
        response: oneshot::Sender<TableResponse>,
    },

    /// Snapshot as seen by `viewer`
    GetState {
        viewer: Option<PlayerId>,
        response: oneshot::Sender<GameState>,
    },

    /// Get table summary for listings
    GetSummary {
        response: oneshot::Sender<TableSummary>,
    },

    /// Internal: the turn timer ran out
    TurnExpired { serial: u64 },

    /// Close table
    Close {
        response: oneshot::Sender<TableResponse>,
    },
}

/// Response from table operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableResponse {
    /// Operation succeeded
    Success,

    /// Operation succeeded with message
    SuccessWithMessage { message: String },

    /// Operation failed
    Error { message: String },

    /// Seat already taken
    SeatTaken { seat: SeatIndex },

    /// Not enough chips in the wallet or stack
    InsufficientChips { required: i64, available: i64 },

    /// Not your turn
    NotYourTurn,

    /// Invalid action for current game state
    InvalidAction { reason: String },

    /// Player not at table
    NotAtTable,

    /// Command needs the table between hands
    HandInProgress,

    /// The change could not be saved; the table is unchanged
    PersistenceFailed { reason: String },
}

impl TableResponse {
    pub fn error(message: impl Into<String>) -> Self {
        TableResponse::Error {
            message: message.into(),
        }
    }

    /// Check if response is success
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            TableResponse::Success | TableResponse::SuccessWithMessage { .. }
        )
    }

    /// Get error message if response is error
    pub fn error_message(&self) -> Option<String> {
        match self {
            TableResponse::Success | TableResponse::SuccessWithMessage { .. } => None,
            TableResponse::Error { message } => Some(message.clone()),
            TableResponse::SeatTaken { seat } => Some(format!("Seat {} is taken", seat)),
            TableResponse::InsufficientChips {
                required,
                available,
            } => Some(format!(
                "Insufficient chips: need {}, have {}",
                required, available
            )),
            TableResponse::NotYourTurn => Some("Not your turn".to_string()),
            TableResponse::InvalidAction { reason } => Some(format!("Invalid action: {}", reason)),
            TableResponse::NotAtTable => Some("Not at table".to_string()),
            TableResponse::HandInProgress => Some("Hand in progress".to_string()),
            TableResponse::PersistenceFailed { reason } => {
                Some(format!("Could not save table: {}", reason))
            }
        }
    }
}

impl From<GameError> for TableResponse {
    fn from(err: GameError) -> Self {
        match err {
            GameError::OutOfTurnAction => TableResponse::NotYourTurn,
            GameError::PlayerNotSeated(_) => TableResponse::NotAtTable,
            GameError::SeatOccupied(seat) => TableResponse::SeatTaken { seat },
            GameError::HandInProgress => TableResponse::HandInProgress,
            GameError::InsufficientChips {
                required,
                available,
            } => TableResponse::InsufficientChips {
                required: i64::from(required),
                available: i64::from(available),
            },
            other => TableResponse::InvalidAction {
                reason: other.to_string(),
            },
        }
    }
}

/// Outcome of a completed hand, attached to award responses.
pub fn payout_message(payouts: &[Payout]) -> String {
    payouts
        .iter()
        .map(|p| format!("seat {} wins {}", p.seat, p.amount))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Table listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub table_id: TableId,
    pub name: String,
    pub player_count: usize,
    pub max_players: usize,
    pub blinds: Blinds,
    pub phase: GamePhase,
    pub pot: Chips,
    pub hand_number: u64,
    pub speed: TableSpeed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_errors_map_to_responses() {
        assert_eq!(
            TableResponse::from(GameError::OutOfTurnAction),
            TableResponse::NotYourTurn
        );
        assert_eq!(
            TableResponse::from(GameError::SeatOccupied(3)),
            TableResponse::SeatTaken { seat: 3 }
        );
        let response = TableResponse::from(GameError::CannotCheck { call_amount: 10 });
        assert!(!response.is_success());
        assert_eq!(
            response.error_message().as_deref(),
            Some("Invalid action: can't check while facing a bet of 10")
        );
    }

    #[test]
    fn test_response_serializes_with_status_tag() {
        let json = serde_json::to_value(TableResponse::InsufficientChips {
            required: 500,
            available: 200,
        })
        .unwrap();
        assert_eq!(json["status"], "insufficient_chips");
        assert_eq!(json["required"], 500);
        assert_eq!(
            serde_json::to_value(TableResponse::Success).unwrap()["status"],
            "success"
        );
    }

    #[test]
    fn test_payout_message() {
        let payouts = [
            Payout {
                seat: 1,
                player_id: 2,
                amount: 17,
            },
            Payout {
                seat: 2,
                player_id: 3,
                amount: 16,
            },
        ];
        assert_eq!(payout_message(&payouts), "seat 1 wins 17, seat 2 wins 16");
    }
}
