//! Betting engine: seats, blinds, positions and player actions.
//!
//! Every operation here is a synchronous mutation of a [`GameState`]. The
//! table actor in [`crate::table`] runs them on a copy of the current
//! snapshot and only keeps the result once it has been persisted.

pub mod actions;
pub mod blinds;
pub mod entities;
pub mod errors;
pub mod hand;
pub mod positions;
pub mod seating;
pub mod state;

pub use actions::{
    ActionOutcome, default_action, is_betting_round_complete, is_round_finished, process_action,
};
pub use blinds::{BlindsManager, PostedBlinds};
pub use entities::{
    Action, ActionKind, Blinds, Card, Chips, DEFAULT_MAX_SEATS, GamePhase, LastAction, PlayerId,
    Seat, SeatIndex, SeatStatus,
};
pub use errors::GameError;
pub use hand::{HandProgress, Payout, apply_action, award_pot, start_hand};
pub use positions::{Positions, assign_positions, set_first_player_to_act, set_next_active_player};
pub use seating::{LeaveOutcome, add_chips, leave_seat, sit_down};
pub use state::GameState;
