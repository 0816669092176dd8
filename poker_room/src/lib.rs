//! # Poker Room
//!
//! Seat, blind and betting engine for an online poker room.
//!
//! A table moves through the phases `WAITING → PREFLOP → FLOP → TURN → RIVER
//! → SHOWDOWN` and back to `WAITING`. Each table is owned by one async actor
//! that applies commands in order, persists the resulting snapshot and then
//! publishes it to subscribers.
//!
//! ## Core Modules
//!
//! - [`game`]: Seats, blinds, positions and action processing
//! - [`table`]: Table actors, the table manager, turn timer and event bus
//! - [`wallet`]: Player wallets and table escrow
//! - [`db`]: Storage traits with PostgreSQL and in-memory implementations
//!
//! ## Example
//!
//! ```
//! use poker_room::game::{Action, Blinds, BlindsManager, GameState, apply_action, sit_down, start_hand};
//!
//! let mut state = GameState::new(9);
//! sit_down(&mut state, 1, "alice", 0, 1_000).unwrap();
//! sit_down(&mut state, 2, "bob", 1, 1_000).unwrap();
//!
//! let blinds = BlindsManager::new(Blinds { small: 5, big: 10 });
//! start_hand(&mut state, &blinds).unwrap();
//! assert_eq!(state.pot, 15);
//!
//! // Heads-up: the dealer posts the small blind and acts first pre-flop
//! let dealer = state.dealer_seat.unwrap();
//! let player = state.seat(dealer).unwrap().player_id;
//! apply_action(&mut state, player, &Action::Call).unwrap();
//! assert_eq!(state.pot, 20);
//! ```

/// Storage traits and implementations.
pub mod db;

/// Core betting engine.
pub mod game;
pub use game::{Action, GameError, GameState};

/// Per-table actors and their manager.
pub mod table;
pub use table::{TableConfig, TableHandle, TableManager, TableResponse};

pub mod wallet;
