//! Table module providing multi-table support with async actor model.
//!
//! This module implements:
//! - TableActor: Async actor owning one table's seats and hand
//! - TableManager: Spawns, looks up and closes table actors by ID
//! - TurnTimer: Applies a default action when a player runs out of time
//! - EventBus: Per-table broadcast of committed snapshots
//!
//! ## Architecture
//!
//! Each table runs in a separate Tokio task with an mpsc message inbox, so
//! all commands for one table are applied one at a time. A command's result
//! is persisted through the [`TableStore`](crate::db::TableStore) before it
//! becomes visible or is published.
//!
//! ## Example
//!
//! ```no_run
//! use poker_room::db::{MemoryTableStore, MemoryWallet};
//! use poker_room::game::Action;
//! use poker_room::table::{EventBus, TableConfig, TableManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TableManager::new(
//!         Arc::new(MemoryTableStore::new()),
//!         Arc::new(MemoryWallet::new()),
//!         Arc::new(EventBus::new()),
//!     );
//!     let table = manager.create_table(1, TableConfig::default()).await?;
//!
//!     table.sit_down(7, "alice", 0, 5_000).await?;
//!     table.sit_down(8, "bob", 1, 5_000).await?;
//!     table.start_hand().await?;
//!     table.place_bet(7, Action::Call).await?;
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod config;
pub mod events;
pub mod manager;
pub mod messages;
pub mod timer;

pub use actor::{TableActor, TableHandle};
pub use config::{ConfigError, TableConfig, TableSpeed};
pub use events::{EventBus, EventPublisher, TableEvent};
pub use manager::{TableError, TableManager};
pub use messages::{TableMessage, TableResponse, TableSummary};
pub use timer::TurnTimer;
