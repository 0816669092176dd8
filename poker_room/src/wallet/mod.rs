//! Wallet module: player balances, table escrow and the double-entry ledger
//! behind buy-ins, rebuys and cash-outs.
//!
//! ## Example
//!
//! ```no_run
//! use poker_room::db::{Database, WalletStore};
//! use poker_room::wallet::{EntryType, Transfer, WalletManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let wallet = WalletManager::new(db.pool().clone());
//!
//!     let buy_in = Transfer::new(1, 101, 5000, EntryType::BuyIn);
//!     let balance = wallet.debit(&buy_in).await?;
//!     println!("New balance after buy-in: {}", balance);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{WalletError, WalletResult};
pub use manager::WalletManager;
pub use models::{
    EntryDirection, EntryType, TableEscrow, TableId, Transfer, Wallet, WalletEntry,
};
