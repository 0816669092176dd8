//! In-memory stores for tests and database-less servers.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::repository::{SeatRecord, StoreError, StoreResult, TableStore, WalletStore};
use crate::game::{entities::PlayerId, state::GameState};
use crate::wallet::{
    EntryDirection, TableId, Transfer, WalletEntry, WalletError, WalletResult,
};

/// Table snapshots kept in a map, with the same version check as the
/// PostgreSQL store.
#[derive(Default)]
pub struct MemoryTableStore {
    states: Mutex<HashMap<TableId, GameState>>,
    seats: Mutex<HashMap<(TableId, PlayerId), SeatRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail, simulating a database outage.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn stored_version(&self, table_id: TableId) -> Option<u64> {
        self.states.lock().await.get(&table_id).map(|s| s.version)
    }

    pub async fn seat_record(&self, table_id: TableId, player_id: PlayerId) -> Option<SeatRecord> {
        self.seats.lock().await.get(&(table_id, player_id)).cloned()
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn load_state(&self, table_id: TableId) -> StoreResult<Option<GameState>> {
        Ok(self.states.lock().await.get(&table_id).cloned())
    }

    async fn save_state(
        &self,
        table_id: TableId,
        expected_version: u64,
        state: &GameState,
        seats: &[SeatRecord],
    ) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }

        let mut states = self.states.lock().await;
        let found = states.get(&table_id).map(|s| s.version);
        if found.unwrap_or(0) != expected_version {
            return Err(StoreError::StaleVersion {
                table_id,
                expected: expected_version,
                found,
            });
        }
        states.insert(table_id, state.clone());
        drop(states);

        let mut records = self.seats.lock().await;
        for seat in seats {
            records.insert((seat.table_id, seat.player_id), seat.clone());
        }
        Ok(())
    }
}

#[derive(Default)]
struct Ledger {
    balances: HashMap<PlayerId, i64>,
    escrows: HashMap<TableId, i64>,
    entries: Vec<WalletEntry>,
    keys: HashSet<String>,
}

impl Ledger {
    fn record(&mut self, transfer: &Transfer, amount: i64, balance_after: i64) {
        let direction = if amount < 0 {
            EntryDirection::Debit
        } else {
            EntryDirection::Credit
        };
        let id = self.entries.len() as i64 + 1;
        self.entries.push(WalletEntry {
            id,
            player_id: transfer.player_id,
            table_id: Some(transfer.table_id),
            amount,
            balance_after,
            direction,
            entry_type: transfer.entry_type,
            idempotency_key: transfer.idempotency_key.clone(),
            created_at: Utc::now(),
        });
        self.keys.insert(transfer.idempotency_key.clone());
    }

    fn check(&self, transfer: &Transfer) -> WalletResult<()> {
        if transfer.amount <= 0 {
            return Err(WalletError::InvalidAmount(transfer.amount));
        }
        if self.keys.contains(&transfer.idempotency_key) {
            return Err(WalletError::DuplicateTransaction(
                transfer.idempotency_key.clone(),
            ));
        }
        Ok(())
    }
}

/// Wallets, escrows and ledger kept in memory.
#[derive(Default)]
pub struct MemoryWallet {
    ledger: Mutex<Ledger>,
}

impl MemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or top up a wallet without writing a ledger entry.
    pub async fn deposit(&self, player_id: PlayerId, amount: i64) {
        *self
            .ledger
            .lock()
            .await
            .balances
            .entry(player_id)
            .or_insert(0) += amount;
    }

    pub async fn escrow_balance(&self, table_id: TableId) -> i64 {
        self.ledger
            .lock()
            .await
            .escrows
            .get(&table_id)
            .copied()
            .unwrap_or(0)
    }

    pub async fn entries(&self, player_id: PlayerId) -> Vec<WalletEntry> {
        self.ledger
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| e.player_id == player_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl WalletStore for MemoryWallet {
    async fn balance(&self, player_id: PlayerId) -> WalletResult<i64> {
        self.ledger
            .lock()
            .await
            .balances
            .get(&player_id)
            .copied()
            .ok_or(WalletError::WalletNotFound(player_id))
    }

    async fn debit(&self, transfer: &Transfer) -> WalletResult<i64> {
        let mut ledger = self.ledger.lock().await;
        ledger.check(transfer)?;
        let balance = *ledger
            .balances
            .get(&transfer.player_id)
            .ok_or(WalletError::WalletNotFound(transfer.player_id))?;
        if balance < transfer.amount {
            return Err(WalletError::InsufficientBalance {
                available: balance,
                required: transfer.amount,
            });
        }
        let new_balance = balance - transfer.amount;
        ledger.balances.insert(transfer.player_id, new_balance);
        *ledger.escrows.entry(transfer.table_id).or_insert(0) += transfer.amount;
        ledger.record(transfer, -transfer.amount, new_balance);
        Ok(new_balance)
    }

    async fn credit(&self, transfer: &Transfer) -> WalletResult<i64> {
        let mut ledger = self.ledger.lock().await;
        ledger.check(transfer)?;
        let escrow = ledger.escrows.get(&transfer.table_id).copied().unwrap_or(0);
        if escrow < transfer.amount {
            return Err(WalletError::InsufficientBalance {
                available: escrow,
                required: transfer.amount,
            });
        }
        let balance = *ledger
            .balances
            .get(&transfer.player_id)
            .ok_or(WalletError::WalletNotFound(transfer.player_id))?;
        let new_balance = balance
            .checked_add(transfer.amount)
            .ok_or(WalletError::BalanceOverflow)?;
        ledger.balances.insert(transfer.player_id, new_balance);
        ledger
            .escrows
            .insert(transfer.table_id, escrow - transfer.amount);
        ledger.record(transfer, transfer.amount, new_balance);
        Ok(new_balance)
    }
}
