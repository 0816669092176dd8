//! Storage traits used by the table actors, with their PostgreSQL
//! implementation.
//!
//! The actor only talks to [`TableStore`] and [`WalletStore`], so tests and
//! the server's in-memory mode can swap in [`super::memory`] stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use thiserror::Error;

use super::timeouts::{TimeoutError, with_default_timeout, with_transaction_timeout};
use crate::game::{
    entities::{Chips, PlayerId, SeatIndex},
    state::GameState,
};
use crate::wallet::{TableId, Transfer, WalletResult};

/// Persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Snapshot could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another writer saved a newer snapshot first
    #[error("Stale write for table {table_id}: expected version {expected}, found {found:?}")]
    StaleVersion {
        table_id: TableId,
        expected: u64,
        found: Option<u64>,
    },

    /// Query did not finish in time
    #[error("Store operation timed out: {0}")]
    Timeout(String),

    /// Store refused the write
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<TimeoutError> for StoreError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Database(e) => StoreError::Database(e),
            timeout @ TimeoutError::Timeout(_) => StoreError::Timeout(timeout.to_string()),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Seating status of a persisted seat record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatRecordStatus {
    Seated,
    Left,
}

impl std::fmt::Display for SeatRecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeatRecordStatus::Seated => write!(f, "seated"),
            SeatRecordStatus::Left => write!(f, "left"),
        }
    }
}

/// Per table/player seat row, written alongside every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatRecord {
    pub table_id: TableId,
    pub player_id: PlayerId,
    pub seat_number: SeatIndex,
    pub stack: Chips,
    pub status: SeatRecordStatus,
    pub joined_at: DateTime<Utc>,
}

/// Durable storage for table snapshots.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Latest saved snapshot of a table, if any.
    async fn load_state(&self, table_id: TableId) -> StoreResult<Option<GameState>>;

    /// Save `state` and its seat records in one step.
    ///
    /// The write only succeeds if the stored version is still
    /// `expected_version`; otherwise it fails with
    /// [`StoreError::StaleVersion`] and nothing is written.
    async fn save_state(
        &self,
        table_id: TableId,
        expected_version: u64,
        state: &GameState,
        seats: &[SeatRecord],
    ) -> StoreResult<()>;
}

/// Player wallets backing table buy-ins.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Current wallet balance.
    async fn balance(&self, player_id: PlayerId) -> WalletResult<i64>;

    /// Move chips from the player's wallet into the table escrow. Returns
    /// the new wallet balance.
    async fn debit(&self, transfer: &Transfer) -> WalletResult<i64>;

    /// Move chips from the table escrow back into the player's wallet.
    /// Returns the new wallet balance.
    async fn credit(&self, transfer: &Transfer) -> WalletResult<i64>;
}

/// PostgreSQL implementation of `TableStore`
#[derive(Clone)]
pub struct PgTableStore {
    pool: PgPool,
}

enum WriteOutcome {
    Written,
    Stale(Option<u64>),
}

impl PgTableStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write(
        &self,
        table_id: TableId,
        expected_version: u64,
        state: &serde_json::Value,
        new_version: u64,
        seats: &[SeatRecord],
    ) -> Result<WriteOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let written = if expected_version == 0 {
            sqlx::query(
                "INSERT INTO table_states (table_id, version, state, updated_at)
                 VALUES ($1, $2, $3, NOW())
                 ON CONFLICT (table_id) DO NOTHING",
            )
            .bind(table_id)
            .bind(new_version as i64)
            .bind(state)
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query(
                "UPDATE table_states
                 SET version = $2, state = $3, updated_at = NOW()
                 WHERE table_id = $1 AND version = $4",
            )
            .bind(table_id)
            .bind(new_version as i64)
            .bind(state)
            .bind(expected_version as i64)
            .execute(&mut *tx)
            .await?
        };

        if written.rows_affected() == 0 {
            let found = sqlx::query("SELECT version FROM table_states WHERE table_id = $1")
                .bind(table_id)
                .fetch_optional(&mut *tx)
                .await?
                .map(|row| row.get::<i64, _>("version") as u64);
            tx.rollback().await?;
            return Ok(WriteOutcome::Stale(found));
        }

        for seat in seats {
            sqlx::query(
                "INSERT INTO table_seats (table_id, player_id, seat_number, stack, status, joined_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, NOW())
                 ON CONFLICT (table_id, player_id)
                 DO UPDATE SET
                    seat_number = EXCLUDED.seat_number,
                    stack = EXCLUDED.stack,
                    status = EXCLUDED.status,
                    joined_at = EXCLUDED.joined_at,
                    updated_at = NOW()",
            )
            .bind(seat.table_id)
            .bind(seat.player_id)
            .bind(seat.seat_number as i32)
            .bind(i64::from(seat.stack))
            .bind(seat.status.to_string())
            .bind(seat.joined_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(WriteOutcome::Written)
    }
}

#[async_trait]
impl TableStore for PgTableStore {
    async fn load_state(&self, table_id: TableId) -> StoreResult<Option<GameState>> {
        let row = with_default_timeout(
            sqlx::query("SELECT state FROM table_states WHERE table_id = $1")
                .bind(table_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        match row {
            Some(row) => {
                let value: serde_json::Value = row.get("state");
                Ok(Some(serde_json::from_value(value)?))
            }
            None => Ok(None),
        }
    }

    async fn save_state(
        &self,
        table_id: TableId,
        expected_version: u64,
        state: &GameState,
        seats: &[SeatRecord],
    ) -> StoreResult<()> {
        let value = serde_json::to_value(state)?;
        let outcome = with_transaction_timeout(async {
            self.write(table_id, expected_version, &value, state.version, seats)
                .await
                .map_err(StoreError::from)
        })
        .await?;

        match outcome {
            WriteOutcome::Written => Ok(()),
            WriteOutcome::Stale(found) => Err(StoreError::StaleVersion {
                table_id,
                expected: expected_version,
                found,
            }),
        }
    }
}
