//! Wallet manager implementation with double-entry ledger and escrow.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::{
    errors::{WalletError, WalletResult},
    models::{EntryDirection, TableEscrow, TableId, Transfer, Wallet, WalletEntry},
};
use crate::db::{
    repository::WalletStore,
    timeouts::{with_default_timeout, with_transaction_timeout},
};
use crate::game::entities::PlayerId;

/// PostgreSQL-backed wallets. Every transfer runs in one transaction that
/// updates the wallet, the table escrow and the ledger together.
#[derive(Clone)]
pub struct WalletManager {
    pool: PgPool,
}

impl WalletManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get wallet for a player
    pub async fn get_wallet(&self, player_id: PlayerId) -> WalletResult<Wallet> {
        let row = with_default_timeout(
            sqlx::query(
                r#"
                SELECT player_id, balance, created_at, updated_at
                FROM wallets
                WHERE player_id = $1
                "#,
            )
            .bind(player_id)
            .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(WalletError::WalletNotFound(player_id))?;

        Ok(Wallet {
            player_id: row.get("player_id"),
            balance: row.get("balance"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
        })
    }

    /// Get table escrow balance
    pub async fn get_escrow(&self, table_id: TableId) -> WalletResult<TableEscrow> {
        let row = with_default_timeout(
            sqlx::query(
                r#"
                SELECT table_id, balance, updated_at
                FROM table_escrows
                WHERE table_id = $1
                "#,
            )
            .bind(table_id)
            .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(WalletError::EscrowNotFound(table_id))?;

        Ok(TableEscrow {
            table_id: row.get("table_id"),
            balance: row.get("balance"),
            updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
        })
    }

    /// Transfer chips from a player's wallet to the table escrow
    ///
    /// # Errors
    ///
    /// * `WalletError::InsufficientBalance` - Not enough chips
    /// * `WalletError::DuplicateTransaction` - Idempotency key already used
    pub async fn transfer_to_escrow(&self, transfer: &Transfer) -> WalletResult<i64> {
        if transfer.amount <= 0 {
            return Err(WalletError::InvalidAmount(transfer.amount));
        }
        with_transaction_timeout(self.to_escrow_tx(transfer)).await
    }

    async fn to_escrow_tx(&self, transfer: &Transfer) -> WalletResult<i64> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_unused_key(&mut tx, &transfer.idempotency_key).await?;

        // Check and debit in one statement so concurrent buy-ins can't overdraw
        let wallet_result = sqlx::query(
            "UPDATE wallets
             SET balance = balance - $1, updated_at = NOW()
             WHERE player_id = $2 AND balance >= $1
             RETURNING balance",
        )
        .bind(transfer.amount)
        .bind(transfer.player_id)
        .fetch_optional(&mut *tx)
        .await?;

        let new_balance: i64 = match wallet_result {
            Some(row) => row.get("balance"),
            None => {
                let check_wallet = sqlx::query("SELECT balance FROM wallets WHERE player_id = $1")
                    .bind(transfer.player_id)
                    .fetch_optional(&mut *tx)
                    .await?;

                match check_wallet {
                    Some(row) => {
                        return Err(WalletError::InsufficientBalance {
                            available: row.get("balance"),
                            required: transfer.amount,
                        });
                    }
                    None => return Err(WalletError::WalletNotFound(transfer.player_id)),
                }
            }
        };

        self.create_entry(
            &mut tx,
            transfer,
            -transfer.amount,
            new_balance,
            EntryDirection::Debit,
        )
        .await?;

        sqlx::query(
            "INSERT INTO table_escrows (table_id, balance, updated_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (table_id)
             DO UPDATE SET
                balance = table_escrows.balance + EXCLUDED.balance,
                updated_at = NOW()",
        )
        .bind(transfer.table_id)
        .bind(transfer.amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        log::debug!(
            "Moved {} chips from player {} into table {} escrow ({})",
            transfer.amount,
            transfer.player_id,
            transfer.table_id,
            transfer.entry_type
        );
        Ok(new_balance)
    }

    /// Transfer chips from the table escrow back to a player's wallet
    pub async fn transfer_from_escrow(&self, transfer: &Transfer) -> WalletResult<i64> {
        if transfer.amount <= 0 {
            return Err(WalletError::InvalidAmount(transfer.amount));
        }
        with_transaction_timeout(self.from_escrow_tx(transfer)).await
    }

    async fn from_escrow_tx(&self, transfer: &Transfer) -> WalletResult<i64> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_unused_key(&mut tx, &transfer.idempotency_key).await?;

        let escrow_result = sqlx::query(
            "UPDATE table_escrows
             SET balance = balance - $1, updated_at = NOW()
             WHERE table_id = $2 AND balance >= $1
             RETURNING balance",
        )
        .bind(transfer.amount)
        .bind(transfer.table_id)
        .fetch_optional(&mut *tx)
        .await?;

        if escrow_result.is_none() {
            let check_escrow = sqlx::query("SELECT balance FROM table_escrows WHERE table_id = $1")
                .bind(transfer.table_id)
                .fetch_optional(&mut *tx)
                .await?;

            return match check_escrow {
                Some(row) => Err(WalletError::InsufficientBalance {
                    available: row.get("balance"),
                    required: transfer.amount,
                }),
                None => Err(WalletError::EscrowNotFound(transfer.table_id)),
            };
        }

        let current_wallet =
            sqlx::query("SELECT balance FROM wallets WHERE player_id = $1 FOR UPDATE")
                .bind(transfer.player_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(WalletError::WalletNotFound(transfer.player_id))?;

        let current_balance: i64 = current_wallet.get("balance");
        let new_balance = current_balance
            .checked_add(transfer.amount)
            .ok_or(WalletError::BalanceOverflow)?;

        sqlx::query(
            "UPDATE wallets
             SET balance = $1, updated_at = NOW()
             WHERE player_id = $2",
        )
        .bind(new_balance)
        .bind(transfer.player_id)
        .execute(&mut *tx)
        .await?;

        self.create_entry(
            &mut tx,
            transfer,
            transfer.amount,
            new_balance,
            EntryDirection::Credit,
        )
        .await?;

        tx.commit().await?;

        log::debug!(
            "Moved {} chips from table {} escrow to player {} ({})",
            transfer.amount,
            transfer.table_id,
            transfer.player_id,
            transfer.entry_type
        );
        Ok(new_balance)
    }

    async fn ensure_unused_key(
        tx: &mut Transaction<'_, Postgres>,
        idempotency_key: &str,
    ) -> WalletResult<()> {
        let existing = sqlx::query("SELECT id FROM wallet_entries WHERE idempotency_key = $1")
            .bind(idempotency_key)
            .fetch_optional(&mut **tx)
            .await?;

        if existing.is_some() {
            return Err(WalletError::DuplicateTransaction(idempotency_key.to_string()));
        }
        Ok(())
    }

    /// Create a wallet entry (double-entry ledger)
    async fn create_entry(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        transfer: &Transfer,
        amount: i64,
        balance_after: i64,
        direction: EntryDirection,
    ) -> WalletResult<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO wallet_entries (player_id, table_id, amount, balance_after, direction, entry_type, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(transfer.player_id)
        .bind(transfer.table_id)
        .bind(amount)
        .bind(balance_after)
        .bind(direction.to_string())
        .bind(transfer.entry_type.to_string())
        .bind(&transfer.idempotency_key)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.get("id"))
    }

    /// Get the most recent wallet entries for a player
    pub async fn get_entries(&self, player_id: PlayerId, limit: i64) -> WalletResult<Vec<WalletEntry>> {
        let rows = with_default_timeout(
            sqlx::query(
                r#"
                SELECT id, player_id, table_id, amount, balance_after, direction, entry_type, idempotency_key, created_at
                FROM wallet_entries
                WHERE player_id = $1
                ORDER BY created_at DESC, id DESC
                LIMIT $2
                "#,
            )
            .bind(player_id)
            .bind(limit)
            .fetch_all(&self.pool),
        )
        .await?;

        rows.into_iter()
            .map(|row| {
                let direction: String = row.get("direction");
                let entry_type: String = row.get("entry_type");
                Ok(WalletEntry {
                    id: row.get("id"),
                    player_id: row.get("player_id"),
                    table_id: row.get("table_id"),
                    amount: row.get("amount"),
                    balance_after: row.get("balance_after"),
                    direction: direction
                        .parse()
                        .map_err(|e: String| WalletError::Database(sqlx::Error::Decode(e.into())))?,
                    entry_type: entry_type
                        .parse()
                        .map_err(|e: String| WalletError::Database(sqlx::Error::Decode(e.into())))?,
                    idempotency_key: row.get("idempotency_key"),
                    created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl WalletStore for WalletManager {
    async fn balance(&self, player_id: PlayerId) -> WalletResult<i64> {
        Ok(self.get_wallet(player_id).await?.balance)
    }

    async fn debit(&self, transfer: &Transfer) -> WalletResult<i64> {
        self.transfer_to_escrow(transfer).await
    }

    async fn credit(&self, transfer: &Transfer) -> WalletResult<i64> {
        self.transfer_from_escrow(transfer).await
    }
}
