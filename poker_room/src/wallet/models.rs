//! Wallet data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::entities::PlayerId;

/// Table ID type
pub type TableId = i64;

/// Wallet model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub player_id: PlayerId,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Chips held on behalf of the players seated at a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableEscrow {
    pub table_id: TableId,
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

/// Ledger entry. Every balance change writes exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEntry {
    pub id: i64,
    pub player_id: PlayerId,
    pub table_id: Option<TableId>,
    /// Signed change to the wallet balance.
    pub amount: i64,
    pub balance_after: i64,
    pub direction: EntryDirection,
    pub entry_type: EntryType,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

/// Entry direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    Debit,
    Credit,
}

impl std::fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryDirection::Debit => write!(f, "debit"),
            EntryDirection::Credit => write!(f, "credit"),
        }
    }
}

impl std::str::FromStr for EntryDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(EntryDirection::Debit),
            "credit" => Ok(EntryDirection::Credit),
            other => Err(format!("unknown entry direction '{other}'")),
        }
    }
}

/// Why chips moved between a wallet and a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    BuyIn,
    Rebuy,
    CashOut,
    /// Undoes an earlier transfer whose table change could not be saved.
    Reversal,
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryType::BuyIn => write!(f, "buy_in"),
            EntryType::Rebuy => write!(f, "rebuy"),
            EntryType::CashOut => write!(f, "cash_out"),
            EntryType::Reversal => write!(f, "reversal"),
        }
    }
}

impl std::str::FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy_in" => Ok(EntryType::BuyIn),
            "rebuy" => Ok(EntryType::Rebuy),
            "cash_out" => Ok(EntryType::CashOut),
            "reversal" => Ok(EntryType::Reversal),
            other => Err(format!("unknown entry type '{other}'")),
        }
    }
}

/// Transfer request (chips from wallet to escrow or vice versa)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub player_id: PlayerId,
    pub table_id: TableId,
    pub amount: i64,
    pub entry_type: EntryType,
    pub idempotency_key: String,
}

impl Transfer {
    /// Build a transfer with a collision-resistant idempotency key.
    #[must_use]
    pub fn new(player_id: PlayerId, table_id: TableId, amount: i64, entry_type: EntryType) -> Self {
        let idempotency_key = format!(
            "{}_{}_{}_{}",
            entry_type,
            table_id,
            player_id,
            uuid::Uuid::new_v4()
        );
        Self {
            player_id,
            table_id,
            amount,
            entry_type,
            idempotency_key,
        }
    }

    /// Transfer that undoes this one.
    #[must_use]
    pub fn reversal(&self) -> Self {
        Self {
            idempotency_key: format!("reversal_{}", self.idempotency_key),
            entry_type: EntryType::Reversal,
            ..self.clone()
        }
    }
}
