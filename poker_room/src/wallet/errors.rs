//! Wallet error types.

use thiserror::Error;

use crate::db::timeouts::TimeoutError;

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query did not finish in time
    #[error("Wallet operation timed out: {0}")]
    Timeout(String),

    /// Insufficient balance
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// Wallet not found
    #[error("Wallet not found for player {0}")]
    WalletNotFound(i64),

    /// Escrow not found
    #[error("Escrow not found for table {0}")]
    EscrowNotFound(i64),

    /// Duplicate transaction (idempotency key already used)
    #[error("Duplicate transaction: {0}")]
    DuplicateTransaction(String),

    /// Invalid amount (must be positive)
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Balance would overflow
    #[error("Balance overflow")]
    BalanceOverflow,
}

impl From<TimeoutError> for WalletError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Database(e) => WalletError::Database(e),
            timeout @ TimeoutError::Timeout(_) => WalletError::Timeout(timeout.to_string()),
        }
    }
}

impl WalletError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            WalletError::Database(_) | WalletError::Timeout(_) => {
                "Internal server error".to_string()
            }
            WalletError::WalletNotFound(_) => "Wallet not found".to_string(),
            WalletError::EscrowNotFound(_) => "Escrow not found".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;
