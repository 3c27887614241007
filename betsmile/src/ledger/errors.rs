//! Ledger error types.

use super::models::{AccountId, Mode, WithdrawalStatus};
use crate::money::Cents;
use std::time::Duration;
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Mutation would leave a balance negative
    #[error("Insufficient {mode} funds: available {available}, required {required}")]
    InsufficientFunds {
        account_id: AccountId,
        mode: Mode,
        available: Cents,
        required: Cents,
    },

    /// Account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Invoice does not exist
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Invoice is no longer pending
    #[error("Invoice {0} already settled")]
    InvoiceAlreadySettled(String),

    /// Withdrawal does not exist
    #[error("Withdrawal request not found: {0}")]
    WithdrawalNotFound(i64),

    /// Withdrawal is no longer pending
    #[error("Withdrawal request {id} already {status}")]
    WithdrawalAlreadyResolved { id: i64, status: WithdrawalStatus },

    /// Support ticket does not exist
    #[error("Support ticket not found: {0}")]
    TicketNotFound(i64),

    /// Amount must be positive
    #[error("Invalid amount: {0}")]
    InvalidAmount(Cents),

    /// Balance arithmetic overflowed
    #[error("Balance overflow")]
    BalanceOverflow,

    /// Store operation did not finish in time
    #[error("Ledger operation timed out after {0:?}")]
    Timeout(Duration),

    /// A stored row could not be decoded
    #[error("Corrupt ledger row: {0}")]
    Corrupt(String),
}

impl LedgerError {
    /// Get a client-safe error message that doesn't leak internal details
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::Database(_) | LedgerError::Corrupt(_) | LedgerError::Timeout(_) => {
                "Internal server error".to_string()
            }
            LedgerError::AccountNotFound(_) => "Account not found".to_string(),
            LedgerError::InsufficientFunds { mode, .. } => {
                format!("Insufficient {mode} balance")
            }
            _ => self.to_string(),
        }
    }

    /// Build an insufficient-funds error for `required` against `available`.
    pub fn insufficient(account_id: AccountId, mode: Mode, available: Cents, required: Cents) -> Self {
        LedgerError::InsufficientFunds {
            account_id,
            mode,
            available,
            required,
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
