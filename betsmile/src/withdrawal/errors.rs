use crate::ledger::{AccountId, LedgerError};
use crate::money::Cents;
use thiserror::Error;

/// Withdrawal errors
#[derive(Debug, Error)]
pub enum WithdrawalError {
    /// Requested amount under the configured minimum
    #[error("Withdrawal {amount} below minimum {min}")]
    BelowMinimum { amount: Cents, min: Cents },

    /// Real balance under the configured minimum, so no request is possible
    #[error("Real balance {available} below withdrawal minimum {min}")]
    NotEligible { available: Cents, min: Cents },

    #[error("Wallet address must not be empty")]
    EmptyWallet,

    /// Caller is not an administrator
    #[error("Account {0} is not allowed to resolve withdrawals")]
    Unauthorized(AccountId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl WithdrawalError {
    /// Message safe to show to the caller
    pub fn client_message(&self) -> String {
        match self {
            WithdrawalError::Unauthorized(_) => "Not authorized".to_string(),
            WithdrawalError::Ledger(e) => e.client_message(),
            other => other.to_string(),
        }
    }
}

pub type WithdrawalResult<T> = Result<T, WithdrawalError>;
