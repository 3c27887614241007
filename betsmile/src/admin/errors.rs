use crate::ledger::{AccountId, LedgerError};
use crate::settings::SettingsError;
use crate::withdrawal::WithdrawalError;
use thiserror::Error;

/// Admin errors
#[derive(Debug, Error)]
pub enum AdminError {
    /// Caller is not an administrator
    #[error("Account {0} is not an administrator")]
    Unauthorized(AccountId),

    #[error("Reply must not be empty")]
    EmptyReply,

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Withdrawal(#[from] WithdrawalError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl AdminError {
    /// Message safe to show to the caller
    pub fn client_message(&self) -> String {
        match self {
            AdminError::Unauthorized(_) => "Not authorized".to_string(),
            AdminError::Withdrawal(e) => e.client_message(),
            AdminError::Ledger(e) => e.client_message(),
            other => other.to_string(),
        }
    }
}

pub type AdminResult<T> = Result<T, AdminError>;
