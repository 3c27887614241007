use crate::ledger::LedgerError;
use crate::money::Cents;
use thiserror::Error;

/// Payment errors
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Provider could not be reached or answered unusably; retry later
    #[error("Payment provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Deposit below the configured minimum
    #[error("Deposit {amount} below minimum {min}")]
    BelowMinimum { amount: Cents, min: Cents },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl PaymentError {
    /// Message safe to show to the player
    pub fn client_message(&self) -> String {
        match self {
            PaymentError::ProviderUnavailable(_) => {
                "Payment service unavailable, try again later".to_string()
            }
            PaymentError::Ledger(e) => e.client_message(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PaymentError::ProviderUnavailable("request timed out".to_string())
        } else {
            PaymentError::ProviderUnavailable(e.to_string())
        }
    }
}

pub type PaymentResult<T> = Result<T, PaymentError>;
