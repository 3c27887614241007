use super::{GameVariant, Pick};
use crate::ledger::LedgerError;
use crate::money::Cents;
use thiserror::Error;

/// Wager errors
#[derive(Debug, Error)]
pub enum WagerError {
    /// Stake outside the configured bounds
    #[error("Stake {stake} outside allowed range {min}..={max}")]
    InvalidStake { stake: Cents, min: Cents, max: Cents },

    /// Pick does not fit the game
    #[error("Invalid pick {pick:?} for {variant}")]
    InvalidPick { variant: GameVariant, pick: Pick },

    /// Ledger rejected the settlement
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl WagerError {
    /// Message safe to show to the player
    pub fn client_message(&self) -> String {
        match self {
            WagerError::Ledger(e) => e.client_message(),
            other => other.to_string(),
        }
    }
}

pub type WagerResult<T> = Result<T, WagerError>;
