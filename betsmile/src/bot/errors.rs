use crate::admin::AdminError;
use crate::ledger::LedgerError;
use crate::payments::PaymentError;
use crate::support::SupportError;
use crate::wager::WagerError;
use crate::withdrawal::WithdrawalError;
use serde::Serialize;
use thiserror::Error;

/// Stable error category for the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InsufficientFunds,
    /// Amount outside configured bounds (stakes, deposits, withdrawals)
    InvalidStake,
    InvalidPick,
    InvalidRequest,
    /// Intent does not fit the current conversation state
    OutOfOrder,
    ProviderUnavailable,
    AccountNotFound,
    NotFound,
    Conflict,
    Unauthorized,
    Internal,
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("{0}")]
    OutOfOrder(&'static str),

    #[error(transparent)]
    Wager(#[from] WagerError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Withdrawal(#[from] WithdrawalError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error(transparent)]
    Support(#[from] SupportError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

fn ledger_kind(e: &LedgerError) -> ErrorKind {
    match e {
        LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
        LedgerError::AccountNotFound(_) => ErrorKind::AccountNotFound,
        LedgerError::InvoiceNotFound(_)
        | LedgerError::WithdrawalNotFound(_)
        | LedgerError::TicketNotFound(_) => ErrorKind::NotFound,
        LedgerError::InvoiceAlreadySettled(_) | LedgerError::WithdrawalAlreadyResolved { .. } => {
            ErrorKind::Conflict
        }
        LedgerError::InvalidAmount(_) => ErrorKind::InvalidRequest,
        LedgerError::Database(_)
        | LedgerError::BalanceOverflow
        | LedgerError::Timeout(_)
        | LedgerError::Corrupt(_) => ErrorKind::Internal,
    }
}

fn withdrawal_kind(e: &WithdrawalError) -> ErrorKind {
    match e {
        WithdrawalError::BelowMinimum { .. } | WithdrawalError::NotEligible { .. } => {
            ErrorKind::InvalidStake
        }
        WithdrawalError::EmptyWallet => ErrorKind::InvalidRequest,
        WithdrawalError::Unauthorized(_) => ErrorKind::Unauthorized,
        WithdrawalError::Ledger(e) => ledger_kind(e),
    }
}

impl BotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BotError::OutOfOrder(_) => ErrorKind::OutOfOrder,
            BotError::Wager(e) => match e {
                WagerError::InvalidStake { .. } => ErrorKind::InvalidStake,
                WagerError::InvalidPick { .. } => ErrorKind::InvalidPick,
                WagerError::Ledger(e) => ledger_kind(e),
            },
            BotError::Payment(e) => match e {
                PaymentError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
                PaymentError::BelowMinimum { .. } => ErrorKind::InvalidStake,
                PaymentError::Ledger(e) => ledger_kind(e),
            },
            BotError::Withdrawal(e) => withdrawal_kind(e),
            BotError::Admin(e) => match e {
                AdminError::Unauthorized(_) => ErrorKind::Unauthorized,
                AdminError::EmptyReply | AdminError::Settings(_) => ErrorKind::InvalidRequest,
                AdminError::Withdrawal(e) => withdrawal_kind(e),
                AdminError::Ledger(e) => ledger_kind(e),
            },
            BotError::Support(e) => match e {
                SupportError::EmptyMessage => ErrorKind::InvalidRequest,
                SupportError::Ledger(e) => ledger_kind(e),
            },
            BotError::Ledger(e) => ledger_kind(e),
        }
    }

    /// Message safe to show to the player
    pub fn client_message(&self) -> String {
        match self {
            BotError::OutOfOrder(message) => message.to_string(),
            BotError::Wager(e) => e.client_message(),
            BotError::Payment(e) => e.client_message(),
            BotError::Withdrawal(e) => e.client_message(),
            BotError::Admin(e) => e.client_message(),
            BotError::Support(e) => e.to_string(),
            BotError::Ledger(e) => e.client_message(),
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;
