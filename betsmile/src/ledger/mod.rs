//! Ledger store: accounts, balances and the durable records around them.
//!
//! Two backends implement the same store traits:
//!
//! - [`PgStore`] for production, on PostgreSQL via sqlx
//! - [`MemoryStore`] for development mode and tests
//!
//! Every balance mutation appends a [`LedgerEntry`], so an account's balances
//! always equal its opening defaults plus the sum of its entries.

pub mod errors;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use errors::{LedgerError, LedgerResult};
pub use memory::MemoryStore;
pub use models::{
    Account, AccountDefaults, AccountId, BalanceDelta, Balances, EntryReason, GameStats, Invoice,
    InvoiceStatus, Language, LedgerEntry, Mode, NewInvoice, ProfileUpdate, SettledWager, SupportReply, SupportTicket,
    TicketStatus, WagerRecord, WithdrawalDecision, WithdrawalRequest, WithdrawalStatus,
};
pub use postgres::PgStore;
pub use store::{
    AccountStore, InvoiceStore, SettingsStore, Store, SupportStore, WagerPlan, WagerResolver,
    WithdrawalStore, apply_plan,
};
