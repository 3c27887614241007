//! Store traits shared by the PostgreSQL and in-memory backends.
//!
//! The store is the only writer of balance fields. Operations that depend on
//! the current balance re-read it inside the same atomic unit that writes it.

use super::{
    errors::{LedgerError, LedgerResult},
    models::{
        Account, AccountDefaults, AccountId, BalanceDelta, Balances, EntryReason, GameStats,
        Invoice, LedgerEntry, Mode, NewInvoice, ProfileUpdate, SettledWager, SupportReply,
        SupportTicket, WagerRecord, WithdrawalDecision, WithdrawalRequest,
    },
};
use crate::money::Cents;
use crate::settings::GameSettings;
use crate::wager::{ForcedBy, GameVariant, Outcome, Reveal};
use async_trait::async_trait;

/// Resolved round, ready to be applied to the locked account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WagerPlan {
    pub variant: GameVariant,
    pub mode: Mode,
    pub stake: Cents,
    pub outcome: Outcome,
    pub payout: Cents,
    pub reveal: Reveal,
    pub forced_by: Option<ForcedBy>,
}

impl WagerPlan {
    /// Net balance change of the round.
    pub fn delta(&self) -> BalanceDelta {
        BalanceDelta::on(self.mode, self.payout - self.stake)
    }
}

/// Decides a round from the account state read under the store's lock.
///
/// Called exactly once per `settle_wager`, synchronously, while the account
/// is locked. Returning an error aborts the settlement with no changes.
pub trait WagerResolver: Send + Sync {
    fn resolve(&self, account: &Account) -> LedgerResult<WagerPlan>;
}

/// Account state after applying `plan` to `account`.
///
/// Fails with `InsufficientFunds` if the stake is not covered.
pub fn apply_plan(account: &Account, plan: &WagerPlan) -> LedgerResult<Account> {
    if plan.stake <= 0 || plan.payout < 0 {
        return Err(LedgerError::InvalidAmount(plan.stake));
    }

    let available = account.balances.get(plan.mode);
    if available < plan.stake {
        return Err(LedgerError::insufficient(
            account.id,
            plan.mode,
            available,
            plan.stake,
        ));
    }

    let balances = account
        .balances
        .checked_apply(plan.delta())
        .ok_or(LedgerError::BalanceOverflow)?;

    let mut next = account.clone();
    next.balances = balances;
    next.games_played = next.games_played.saturating_add(1);

    if plan.forced_by == Some(ForcedBy::WarmUp) {
        next.warm_up_wins_remaining = next.warm_up_wins_remaining.saturating_sub(1);
    }

    match plan.outcome {
        Outcome::Win => {
            next.consecutive_wins = next.consecutive_wins.saturating_add(1);
            next.wins = next.wins.saturating_add(1);
            next.total_won = next.total_won.saturating_add(plan.payout);
        }
        Outcome::Lose => {
            next.consecutive_wins = 0;
            next.losses = next.losses.saturating_add(1);
            next.total_lost = next.total_lost.saturating_add(plan.stake);
        }
    }

    Ok(next)
}

/// Account balances, wagers and the audit log.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Get the account, creating it with `defaults` on first contact.
    ///
    /// Returns the account and whether it was created by this call.
    async fn open_account(
        &self,
        account_id: AccountId,
        username: Option<&str>,
        defaults: &AccountDefaults,
    ) -> LedgerResult<(Account, bool)>;

    /// Get an existing account
    async fn get_account(&self, account_id: AccountId) -> LedgerResult<Account>;

    /// Get the balance pair of an existing account
    async fn get_balances(&self, account_id: AccountId) -> LedgerResult<Balances> {
        Ok(self.get_account(account_id).await?.balances)
    }

    /// Record the player's language choice or terms acceptance.
    async fn update_profile(
        &self,
        account_id: AccountId,
        update: ProfileUpdate,
    ) -> LedgerResult<Account>;

    /// Most recently registered accounts first
    async fn list_accounts(&self, limit: i64) -> LedgerResult<Vec<Account>>;

    /// Apply both deltas atomically and append one audit entry.
    ///
    /// Fails with `InsufficientFunds` and leaves both balances unchanged if
    /// either would become negative.
    async fn apply_delta(
        &self,
        account_id: AccountId,
        delta: BalanceDelta,
        reason: EntryReason,
        reference: Option<String>,
    ) -> LedgerResult<Balances>;

    /// Lock the account, resolve a round against it and apply the result.
    async fn settle_wager(
        &self,
        account_id: AccountId,
        resolver: &dyn WagerResolver,
    ) -> LedgerResult<SettledWager>;

    /// Audit entries for an account, newest first
    async fn entries(&self, account_id: AccountId, limit: i64) -> LedgerResult<Vec<LedgerEntry>>;

    /// Wager history for an account, newest first
    async fn wagers(&self, account_id: AccountId, limit: i64) -> LedgerResult<Vec<WagerRecord>>;

    /// Aggregate statistics over all wagers
    async fn game_stats(&self) -> LedgerResult<GameStats>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> LedgerResult<()>;
}

/// Deposit invoices.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Store a new pending invoice
    async fn insert_invoice(&self, invoice: NewInvoice) -> LedgerResult<Invoice>;

    /// Get an invoice by provider id
    async fn get_invoice(&self, invoice_id: &str) -> LedgerResult<Invoice>;

    /// All invoices still waiting for payment, oldest first
    async fn pending_invoices(&self) -> LedgerResult<Vec<Invoice>>;

    /// Mark a pending invoice paid and credit the real balance, atomically.
    ///
    /// Fails with `InvoiceAlreadySettled` if the invoice is not pending, in
    /// which case nothing is credited.
    async fn settle_invoice(&self, invoice_id: &str) -> LedgerResult<(Invoice, Balances)>;

    /// Mark a pending invoice failed
    async fn fail_invoice(&self, invoice_id: &str) -> LedgerResult<Invoice>;
}

/// Withdrawal requests with escrow.
#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    /// Debit the real balance and record a pending request, atomically.
    async fn open_withdrawal(
        &self,
        account_id: AccountId,
        amount: Cents,
        wallet: &str,
    ) -> LedgerResult<(WithdrawalRequest, Balances)>;

    /// Get a withdrawal request
    async fn get_withdrawal(&self, withdrawal_id: i64) -> LedgerResult<WithdrawalRequest>;

    /// Pending requests, newest first
    async fn pending_withdrawals(&self) -> LedgerResult<Vec<WithdrawalRequest>>;

    /// Move a pending request to its terminal state.
    ///
    /// Rejection credits the escrowed amount back in the same atomic unit.
    async fn resolve_withdrawal(
        &self,
        withdrawal_id: i64,
        decision: WithdrawalDecision,
    ) -> LedgerResult<(WithdrawalRequest, Balances)>;
}

/// Support tickets and replies.
#[async_trait]
pub trait SupportStore: Send + Sync {
    /// Store a message from a user
    async fn open_ticket(&self, account_id: AccountId, message: &str) -> LedgerResult<SupportTicket>;

    /// Get a ticket
    async fn get_ticket(&self, ticket_id: i64) -> LedgerResult<SupportTicket>;

    /// Tickets waiting for an answer, oldest first
    async fn pending_tickets(&self) -> LedgerResult<Vec<SupportTicket>>;

    /// Mark a ticket answered and store the reply
    async fn answer_ticket(
        &self,
        ticket_id: i64,
        admin_id: AccountId,
        reply: &str,
    ) -> LedgerResult<(SupportTicket, SupportReply)>;
}

/// Persisted game settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the stored settings, if any were saved
    async fn load_settings(&self) -> LedgerResult<Option<GameSettings>>;

    /// Replace the stored settings
    async fn save_settings(&self, settings: &GameSettings) -> LedgerResult<()>;
}

/// A backend implementing every store trait.
pub trait Store: AccountStore + InvoiceStore + WithdrawalStore + SupportStore + SettingsStore {}

impl<T> Store for T where T: AccountStore + InvoiceStore + WithdrawalStore + SupportStore + SettingsStore {}
