//! In-process ledger backend for development mode and tests.
//!
//! Each account sits behind its own mutex so that mutations to one account
//! are linearized while different accounts never contend. No map or table
//! guard is held while waiting on an account. Lock order is always: the
//! account, then request tables (invoices, withdrawals, tickets), then the
//! append-only logs.

use super::{
    errors::{LedgerError, LedgerResult},
    models::{
        Account, AccountDefaults, AccountId, BalanceDelta, Balances, EntryReason, GameStats,
        Invoice, InvoiceStatus, Language, LedgerEntry, Mode, NewInvoice, ProfileUpdate,
        SettledWager, SupportReply, SupportTicket, TicketStatus, WagerRecord, WithdrawalDecision,
        WithdrawalRequest, WithdrawalStatus,
    },
    store::{
        AccountStore, InvoiceStore, SettingsStore, SupportStore, WagerResolver, WithdrawalStore,
        apply_plan,
    },
};
use crate::money::Cents;
use crate::settings::GameSettings;
use crate::wager::Outcome;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};
use tokio::sync::{Mutex, RwLock};

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<AccountId, Arc<Mutex<Account>>>>,
    entries: Mutex<Vec<LedgerEntry>>,
    wagers: Mutex<Vec<WagerRecord>>,
    invoices: Mutex<HashMap<String, Invoice>>,
    withdrawals: Mutex<BTreeMap<i64, WithdrawalRequest>>,
    tickets: Mutex<BTreeMap<i64, SupportTicket>>,
    replies: Mutex<Vec<SupportReply>>,
    settings: Mutex<Option<GameSettings>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn account_handle(&self, account_id: AccountId) -> LedgerResult<Arc<Mutex<Account>>> {
        self.accounts
            .read()
            .await
            .get(&account_id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Apply `delta` to a locked account and append the audit entry.
    async fn apply_locked(
        &self,
        account: &mut Account,
        delta: BalanceDelta,
        reason: EntryReason,
        reference: Option<String>,
    ) -> LedgerResult<Balances> {
        if let Some((mode, available, required)) = delta.shortfall(&account.balances) {
            return Err(LedgerError::insufficient(account.id, mode, available, required));
        }
        let balances = account
            .balances
            .checked_apply(delta)
            .ok_or(LedgerError::BalanceOverflow)?;

        account.balances = balances;
        self.push_entry(account.id, delta, balances, reason, reference)
            .await;

        Ok(balances)
    }

    async fn push_entry(
        &self,
        account_id: AccountId,
        delta: BalanceDelta,
        balances_after: Balances,
        reason: EntryReason,
        reference: Option<String>,
    ) {
        let entry = LedgerEntry {
            id: self.next_id(),
            account_id,
            delta,
            balances_after,
            reason,
            reference,
            created_at: Utc::now(),
        };
        self.entries.lock().await.push(entry);
    }
}

fn new_account(
    account_id: AccountId,
    username: Option<&str>,
    defaults: &AccountDefaults,
    now: DateTime<Utc>,
) -> Account {
    Account {
        id: account_id,
        username: username.map(str::to_string),
        language: Language::default(),
        terms_accepted: false,
        balances: Balances {
            demo: defaults.demo_balance,
            real: defaults.real_balance,
        },
        consecutive_wins: 0,
        warm_up_wins_remaining: defaults.warm_up_wins,
        games_played: 0,
        wins: 0,
        losses: 0,
        total_won: 0,
        total_lost: 0,
        registered_at: now,
        last_active: now,
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn open_account(
        &self,
        account_id: AccountId,
        username: Option<&str>,
        defaults: &AccountDefaults,
    ) -> LedgerResult<(Account, bool)> {
        let now = Utc::now();

        let found = self.accounts.read().await.get(&account_id).cloned();
        let handle = match found {
            Some(handle) => handle,
            None => {
                let mut accounts = self.accounts.write().await;
                // Another caller may have created it between the two lookups
                if let Some(handle) = accounts.get(&account_id) {
                    handle.clone()
                } else {
                    let account = new_account(account_id, username, defaults, now);
                    accounts.insert(account_id, Arc::new(Mutex::new(account.clone())));
                    return Ok((account, true));
                }
            }
        };

        let mut account = handle.lock().await;
        account.last_active = now;
        if let Some(name) = username {
            account.username = Some(name.to_string());
        }
        Ok((account.clone(), false))
    }

    async fn get_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        let handle = self.account_handle(account_id).await?;
        let account = handle.lock().await;
        Ok(account.clone())
    }

    async fn update_profile(
        &self,
        account_id: AccountId,
        update: ProfileUpdate,
    ) -> LedgerResult<Account> {
        let handle = self.account_handle(account_id).await?;
        let mut account = handle.lock().await;
        if let Some(language) = update.language {
            account.language = language;
        }
        if let Some(accepted) = update.terms_accepted {
            account.terms_accepted = accepted;
        }
        account.last_active = Utc::now();
        Ok(account.clone())
    }

    async fn list_accounts(&self, limit: i64) -> LedgerResult<Vec<Account>> {
        let handles: Vec<_> = self.accounts.read().await.values().cloned().collect();
        let mut accounts = Vec::with_capacity(handles.len());
        for handle in handles {
            accounts.push(handle.lock().await.clone());
        }
        accounts.sort_by(|a, b| b.registered_at.cmp(&a.registered_at).then(b.id.cmp(&a.id)));
        accounts.truncate(limit.max(0) as usize);
        Ok(accounts)
    }

    async fn apply_delta(
        &self,
        account_id: AccountId,
        delta: BalanceDelta,
        reason: EntryReason,
        reference: Option<String>,
    ) -> LedgerResult<Balances> {
        let handle = self.account_handle(account_id).await?;
        let mut account = handle.lock().await;
        self.apply_locked(&mut account, delta, reason, reference)
            .await
    }

    async fn settle_wager(
        &self,
        account_id: AccountId,
        resolver: &dyn WagerResolver,
    ) -> LedgerResult<SettledWager> {
        let handle = self.account_handle(account_id).await?;
        let mut account = handle.lock().await;

        let plan = resolver.resolve(&account)?;
        let next = apply_plan(&account, &plan)?;

        let record = WagerRecord {
            id: self.next_id(),
            account_id,
            variant: plan.variant,
            mode: plan.mode,
            stake: plan.stake,
            outcome: plan.outcome,
            payout: plan.payout,
            reveal: plan.reveal.clone(),
            forced_by: plan.forced_by,
            played_at: Utc::now(),
        };

        *account = next.clone();
        self.wagers.lock().await.push(record.clone());
        self.push_entry(
            account_id,
            plan.delta(),
            next.balances,
            EntryReason::Wager,
            Some(format!("wager:{}", record.id)),
        )
        .await;

        Ok(SettledWager {
            record,
            account: next,
        })
    }

    async fn entries(&self, account_id: AccountId, limit: i64) -> LedgerResult<Vec<LedgerEntry>> {
        self.account_handle(account_id).await?;
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| e.account_id == account_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn wagers(&self, account_id: AccountId, limit: i64) -> LedgerResult<Vec<WagerRecord>> {
        self.account_handle(account_id).await?;
        let wagers = self.wagers.lock().await;
        Ok(wagers
            .iter()
            .rev()
            .filter(|w| w.account_id == account_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn game_stats(&self) -> LedgerResult<GameStats> {
        let wagers = self.wagers.lock().await;
        let mut stats = GameStats::default();
        let mut by_variant: BTreeMap<String, (crate::wager::GameVariant, i64)> = BTreeMap::new();

        for wager in wagers.iter() {
            stats.total_games += 1;
            match wager.outcome {
                Outcome::Win => stats.total_wins += 1,
                Outcome::Lose => stats.total_losses += 1,
            }
            if wager.mode == Mode::Real {
                match wager.outcome {
                    Outcome::Win => stats.house_profit -= wager.payout,
                    Outcome::Lose => stats.house_profit += wager.stake,
                }
            }
            by_variant
                .entry(wager.variant.to_string())
                .or_insert((wager.variant, 0))
                .1 += 1;
        }
        stats.games_by_variant = by_variant.into_values().collect();

        Ok(stats.with_percentages())
    }

    async fn health_check(&self) -> LedgerResult<()> {
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn insert_invoice(&self, invoice: NewInvoice) -> LedgerResult<Invoice> {
        if invoice.amount <= 0 {
            return Err(LedgerError::InvalidAmount(invoice.amount));
        }
        self.account_handle(invoice.account_id).await?;

        let now = Utc::now();
        let stored = Invoice {
            id: invoice.id,
            account_id: invoice.account_id,
            amount: invoice.amount,
            order_id: invoice.order_id,
            pay_url: invoice.pay_url,
            status: InvoiceStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.invoices
            .lock()
            .await
            .insert(stored.id.clone(), stored.clone());

        Ok(stored)
    }

    async fn get_invoice(&self, invoice_id: &str) -> LedgerResult<Invoice> {
        self.invoices
            .lock()
            .await
            .get(invoice_id)
            .cloned()
            .ok_or_else(|| LedgerError::InvoiceNotFound(invoice_id.to_string()))
    }

    async fn pending_invoices(&self) -> LedgerResult<Vec<Invoice>> {
        let invoices = self.invoices.lock().await;
        let mut pending: Vec<_> = invoices
            .values()
            .filter(|i| i.status == InvoiceStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(pending)
    }

    async fn settle_invoice(&self, invoice_id: &str) -> LedgerResult<(Invoice, Balances)> {
        let (account_id, amount) = {
            let invoices = self.invoices.lock().await;
            let invoice = invoices
                .get(invoice_id)
                .ok_or_else(|| LedgerError::InvoiceNotFound(invoice_id.to_string()))?;
            (invoice.account_id, invoice.amount)
        };

        let handle = self.account_handle(account_id).await?;
        let mut account = handle.lock().await;

        // Re-checked under the account lock: a concurrent sweep may have won
        let mut invoices = self.invoices.lock().await;
        let invoice = invoices
            .get_mut(invoice_id)
            .ok_or_else(|| LedgerError::InvoiceNotFound(invoice_id.to_string()))?;
        if invoice.status != InvoiceStatus::Pending {
            return Err(LedgerError::InvoiceAlreadySettled(invoice_id.to_string()));
        }

        let balances = self
            .apply_locked(
                &mut account,
                BalanceDelta::on(Mode::Real, amount),
                EntryReason::Deposit,
                Some(format!("invoice:{invoice_id}")),
            )
            .await?;

        invoice.status = InvoiceStatus::Paid;
        invoice.updated_at = Utc::now();

        Ok((invoice.clone(), balances))
    }

    async fn fail_invoice(&self, invoice_id: &str) -> LedgerResult<Invoice> {
        let mut invoices = self.invoices.lock().await;
        let invoice = invoices
            .get_mut(invoice_id)
            .ok_or_else(|| LedgerError::InvoiceNotFound(invoice_id.to_string()))?;

        if invoice.status != InvoiceStatus::Pending {
            return Err(LedgerError::InvoiceAlreadySettled(invoice_id.to_string()));
        }
        invoice.status = InvoiceStatus::Failed;
        invoice.updated_at = Utc::now();

        Ok(invoice.clone())
    }
}

#[async_trait]
impl WithdrawalStore for MemoryStore {
    async fn open_withdrawal(
        &self,
        account_id: AccountId,
        amount: Cents,
        wallet: &str,
    ) -> LedgerResult<(WithdrawalRequest, Balances)> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let handle = self.account_handle(account_id).await?;
        let mut account = handle.lock().await;

        let id = self.next_id();
        let balances = self
            .apply_locked(
                &mut account,
                BalanceDelta::on(Mode::Real, -amount),
                EntryReason::WithdrawalEscrow,
                Some(format!("withdrawal:{id}")),
            )
            .await?;

        let now = Utc::now();
        let request = WithdrawalRequest {
            id,
            account_id,
            amount,
            wallet: wallet.to_string(),
            status: WithdrawalStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.withdrawals.lock().await.insert(id, request.clone());

        Ok((request, balances))
    }

    async fn get_withdrawal(&self, withdrawal_id: i64) -> LedgerResult<WithdrawalRequest> {
        self.withdrawals
            .lock()
            .await
            .get(&withdrawal_id)
            .cloned()
            .ok_or(LedgerError::WithdrawalNotFound(withdrawal_id))
    }

    async fn pending_withdrawals(&self) -> LedgerResult<Vec<WithdrawalRequest>> {
        let withdrawals = self.withdrawals.lock().await;
        Ok(withdrawals
            .values()
            .rev()
            .filter(|w| w.status == WithdrawalStatus::Pending)
            .cloned()
            .collect())
    }

    async fn resolve_withdrawal(
        &self,
        withdrawal_id: i64,
        decision: WithdrawalDecision,
    ) -> LedgerResult<(WithdrawalRequest, Balances)> {
        let account_id = self.get_withdrawal(withdrawal_id).await?.account_id;

        let handle = self.account_handle(account_id).await?;
        let mut account = handle.lock().await;

        let mut withdrawals = self.withdrawals.lock().await;
        let request = withdrawals
            .get_mut(&withdrawal_id)
            .ok_or(LedgerError::WithdrawalNotFound(withdrawal_id))?;
        if request.status != WithdrawalStatus::Pending {
            return Err(LedgerError::WithdrawalAlreadyResolved {
                id: withdrawal_id,
                status: request.status,
            });
        }

        let balances = match decision {
            WithdrawalDecision::Approve => account.balances,
            WithdrawalDecision::Reject => {
                self.apply_locked(
                    &mut account,
                    BalanceDelta::on(Mode::Real, request.amount),
                    EntryReason::WithdrawalRefund,
                    Some(format!("withdrawal:{withdrawal_id}")),
                )
                .await?
            }
        };

        request.status = decision.status();
        request.updated_at = Utc::now();

        Ok((request.clone(), balances))
    }
}

#[async_trait]
impl SupportStore for MemoryStore {
    async fn open_ticket(&self, account_id: AccountId, message: &str) -> LedgerResult<SupportTicket> {
        self.account_handle(account_id).await?;
        let ticket = SupportTicket {
            id: self.next_id(),
            account_id,
            message: message.to_string(),
            status: TicketStatus::Pending,
            created_at: Utc::now(),
        };
        self.tickets.lock().await.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn get_ticket(&self, ticket_id: i64) -> LedgerResult<SupportTicket> {
        self.tickets
            .lock()
            .await
            .get(&ticket_id)
            .cloned()
            .ok_or(LedgerError::TicketNotFound(ticket_id))
    }

    async fn pending_tickets(&self) -> LedgerResult<Vec<SupportTicket>> {
        let tickets = self.tickets.lock().await;
        Ok(tickets
            .values()
            .filter(|t| t.status == TicketStatus::Pending)
            .cloned()
            .collect())
    }

    async fn answer_ticket(
        &self,
        ticket_id: i64,
        admin_id: AccountId,
        reply: &str,
    ) -> LedgerResult<(SupportTicket, SupportReply)> {
        let mut tickets = self.tickets.lock().await;
        let ticket = tickets
            .get_mut(&ticket_id)
            .ok_or(LedgerError::TicketNotFound(ticket_id))?;

        ticket.status = TicketStatus::Answered;
        let stored = SupportReply {
            id: self.next_id(),
            ticket_id,
            admin_id,
            reply: reply.to_string(),
            created_at: Utc::now(),
        };
        self.replies.lock().await.push(stored.clone());

        Ok((ticket.clone(), stored))
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load_settings(&self) -> LedgerResult<Option<GameSettings>> {
        Ok(self.settings.lock().await.clone())
    }

    async fn save_settings(&self, settings: &GameSettings) -> LedgerResult<()> {
        *self.settings.lock().await = Some(settings.clone());
        Ok(())
    }
}
