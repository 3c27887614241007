use super::{
    AdminIds,
    errors::{AdminError, AdminResult},
};
use crate::ledger::{
    Account, AccountId, AccountStore, BalanceDelta, Balances, EntryReason, GameStats,
    SettingsStore, Store, SupportReply, SupportStore, SupportTicket, WithdrawalRequest,
};
use crate::money::Cents;
use crate::notify::{Notice, Notifier, Recipient};
use crate::settings::{GameSettings, SettingsHandle};
use crate::withdrawal::WithdrawalDesk;
use crate::Mode;
use std::sync::Arc;

/// Privileged operations for configured administrators.
pub struct AdminDesk {
    accounts: Arc<dyn AccountStore>,
    support: Arc<dyn SupportStore>,
    settings_store: Arc<dyn SettingsStore>,
    settings: SettingsHandle,
    withdrawals: Arc<WithdrawalDesk>,
    notifier: Arc<dyn Notifier>,
    admins: AdminIds,
}

impl AdminDesk {
    pub fn new<S: Store + 'static>(
        store: Arc<S>,
        withdrawals: Arc<WithdrawalDesk>,
        notifier: Arc<dyn Notifier>,
        settings: SettingsHandle,
        admins: AdminIds,
    ) -> Self {
        Self {
            accounts: store.clone(),
            support: store.clone(),
            settings_store: store,
            settings,
            withdrawals,
            notifier,
            admins,
        }
    }

    pub fn is_admin(&self, account_id: AccountId) -> bool {
        self.admins.contains(account_id)
    }

    fn authorize(&self, caller: AccountId) -> AdminResult<()> {
        if self.admins.contains(caller) {
            Ok(())
        } else {
            log::warn!("Rejected admin operation from account {caller}");
            Err(AdminError::Unauthorized(caller))
        }
    }

    /// Most recently registered accounts
    pub async fn accounts(&self, caller: AccountId, limit: i64) -> AdminResult<Vec<Account>> {
        self.authorize(caller)?;
        Ok(self.accounts.list_accounts(limit).await?)
    }

    /// Aggregate game statistics
    pub async fn stats(&self, caller: AccountId) -> AdminResult<GameStats> {
        self.authorize(caller)?;
        Ok(self.accounts.game_stats().await?)
    }

    pub async fn pending_withdrawals(&self, caller: AccountId) -> AdminResult<Vec<WithdrawalRequest>> {
        self.authorize(caller)?;
        Ok(self.withdrawals.pending().await?)
    }

    pub async fn approve_withdrawal(
        &self,
        caller: AccountId,
        withdrawal_id: i64,
    ) -> AdminResult<(WithdrawalRequest, Balances)> {
        self.authorize(caller)?;
        Ok(self.withdrawals.approve(caller, withdrawal_id).await?)
    }

    pub async fn reject_withdrawal(
        &self,
        caller: AccountId,
        withdrawal_id: i64,
    ) -> AdminResult<(WithdrawalRequest, Balances)> {
        self.authorize(caller)?;
        Ok(self.withdrawals.reject(caller, withdrawal_id).await?)
    }

    /// Add a signed amount to one balance of an account.
    ///
    /// Fails with `InsufficientFunds` rather than clamping when a negative
    /// adjustment exceeds the balance.
    pub async fn adjust_balance(
        &self,
        caller: AccountId,
        account_id: AccountId,
        mode: Mode,
        amount: Cents,
    ) -> AdminResult<Balances> {
        self.authorize(caller)?;
        // i64::MIN cannot be negated
        if amount == 0 || amount == Cents::MIN {
            return Err(crate::ledger::LedgerError::InvalidAmount(amount).into());
        }

        let delta = BalanceDelta::on(mode, amount);
        let balances = self
            .accounts
            .apply_delta(
                account_id,
                delta,
                EntryReason::AdminAdjust,
                Some(format!("admin:{caller}")),
            )
            .await?;

        log::info!("Admin {caller} adjusted {mode} balance of account {account_id} by {amount}");

        self.notifier
            .notify(
                Recipient::Account(account_id),
                Notice::BalanceAdjusted {
                    demo_delta: delta.demo,
                    real_delta: delta.real,
                    demo_balance: balances.demo,
                    real_balance: balances.real,
                },
            )
            .await;

        Ok(balances)
    }

    /// Current game settings
    pub async fn settings(&self, caller: AccountId) -> AdminResult<Arc<GameSettings>> {
        self.authorize(caller)?;
        Ok(self.settings.snapshot().await)
    }

    /// Validate, persist and install new settings.
    ///
    /// Nothing is stored or installed when validation fails.
    pub async fn update_settings(&self, caller: AccountId, settings: GameSettings) -> AdminResult<()> {
        self.authorize(caller)?;
        settings.validate()?;
        self.settings_store.save_settings(&settings).await?;
        self.settings.replace(settings).await?;

        log::info!("Admin {caller} replaced game settings");
        Ok(())
    }

    /// Tickets waiting for an answer
    pub async fn pending_tickets(&self, caller: AccountId) -> AdminResult<Vec<SupportTicket>> {
        self.authorize(caller)?;
        Ok(self.support.pending_tickets().await?)
    }

    /// Answer a ticket and forward the reply to its author
    pub async fn reply(
        &self,
        caller: AccountId,
        ticket_id: i64,
        reply: &str,
    ) -> AdminResult<(SupportTicket, SupportReply)> {
        self.authorize(caller)?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(AdminError::EmptyReply);
        }

        let (ticket, stored) = self.support.answer_ticket(ticket_id, caller, reply).await?;

        self.notifier
            .notify(
                Recipient::Account(ticket.account_id),
                Notice::SupportTicketAnswered {
                    ticket_id,
                    reply: stored.reply.clone(),
                },
            )
            .await;

        Ok((ticket, stored))
    }
}
