use super::errors::{WithdrawalError, WithdrawalResult};
use crate::admin::AdminIds;
use crate::ledger::{
    AccountId, AccountStore, Balances, WithdrawalDecision, WithdrawalRequest, WithdrawalStore,
};
use crate::money::Cents;
use crate::notify::{Notice, Notifier, Recipient};
use crate::settings::SettingsHandle;
use std::sync::Arc;

/// Opens and resolves withdrawal requests.
pub struct WithdrawalDesk {
    withdrawals: Arc<dyn WithdrawalStore>,
    accounts: Arc<dyn AccountStore>,
    notifier: Arc<dyn Notifier>,
    settings: SettingsHandle,
    admins: AdminIds,
}

impl WithdrawalDesk {
    pub fn new<S>(
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
        settings: SettingsHandle,
        admins: AdminIds,
    ) -> Self
    where
        S: WithdrawalStore + AccountStore + 'static,
    {
        Self {
            withdrawals: store.clone(),
            accounts: store,
            notifier,
            settings,
            admins,
        }
    }

    /// Validate a request and escrow the amount.
    ///
    /// # Errors
    ///
    /// - `BelowMinimum` if `amount` is under `min_withdraw`
    /// - `NotEligible` if the real balance is under `min_withdraw`
    /// - `EmptyWallet` for a blank wallet
    /// - `Ledger(InsufficientFunds)` if the real balance does not cover `amount`
    ///
    /// Every error leaves the balance untouched.
    pub async fn request(
        &self,
        account_id: AccountId,
        amount: Cents,
        wallet: &str,
    ) -> WithdrawalResult<(WithdrawalRequest, Balances)> {
        let min = self.settings.snapshot().await.min_withdraw;
        let wallet = wallet.trim();

        if amount < min {
            return Err(WithdrawalError::BelowMinimum { amount, min });
        }
        let available = self.accounts.get_balances(account_id).await?.real;
        if available < min {
            return Err(WithdrawalError::NotEligible { available, min });
        }
        if wallet.is_empty() {
            return Err(WithdrawalError::EmptyWallet);
        }

        let (request, balances) = self
            .withdrawals
            .open_withdrawal(account_id, amount, wallet)
            .await?;

        log::info!(
            "Withdrawal {} opened by account {account_id}: {amount} to {wallet}",
            request.id
        );

        self.notifier
            .notify(
                Recipient::Admins,
                Notice::WithdrawalRequested {
                    withdrawal_id: request.id,
                    account_id,
                    amount,
                    wallet: request.wallet.clone(),
                },
            )
            .await;

        Ok((request, balances))
    }

    /// Approve a pending request; the escrowed funds stay debited.
    pub async fn approve(
        &self,
        admin_id: AccountId,
        withdrawal_id: i64,
    ) -> WithdrawalResult<(WithdrawalRequest, Balances)> {
        self.resolve(admin_id, withdrawal_id, WithdrawalDecision::Approve)
            .await
    }

    /// Reject a pending request and restore the escrowed funds.
    pub async fn reject(
        &self,
        admin_id: AccountId,
        withdrawal_id: i64,
    ) -> WithdrawalResult<(WithdrawalRequest, Balances)> {
        self.resolve(admin_id, withdrawal_id, WithdrawalDecision::Reject)
            .await
    }

    async fn resolve(
        &self,
        admin_id: AccountId,
        withdrawal_id: i64,
        decision: WithdrawalDecision,
    ) -> WithdrawalResult<(WithdrawalRequest, Balances)> {
        if !self.admins.contains(admin_id) {
            log::warn!("Account {admin_id} tried to resolve withdrawal {withdrawal_id}");
            return Err(WithdrawalError::Unauthorized(admin_id));
        }

        let (request, balances) = self
            .withdrawals
            .resolve_withdrawal(withdrawal_id, decision)
            .await?;

        log::info!(
            "Withdrawal {} {} by admin {admin_id}",
            request.id,
            request.status
        );

        let notice = match decision {
            WithdrawalDecision::Approve => Notice::WithdrawalApproved {
                withdrawal_id: request.id,
                amount: request.amount,
            },
            WithdrawalDecision::Reject => Notice::WithdrawalRejected {
                withdrawal_id: request.id,
                amount: request.amount,
                real_balance: balances.real,
            },
        };
        self.notifier
            .notify(Recipient::Account(request.account_id), notice)
            .await;

        Ok((request, balances))
    }

    /// Pending requests, newest first
    pub async fn pending(&self) -> WithdrawalResult<Vec<WithdrawalRequest>> {
        Ok(self.withdrawals.pending_withdrawals().await?)
    }
}
