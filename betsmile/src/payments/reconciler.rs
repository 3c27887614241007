use super::{
    errors::{PaymentError, PaymentResult},
    provider::{PaymentProvider, ProviderStatus},
};
use crate::ledger::{AccountId, AccountStore, Invoice, InvoiceStore, LedgerError, NewInvoice};
use crate::money::Cents;
use crate::notify::{Notice, Notifier, Recipient};
use crate::settings::SettingsHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use uuid::Uuid;

/// How often pending invoices are checked by default
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(300);

/// Result of one reconcile sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: usize,
    pub credited: usize,
    pub failed: usize,
    pub still_pending: usize,
    /// Provider errors; retried on the next sweep
    pub unavailable: usize,
    /// Invoices another sweep settled first
    pub already_settled: usize,
    /// Ledger errors other than the settlement guard
    pub errors: usize,
}

/// Creates invoices and reflects provider state into the ledger.
pub struct PaymentReconciler {
    invoices: Arc<dyn InvoiceStore>,
    accounts: Arc<dyn AccountStore>,
    provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn Notifier>,
    settings: SettingsHandle,
}

impl PaymentReconciler {
    pub fn new<S>(
        store: Arc<S>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
        settings: SettingsHandle,
    ) -> Self
    where
        S: InvoiceStore + AccountStore + 'static,
    {
        Self {
            invoices: store.clone(),
            accounts: store,
            provider,
            notifier,
            settings,
        }
    }

    /// Create a provider invoice and record it as pending.
    ///
    /// # Errors
    ///
    /// - `BelowMinimum` if `amount` is under the configured minimum deposit
    /// - `Ledger(AccountNotFound)` for an unknown account
    /// - `ProviderUnavailable` if the provider call fails; nothing is stored
    pub async fn create_invoice(&self, account_id: AccountId, amount: Cents) -> PaymentResult<Invoice> {
        let min = self.settings.snapshot().await.min_deposit;
        if amount < min {
            return Err(PaymentError::BelowMinimum { amount, min });
        }
        self.accounts.get_account(account_id).await?;

        let order_id = format!("order_{account_id}_{}", Uuid::new_v4().simple());
        let created = self.provider.create_invoice(amount, &order_id).await?;

        let invoice = self
            .invoices
            .insert_invoice(NewInvoice {
                id: created.invoice_id,
                account_id,
                amount,
                order_id,
                pay_url: created.pay_url,
            })
            .await?;

        log::info!(
            "Created invoice {} for account {account_id}, amount {amount}",
            invoice.id
        );

        Ok(invoice)
    }

    /// Check every pending invoice once.
    ///
    /// Only listing the pending invoices can fail the sweep; per-invoice
    /// problems are counted in the report and retried next time.
    pub async fn reconcile(&self) -> PaymentResult<ReconcileReport> {
        let pending = self.invoices.pending_invoices().await?;
        let mut report = ReconcileReport::default();

        for invoice in pending {
            report.checked += 1;

            let status = match self.provider.invoice_status(&invoice.id).await {
                Ok(status) => status,
                Err(e) => {
                    log::warn!("Could not check invoice {}: {e}", invoice.id);
                    report.unavailable += 1;
                    continue;
                }
            };

            match status {
                ProviderStatus::Pending => report.still_pending += 1,
                ProviderStatus::Paid => self.credit(&invoice, &mut report).await,
                ProviderStatus::Failed => match self.invoices.fail_invoice(&invoice.id).await {
                    Ok(_) => {
                        log::info!("Invoice {} failed at provider", invoice.id);
                        report.failed += 1;
                    }
                    Err(LedgerError::InvoiceAlreadySettled(_)) => report.already_settled += 1,
                    Err(e) => {
                        log::error!("Failed to mark invoice {} failed: {e}", invoice.id);
                        report.errors += 1;
                    }
                },
            }
        }

        if report.checked > 0 {
            log::info!("Reconcile sweep: {report:?}");
        }

        Ok(report)
    }

    async fn credit(&self, invoice: &Invoice, report: &mut ReconcileReport) {
        match self.invoices.settle_invoice(&invoice.id).await {
            Ok((invoice, balances)) => {
                log::info!(
                    "Credited invoice {} to account {}: +{}",
                    invoice.id,
                    invoice.account_id,
                    invoice.amount
                );
                report.credited += 1;
                self.notifier
                    .notify(
                        Recipient::Account(invoice.account_id),
                        Notice::DepositCredited {
                            invoice_id: invoice.id.clone(),
                            amount: invoice.amount,
                            real_balance: balances.real,
                        },
                    )
                    .await;
            }
            Err(LedgerError::InvoiceAlreadySettled(id)) => {
                log::debug!("Invoice {id} already settled, skipping");
                report.already_settled += 1;
            }
            Err(e) => {
                log::error!("Failed to credit invoice {}: {e}", invoice.id);
                report.errors += 1;
            }
        }
    }

    /// Sweep every `period` until `shutdown` flips to true.
    pub async fn run(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.reconcile().await {
                        log::error!("Reconcile sweep failed: {e}");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        log::info!("Payment reconciler stopping");
                        break;
                    }
                }
            }
        }
    }
}
