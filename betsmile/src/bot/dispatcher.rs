use super::{
    errors::{BotError, BotResult},
    intents::{AdminIntent, Intent, Reply},
    session::{PlayContext, SessionRegistry},
};
use crate::admin::{AdminDesk, AdminIds};
use crate::ledger::{AccountId, AccountStore, LedgerError, ProfileUpdate, Store};
use crate::money::Cents;
use crate::notify::Notifier;
use crate::payments::{PaymentProvider, PaymentReconciler};
use crate::settings::SettingsHandle;
use crate::support::SupportDesk;
use crate::wager::{GameVariant, Pick, WagerEngine, WagerError, WagerReceipt};
use crate::withdrawal::WithdrawalDesk;
use std::sync::Arc;

/// History entries returned when the intent does not ask for a count
pub const DEFAULT_HISTORY_LIMIT: i64 = 10;

const MAX_HISTORY_LIMIT: i64 = 100;

/// Default page size for the admin account list
const ADMIN_ACCOUNT_LIMIT: i64 = 20;

/// Routes intents to the components and keeps the play contexts.
pub struct Dispatcher {
    accounts: Arc<dyn AccountStore>,
    settings: SettingsHandle,
    engine: Arc<WagerEngine>,
    reconciler: Arc<PaymentReconciler>,
    withdrawals: Arc<WithdrawalDesk>,
    admin: Arc<AdminDesk>,
    support: Arc<SupportDesk>,
    sessions: SessionRegistry,
}

impl Dispatcher {
    /// Wire every component over one store.
    pub fn new<S: Store + 'static>(
        store: Arc<S>,
        settings: SettingsHandle,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
        admins: AdminIds,
    ) -> Self {
        let engine = Arc::new(WagerEngine::new(store.clone(), settings.clone()));
        Self::with_engine(store, settings, engine, provider, notifier, admins)
    }

    /// Like [`Dispatcher::new`] with a caller-built wager engine.
    pub fn with_engine<S: Store + 'static>(
        store: Arc<S>,
        settings: SettingsHandle,
        engine: Arc<WagerEngine>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
        admins: AdminIds,
    ) -> Self {
        let reconciler = Arc::new(PaymentReconciler::new(
            store.clone(),
            provider,
            notifier.clone(),
            settings.clone(),
        ));
        let withdrawals = Arc::new(WithdrawalDesk::new(
            store.clone(),
            notifier.clone(),
            settings.clone(),
            admins.clone(),
        ));
        let admin = Arc::new(AdminDesk::new(
            store.clone(),
            withdrawals.clone(),
            notifier.clone(),
            settings.clone(),
            admins,
        ));
        let support = Arc::new(SupportDesk::new(store.clone(), notifier));

        Self {
            accounts: store,
            settings,
            engine,
            reconciler,
            withdrawals,
            admin,
            support,
            sessions: SessionRegistry::new(),
        }
    }

    /// Payment reconciler, for the periodic sweep
    pub fn reconciler(&self) -> Arc<PaymentReconciler> {
        self.reconciler.clone()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Handle an intent, turning any error into [`Reply::Error`].
    pub async fn respond(&self, account_id: AccountId, intent: Intent) -> Reply {
        match self.handle(account_id, intent).await {
            Ok(reply) => reply,
            Err(e) => {
                let kind = e.kind();
                if kind == super::ErrorKind::Internal {
                    log::error!("Intent from account {account_id} failed: {e}");
                } else {
                    log::debug!("Intent from account {account_id} rejected: {e}");
                }
                Reply::Error {
                    kind,
                    message: e.client_message(),
                }
            }
        }
    }

    /// Handle one intent from `account_id`.
    pub async fn handle(&self, account_id: AccountId, intent: Intent) -> BotResult<Reply> {
        match intent {
            Intent::Start { username } => self.start(account_id, username.as_deref()).await,
            Intent::SelectMode { mode } => {
                let balance = self.accounts.get_balances(account_id).await?.get(mode);
                self.sessions
                    .put(PlayContext {
                        mode: Some(mode),
                        ..PlayContext::new(account_id)
                    })
                    .await;
                Ok(Reply::ModeSelected { mode, balance })
            }
            Intent::SelectGame { variant } => self.select_game(account_id, variant).await,
            Intent::EnterStake { amount } => self.enter_stake(account_id, amount).await,
            Intent::Pick { pick } => self.pick(account_id, pick).await,
            Intent::SetLanguage { language } => {
                let update = ProfileUpdate {
                    language: Some(language),
                    ..ProfileUpdate::default()
                };
                Ok(Reply::Profile {
                    account: self.accounts.update_profile(account_id, update).await?,
                })
            }
            Intent::AcceptTerms => {
                let update = ProfileUpdate {
                    terms_accepted: Some(true),
                    ..ProfileUpdate::default()
                };
                Ok(Reply::Profile {
                    account: self.accounts.update_profile(account_id, update).await?,
                })
            }
            Intent::Profile => Ok(Reply::Profile {
                account: self.accounts.get_account(account_id).await?,
            }),
            Intent::History { limit } => {
                let limit = limit
                    .unwrap_or(DEFAULT_HISTORY_LIMIT)
                    .clamp(1, MAX_HISTORY_LIMIT);
                Ok(Reply::History {
                    wagers: self.accounts.wagers(account_id, limit).await?,
                })
            }
            Intent::Deposit { amount } => {
                let invoice = self.reconciler.create_invoice(account_id, amount).await?;
                Ok(Reply::InvoiceCreated {
                    invoice_id: invoice.id,
                    amount: invoice.amount,
                    pay_url: invoice.pay_url,
                })
            }
            Intent::Withdraw { amount, wallet } => {
                let (request, balances) = self.withdrawals.request(account_id, amount, &wallet).await?;
                Ok(Reply::WithdrawalRequested { request, balances })
            }
            Intent::Support { message } => {
                let ticket = self.support.open_ticket(account_id, &message).await?;
                Ok(Reply::TicketOpened { ticket_id: ticket.id })
            }
            Intent::Cancel => {
                self.sessions.clear(account_id).await;
                Ok(Reply::Cancelled)
            }
            Intent::Admin(action) => self.admin(account_id, action).await,
        }
    }

    async fn start(&self, account_id: AccountId, username: Option<&str>) -> BotResult<Reply> {
        let defaults = self.settings.snapshot().await.account_defaults();
        let (account, created) = self
            .accounts
            .open_account(account_id, username, &defaults)
            .await?;
        if created {
            log::info!("Registered account {account_id}");
        }
        self.sessions.clear(account_id).await;

        Ok(Reply::Welcome {
            account,
            created,
            games: GameVariant::ALL.to_vec(),
        })
    }

    async fn select_game(&self, account_id: AccountId, variant: GameVariant) -> BotResult<Reply> {
        let mut context = self.sessions.get(account_id).await;
        let mode = context.mode.ok_or(BotError::OutOfOrder("Select a mode first"))?;

        let settings = self.settings.snapshot().await;
        let balance = self.accounts.get_balances(account_id).await?.get(mode);

        context.variant = Some(variant);
        context.stake = None;
        self.sessions.put(context).await;

        Ok(Reply::GameSelected {
            variant,
            mode,
            min_bet: settings.min_bet,
            max_bet: settings.max_bet,
            balance,
        })
    }

    async fn enter_stake(&self, account_id: AccountId, amount: Cents) -> BotResult<Reply> {
        let mut context = self.sessions.get(account_id).await;
        let (mode, variant) = match (context.mode, context.variant) {
            (Some(mode), Some(variant)) => (mode, variant),
            (None, _) => return Err(BotError::OutOfOrder("Select a mode first")),
            (Some(_), None) => return Err(BotError::OutOfOrder("Select a game first")),
        };

        // Early feedback only; settlement checks both again under the lock
        WagerEngine::check_stake(&*self.settings.snapshot().await, amount)?;
        let available = self.accounts.get_balances(account_id).await?.get(mode);
        if available < amount {
            return Err(LedgerError::insufficient(account_id, mode, available, amount).into());
        }

        if variant.needs_pick() {
            context.stake = Some(amount);
            self.sessions.put(context).await;
            return Ok(Reply::PickNeeded {
                variant,
                stake: amount,
            });
        }

        let receipt = self
            .engine
            .place_wager(account_id, variant, amount, mode, Pick::None)
            .await?;
        Ok(settled(receipt))
    }

    async fn pick(&self, account_id: AccountId, pick: Pick) -> BotResult<Reply> {
        let mut context = self.sessions.get(account_id).await;
        let (mode, variant, stake) = match (context.mode, context.variant, context.stake) {
            (Some(mode), Some(variant), Some(stake)) => (mode, variant, stake),
            _ => return Err(BotError::OutOfOrder("Enter a stake first")),
        };

        let result = self
            .engine
            .place_wager(account_id, variant, stake, mode, pick)
            .await;

        // A bad pick can be retried with the same stake
        if !matches!(result, Err(WagerError::InvalidPick { .. })) {
            context.stake = None;
            self.sessions.put(context).await;
        }

        Ok(settled(result?))
    }

    async fn admin(&self, caller: AccountId, action: AdminIntent) -> BotResult<Reply> {
        let admin = &self.admin;
        let reply = match action {
            AdminIntent::ListAccounts { limit } => Reply::Accounts {
                accounts: admin
                    .accounts(caller, limit.unwrap_or(ADMIN_ACCOUNT_LIMIT).clamp(1, 1_000))
                    .await?,
            },
            AdminIntent::Stats => Reply::Stats {
                stats: admin.stats(caller).await?,
            },
            AdminIntent::PendingWithdrawals => Reply::Withdrawals {
                requests: admin.pending_withdrawals(caller).await?,
            },
            AdminIntent::ApproveWithdrawal { withdrawal_id } => {
                let (request, balances) = admin.approve_withdrawal(caller, withdrawal_id).await?;
                Reply::WithdrawalResolved { request, balances }
            }
            AdminIntent::RejectWithdrawal { withdrawal_id } => {
                let (request, balances) = admin.reject_withdrawal(caller, withdrawal_id).await?;
                Reply::WithdrawalResolved { request, balances }
            }
            AdminIntent::AdjustBalance {
                account_id,
                mode,
                amount,
            } => Reply::BalanceAdjusted {
                account_id,
                balances: admin.adjust_balance(caller, account_id, mode, amount).await?,
            },
            AdminIntent::ShowSettings => Reply::Settings {
                settings: admin.settings(caller).await?.as_ref().clone(),
            },
            AdminIntent::UpdateSettings { settings } => {
                admin.update_settings(caller, settings).await?;
                Reply::SettingsUpdated
            }
            AdminIntent::PendingTickets => Reply::Tickets {
                tickets: admin.pending_tickets(caller).await?,
            },
            AdminIntent::ReplyTicket { ticket_id, reply } => {
                let (ticket, reply) = admin.reply(caller, ticket_id, &reply).await?;
                Reply::TicketAnswered { ticket, reply }
            }
        };
        Ok(reply)
    }
}

fn settled(receipt: WagerReceipt) -> Reply {
    Reply::WagerSettled {
        balances: receipt.account.balances,
        warm_up_wins_remaining: receipt.account.warm_up_wins_remaining,
        record: receipt.record,
    }
}
