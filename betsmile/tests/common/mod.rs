//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use async_trait::async_trait;
use betsmile::admin::AdminIds;
use betsmile::bot::Dispatcher;
use betsmile::ledger::{AccountDefaults, AccountStore, BalanceDelta, EntryReason, MemoryStore};
use betsmile::notify::{Notice, Notifier, Recipient};
use betsmile::payments::{CreatedInvoice, PaymentError, PaymentProvider, PaymentResult, ProviderStatus};
use betsmile::settings::{GameSettings, SettingsHandle};
use betsmile::{AccountId, Cents, Mode};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

pub const ADMIN: AccountId = 1_000;

/// Provider whose answers are set by the test.
#[derive(Default)]
pub struct ScriptedProvider {
    statuses: Mutex<HashMap<String, ProviderStatus>>,
    unavailable: AtomicBool,
    next_id: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_status(&self, invoice_id: &str, status: ProviderStatus) {
        self.statuses
            .lock()
            .await
            .insert(invoice_id.to_string(), status);
    }

    /// Make every call fail as if the provider were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    async fn create_invoice(&self, _amount: Cents, order_id: &str) -> PaymentResult<CreatedInvoice> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PaymentError::ProviderUnavailable("scripted outage".to_string()));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let invoice_id = format!("INV-{n}");
        self.set_status(&invoice_id, ProviderStatus::Pending).await;
        Ok(CreatedInvoice {
            pay_url: format!("https://pay.test/{invoice_id}?order={order_id}"),
            invoice_id,
        })
    }

    async fn invoice_status(&self, invoice_id: &str) -> PaymentResult<ProviderStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PaymentError::ProviderUnavailable("scripted outage".to_string()));
        }
        Ok(self
            .statuses
            .lock()
            .await
            .get(invoice_id)
            .copied()
            .unwrap_or(ProviderStatus::Pending))
    }
}

/// Notifier that keeps every notice.
#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<(Recipient, Notice)>>,
}

impl RecordingNotifier {
    pub async fn sent(&self) -> Vec<(Recipient, Notice)> {
        self.notices.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: Recipient, notice: Notice) {
        self.notices.lock().await.push((recipient, notice));
    }
}

/// Settings where every unforced round wins and nothing is forced.
pub fn always_win() -> GameSettings {
    GameSettings {
        demo_win_chance: 1.0,
        real_win_chance: 1.0,
        warm_up_wins: 0,
        max_consecutive_wins: u32::MAX,
        ..GameSettings::default()
    }
}

/// Settings where every unforced round loses and nothing is forced.
pub fn always_lose() -> GameSettings {
    GameSettings {
        demo_win_chance: 0.0,
        real_win_chance: 0.0,
        warm_up_wins: 0,
        ..GameSettings::default()
    }
}

/// Open an account with explicit balances.
pub async fn open_account(
    store: &MemoryStore,
    account_id: AccountId,
    settings: &GameSettings,
    demo: Cents,
    real: Cents,
) {
    let defaults = AccountDefaults {
        demo_balance: demo,
        ..settings.account_defaults()
    };
    store.open_account(account_id, None, &defaults).await.unwrap();
    if real > 0 {
        store
            .apply_delta(
                account_id,
                BalanceDelta::on(Mode::Real, real),
                EntryReason::AdminAdjust,
                None,
            )
            .await
            .unwrap();
    }
}

/// Everything wired over an in-memory store.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub settings: SettingsHandle,
    pub provider: Arc<ScriptedProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub dispatcher: Dispatcher,
}

pub fn harness(settings: GameSettings) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let settings = SettingsHandle::new(settings);
    let provider = Arc::new(ScriptedProvider::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = Dispatcher::new(
        store.clone(),
        settings.clone(),
        provider.clone(),
        notifier.clone(),
        AdminIds::new([ADMIN]),
    );

    Harness {
        store,
        settings,
        provider,
        notifier,
        dispatcher,
    }
}
