//! Integration tests for invoice creation and reconciliation.

mod common;

use axum::{
    Json, Router,
    extract::Query,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use betsmile::ledger::{AccountStore, EntryReason, InvoiceStatus, InvoiceStore, LedgerError, MemoryStore};
use betsmile::notify::{LogNotifier, Notice, Recipient};
use betsmile::payments::{
    CryptoCloudClient, CryptoCloudConfig, PaymentError, PaymentProvider, PaymentReconciler,
    ProviderStatus,
};
use betsmile::settings::{GameSettings, SettingsHandle};
use common::{RecordingNotifier, ScriptedProvider};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

struct Setup {
    store: Arc<MemoryStore>,
    provider: Arc<ScriptedProvider>,
    notifier: Arc<RecordingNotifier>,
    reconciler: Arc<PaymentReconciler>,
}

async fn setup() -> Setup {
    let settings = GameSettings::default();
    let store = Arc::new(MemoryStore::new());
    common::open_account(&store, 1, &settings, 1_000, 0).await;

    let provider = Arc::new(ScriptedProvider::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let reconciler = Arc::new(PaymentReconciler::new(
        store.clone(),
        provider.clone(),
        notifier.clone(),
        SettingsHandle::new(settings),
    ));

    Setup {
        store,
        provider,
        notifier,
        reconciler,
    }
}

#[tokio::test]
async fn test_paid_invoice_credited_exactly_once() {
    let s = setup().await;

    let invoice = s.reconciler.create_invoice(1, 2_000).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert!(invoice.order_id.starts_with("order_1_"));

    s.provider.set_status(&invoice.id, ProviderStatus::Paid).await;

    let first = s.reconciler.reconcile().await.unwrap();
    assert_eq!(first.credited, 1);
    assert_eq!(s.store.get_balances(1).await.unwrap().real, 2_000);
    assert_eq!(s.store.get_invoice(&invoice.id).await.unwrap().status, InvoiceStatus::Paid);

    let second = s.reconciler.reconcile().await.unwrap();
    assert_eq!(second.checked, 0);
    assert_eq!(second.credited, 0);
    assert_eq!(s.store.get_balances(1).await.unwrap().real, 2_000);
    assert_eq!(s.store.get_invoice(&invoice.id).await.unwrap().status, InvoiceStatus::Paid);

    let deposits: Vec<_> = s
        .store
        .entries(1, 10)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.reason == EntryReason::Deposit)
        .collect();
    assert_eq!(deposits.len(), 1);

    let sent = s.notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Recipient::Account(1));
    assert!(matches!(
        sent[0].1,
        Notice::DepositCredited {
            amount: 2_000,
            real_balance: 2_000,
            ..
        }
    ));
}

#[tokio::test]
async fn test_direct_resettlement_is_guarded() {
    let s = setup().await;
    let invoice = s.reconciler.create_invoice(1, 500).await.unwrap();

    s.store.settle_invoice(&invoice.id).await.unwrap();
    let err = s.store.settle_invoice(&invoice.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvoiceAlreadySettled(_)));
    assert_eq!(s.store.get_balances(1).await.unwrap().real, 500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_sweeps_credit_once() {
    let s = setup().await;
    let invoice = s.reconciler.create_invoice(1, 2_000).await.unwrap();
    s.provider.set_status(&invoice.id, ProviderStatus::Paid).await;

    let a = tokio::spawn({
        let reconciler = s.reconciler.clone();
        async move { reconciler.reconcile().await.unwrap() }
    });
    let b = tokio::spawn({
        let reconciler = s.reconciler.clone();
        async move { reconciler.reconcile().await.unwrap() }
    });
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert_eq!(a.credited + b.credited, 1);
    assert_eq!(s.store.get_balances(1).await.unwrap().real, 2_000);
}

#[tokio::test]
async fn test_pending_and_failed_statuses() {
    let s = setup().await;
    let stays = s.reconciler.create_invoice(1, 1_000).await.unwrap();
    let fails = s.reconciler.create_invoice(1, 1_000).await.unwrap();
    s.provider.set_status(&fails.id, ProviderStatus::Failed).await;

    let report = s.reconciler.reconcile().await.unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.still_pending, 1);
    assert_eq!(report.failed, 1);

    assert_eq!(s.store.get_invoice(&stays.id).await.unwrap().status, InvoiceStatus::Pending);
    assert_eq!(s.store.get_invoice(&fails.id).await.unwrap().status, InvoiceStatus::Failed);
    assert_eq!(s.store.get_balances(1).await.unwrap().real, 0);
}

#[tokio::test]
async fn test_provider_outage_leaves_invoices_pending() {
    let s = setup().await;
    let invoice = s.reconciler.create_invoice(1, 1_000).await.unwrap();
    s.provider.set_status(&invoice.id, ProviderStatus::Paid).await;
    s.provider.set_unavailable(true);

    let report = s.reconciler.reconcile().await.unwrap();
    assert_eq!(report.unavailable, 1);
    assert_eq!(s.store.get_invoice(&invoice.id).await.unwrap().status, InvoiceStatus::Pending);
    assert_eq!(s.store.get_balances(1).await.unwrap().real, 0);

    // Next sweep picks it up
    s.provider.set_unavailable(false);
    let report = s.reconciler.reconcile().await.unwrap();
    assert_eq!(report.credited, 1);
    assert_eq!(s.store.get_balances(1).await.unwrap().real, 1_000);
}

#[tokio::test]
async fn test_create_invoice_preconditions() {
    let s = setup().await;

    let err = s.reconciler.create_invoice(1, 49).await.unwrap_err();
    assert!(matches!(err, PaymentError::BelowMinimum { amount: 49, min: 50 }));

    let err = s.reconciler.create_invoice(77, 1_000).await.unwrap_err();
    assert!(matches!(err, PaymentError::Ledger(LedgerError::AccountNotFound(77))));

    s.provider.set_unavailable(true);
    let err = s.reconciler.create_invoice(1, 1_000).await.unwrap_err();
    assert!(matches!(err, PaymentError::ProviderUnavailable(_)));
    assert!(s.store.pending_invoices().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let s = setup().await;
    let invoice = s.reconciler.create_invoice(1, 1_000).await.unwrap();
    s.provider.set_status(&invoice.id, ProviderStatus::Paid).await;

    let (tx, rx) = tokio::sync::watch::channel(false);
    let task = tokio::spawn(s.reconciler.clone().run(Duration::from_millis(20), rx));

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("reconciler did not stop")
        .unwrap();

    assert_eq!(s.store.get_balances(1).await.unwrap().real, 1_000);
}

async fn spawn_mock(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client_for(base_url: String, timeout: Duration) -> CryptoCloudClient {
    let mut config = CryptoCloudConfig::new("test-key", "shop-1");
    config.base_url = base_url;
    config.timeout = timeout;
    CryptoCloudClient::new(config).unwrap()
}

#[tokio::test]
async fn test_cryptocloud_wire_protocol() {
    async fn create(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Token test-key") {
            return (StatusCode::UNAUTHORIZED, Json(json!({"status": "error"})));
        }
        assert_eq!(body["shop_id"], "shop-1");
        assert_eq!(body["currency"], "USD");
        assert_eq!(body["amount"], 20.0);
        (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "result": {"uuid": "INV-42", "link": "https://pay.test/INV-42"}
            })),
        )
    }

    async fn info(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
        let status = if query.get("uuid").map(String::as_str) == Some("INV-42") {
            "paid"
        } else {
            "created"
        };
        Json(json!({"status": "success", "status_invoice": status}))
    }

    let app = Router::new()
        .route("/v1/invoice/create", post(create))
        .route("/v1/invoice/info", get(info));
    let client = client_for(spawn_mock(app).await, Duration::from_secs(5));

    let created = client.create_invoice(2_000, "order_1_abc").await.unwrap();
    assert_eq!(created.invoice_id, "INV-42");
    assert_eq!(created.pay_url, "https://pay.test/INV-42");

    assert_eq!(client.invoice_status("INV-42").await.unwrap(), ProviderStatus::Paid);
    assert_eq!(client.invoice_status("INV-7").await.unwrap(), ProviderStatus::Pending);
}

#[tokio::test]
async fn test_cryptocloud_timeout_is_unavailable() {
    let app = Router::new().route(
        "/v1/invoice/create",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"status": "success", "result": {"uuid": "late", "link": "late"}}))
        }),
    );
    let client = Arc::new(client_for(spawn_mock(app).await, Duration::from_millis(200)));

    let err = client.create_invoice(1_000, "order_1_x").await.unwrap_err();
    assert!(matches!(err, PaymentError::ProviderUnavailable(_)));

    // Through the reconciler nothing is stored either
    let settings = GameSettings::default();
    let store = Arc::new(MemoryStore::new());
    common::open_account(&store, 1, &settings, 1_000, 0).await;
    let reconciler = PaymentReconciler::new(
        store.clone(),
        client,
        Arc::new(LogNotifier),
        SettingsHandle::new(settings),
    );
    assert!(matches!(
        reconciler.create_invoice(1, 1_000).await,
        Err(PaymentError::ProviderUnavailable(_))
    ));
    assert!(store.pending_invoices().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cryptocloud_error_status_is_unavailable() {
    let app = Router::new().route(
        "/v1/invoice/info",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let client = client_for(spawn_mock(app).await, Duration::from_secs(5));

    let err = client.invoice_status("INV-1").await.unwrap_err();
    assert!(matches!(err, PaymentError::ProviderUnavailable(ref m) if m.contains("500")));
}
