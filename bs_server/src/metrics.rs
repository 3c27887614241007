//! Prometheus metrics for the bot front.
//!
//! Recording goes through the `metrics` facade and is a no-op until
//! [`init_metrics`] installs the exporter.
//!
//! ```rust,no_run
//! use bs_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//! metrics::http_requests_total("POST", "/api/v1/events", 200);
//! ```

use async_trait::async_trait;
use betsmile::bot::Reply;
use betsmile::notify::{Notice, Notifier, Recipient};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;

/// Install the Prometheus exporter, serving `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Ledger Metrics
// ============================================================================

/// Count a dispatched intent by the reply it produced.
pub fn record_reply(reply: &Reply) {
    match reply {
        Reply::WagerSettled { record, .. } => {
            metrics::counter!("wagers_total",
                "variant" => record.variant.to_string(),
                "mode" => record.mode.to_string(),
                "outcome" => record.outcome.to_string()
            )
            .increment(1);
            metrics::histogram!("wager_stake_cents", "mode" => record.mode.to_string())
                .record(record.stake as f64);
        }
        Reply::InvoiceCreated { .. } => metrics::counter!("invoices_created_total").increment(1),
        Reply::WithdrawalRequested { .. } => {
            metrics::counter!("withdrawals_requested_total").increment(1)
        }
        Reply::Error { kind, .. } => {
            let kind = serde_json::to_value(kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "unknown".to_string());
            metrics::counter!("intent_errors_total", "kind" => kind).increment(1);
        }
        _ => {}
    }
}

fn record_notice(notice: &Notice) {
    match notice {
        Notice::DepositCredited { amount, .. } => {
            metrics::counter!("deposits_credited_total").increment(1);
            metrics::counter!("deposits_credited_cents").increment(u64::try_from(*amount).unwrap_or(0));
        }
        Notice::WithdrawalApproved { .. } => {
            metrics::counter!("withdrawals_resolved_total", "status" => "approved").increment(1)
        }
        Notice::WithdrawalRejected { .. } => {
            metrics::counter!("withdrawals_resolved_total", "status" => "rejected").increment(1)
        }
        _ => {}
    }
}

/// Counts ledger events as their notices go out, then forwards them.
pub struct MeteredNotifier {
    inner: Arc<dyn Notifier>,
}

impl MeteredNotifier {
    pub fn new(inner: Arc<dyn Notifier>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Notifier for MeteredNotifier {
    async fn notify(&self, recipient: Recipient, notice: Notice) {
        record_notice(&notice);
        self.inner.notify(recipient, notice).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<Notice>>);

    #[async_trait]
    impl Notifier for Collect {
        async fn notify(&self, _recipient: Recipient, notice: Notice) {
            self.0.lock().await.push(notice);
        }
    }

    #[tokio::test]
    async fn test_metered_notifier_forwards() {
        let inner = Arc::new(Collect::default());
        let notifier = MeteredNotifier::new(inner.clone());

        let notice = Notice::DepositCredited {
            invoice_id: "INV-1".to_string(),
            amount: 2_000,
            real_balance: 2_000,
        };
        notifier.notify(Recipient::Account(1), notice.clone()).await;

        assert_eq!(inner.0.lock().await.as_slice(), &[notice]);
    }
}
