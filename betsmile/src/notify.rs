//! Outbound notifications to players and admins.
//!
//! Notices are sent after the ledger mutation they describe has committed.
//! Delivery is best effort: failures are logged and never reach the caller.

use crate::ledger::AccountId;
use crate::money::Cents;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Who a notice is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Account(AccountId),
    /// Every configured administrator
    Admins,
}

/// Event worth telling someone about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    DepositCredited {
        invoice_id: String,
        amount: Cents,
        real_balance: Cents,
    },
    WithdrawalRequested {
        withdrawal_id: i64,
        account_id: AccountId,
        amount: Cents,
        wallet: String,
    },
    WithdrawalApproved {
        withdrawal_id: i64,
        amount: Cents,
    },
    WithdrawalRejected {
        withdrawal_id: i64,
        amount: Cents,
        real_balance: Cents,
    },
    BalanceAdjusted {
        demo_delta: Cents,
        real_delta: Cents,
        demo_balance: Cents,
        real_balance: Cents,
    },
    SupportTicketOpened {
        ticket_id: i64,
        account_id: AccountId,
        message: String,
    },
    SupportTicketAnswered {
        ticket_id: i64,
        reply: String,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: Recipient, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: Recipient, notice: Notice) {
        log::info!("Notice for {recipient:?}: {notice:?}");
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    recipient: Recipient,
    notice: &'a Notice,
}

/// POSTs notices as JSON to the chat front end.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            url: url.into(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, recipient: Recipient, notice: Notice) {
        let payload = WebhookPayload {
            recipient,
            notice: &notice,
        };

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                log::warn!(
                    "Notification webhook returned {} for {recipient:?}",
                    response.status()
                );
            }
            Err(e) => log::warn!("Failed to deliver notification to {recipient:?}: {e}"),
        }
    }
}
