//! Support tickets opened by players.

use crate::ledger::{AccountId, LedgerError, SupportStore, SupportTicket};
use crate::notify::{Notice, Notifier, Recipient};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupportError {
    #[error("Support message must not be empty")]
    EmptyMessage,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Stores player messages and alerts the admins.
pub struct SupportDesk {
    store: Arc<dyn SupportStore>,
    notifier: Arc<dyn Notifier>,
}

impl SupportDesk {
    pub fn new<S: SupportStore + 'static>(store: Arc<S>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn open_ticket(
        &self,
        account_id: AccountId,
        message: &str,
    ) -> Result<SupportTicket, SupportError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SupportError::EmptyMessage);
        }

        let ticket = self.store.open_ticket(account_id, message).await?;
        log::info!("Support ticket {} opened by account {account_id}", ticket.id);

        self.notifier
            .notify(
                Recipient::Admins,
                Notice::SupportTicketOpened {
                    ticket_id: ticket.id,
                    account_id,
                    message: ticket.message.clone(),
                },
            )
            .await;

        Ok(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountDefaults, AccountStore, MemoryStore, TicketStatus};
    use crate::notify::LogNotifier;

    #[tokio::test]
    async fn test_open_ticket() {
        let store = Arc::new(MemoryStore::new());
        store.open_account(3, None, &AccountDefaults::default()).await.unwrap();
        let desk = SupportDesk::new(store.clone(), Arc::new(LogNotifier));

        let ticket = desk.open_ticket(3, " help ").await.unwrap();
        assert_eq!(ticket.message, "help");
        assert_eq!(ticket.status, TicketStatus::Pending);

        assert!(matches!(desk.open_ticket(3, "   ").await, Err(SupportError::EmptyMessage)));
        assert!(matches!(
            desk.open_ticket(99, "hello").await,
            Err(SupportError::Ledger(LedgerError::AccountNotFound(99)))
        ));
    }
}
