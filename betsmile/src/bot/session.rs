use crate::ledger::AccountId;
use crate::money::Cents;
use crate::wager::GameVariant;
use crate::Mode;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-progress selections of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayContext {
    pub account_id: AccountId,
    pub mode: Option<Mode>,
    pub variant: Option<GameVariant>,
    pub stake: Option<Cents>,
}

impl PlayContext {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            mode: None,
            variant: None,
            stake: None,
        }
    }
}

/// Play contexts keyed by account.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<AccountId, PlayContext>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for `account_id`, fresh if none is stored
    pub async fn get(&self, account_id: AccountId) -> PlayContext {
        self.sessions
            .read()
            .await
            .get(&account_id)
            .copied()
            .unwrap_or_else(|| PlayContext::new(account_id))
    }

    pub async fn put(&self, context: PlayContext) {
        self.sessions
            .write()
            .await
            .insert(context.account_id, context);
    }

    pub async fn clear(&self, account_id: AccountId) {
        self.sessions.write().await.remove(&account_id);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
