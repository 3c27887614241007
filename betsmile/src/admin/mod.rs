//! Privileged operations.
//!
//! Every [`AdminDesk`] method takes the calling account first and fails with
//! `Unauthorized` before touching anything when it is not a configured admin.

mod desk;
mod errors;

pub use desk::AdminDesk;
pub use errors::{AdminError, AdminResult};

use crate::ledger::AccountId;
use std::collections::HashSet;
use std::sync::Arc;

/// Configured administrator account ids.
#[derive(Debug, Clone, Default)]
pub struct AdminIds(Arc<HashSet<AccountId>>);

impl AdminIds {
    pub fn new(ids: impl IntoIterator<Item = AccountId>) -> Self {
        Self(Arc::new(ids.into_iter().collect()))
    }

    pub fn contains(&self, account_id: AccountId) -> bool {
        self.0.contains(&account_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
