//! Timeout wrapper for ledger transactions.
//!
//! A timed-out future is dropped, which rolls back any open sqlx transaction,
//! so a timeout never leaves a partial write behind.

use crate::ledger::{LedgerError, LedgerResult};
use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for ledger transactions (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a ledger operation, failing with `LedgerError::Timeout` after `duration`.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> LedgerResult<T>
where
    F: std::future::Future<Output = LedgerResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::Timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let value = with_timeout(Duration::from_secs(1), async { Ok::<_, LedgerError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let err = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, LedgerError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::Timeout(_)));
        assert!(err.to_string().contains("timed out"));
    }
}
