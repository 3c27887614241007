//! Deposits: invoice creation and reconciliation against the payment provider.

mod cryptocloud;
mod errors;
mod provider;
mod reconciler;

pub use cryptocloud::{CryptoCloudClient, CryptoCloudConfig, DEFAULT_BASE_URL};
pub use errors::{PaymentError, PaymentResult};
pub use provider::{CreatedInvoice, PaymentProvider, ProviderStatus};
pub use reconciler::{DEFAULT_RECONCILE_INTERVAL, PaymentReconciler, ReconcileReport};
