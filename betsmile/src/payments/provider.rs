use super::errors::PaymentResult;
use crate::money::Cents;
use async_trait::async_trait;

/// Invoice as created by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedInvoice {
    pub invoice_id: String,
    pub pay_url: String,
}

/// Invoice status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Pending,
    Paid,
    Failed,
}

/// External payment API.
///
/// Any failure, including a timeout, is `ProviderUnavailable` and says
/// nothing about whether the invoice was paid.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_invoice(&self, amount: Cents, order_id: &str) -> PaymentResult<CreatedInvoice>;

    async fn invoice_status(&self, invoice_id: &str) -> PaymentResult<ProviderStatus>;
}
