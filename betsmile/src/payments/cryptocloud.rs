use super::{
    errors::{PaymentError, PaymentResult},
    provider::{CreatedInvoice, PaymentProvider, ProviderStatus},
};
use crate::money::{Cents, cents_to_units};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default CryptoCloud API root
pub const DEFAULT_BASE_URL: &str = "https://api.cryptocloud.plus";

/// CryptoCloud credentials and transport settings
#[derive(Debug, Clone)]
pub struct CryptoCloudConfig {
    pub api_key: String,
    pub shop_id: String,
    pub base_url: String,
    pub currency: String,
    pub timeout: Duration,
}

impl CryptoCloudConfig {
    pub fn new(api_key: impl Into<String>, shop_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            shop_id: shop_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            currency: "USD".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateInvoiceRequest<'a> {
    shop_id: &'a str,
    amount: f64,
    currency: &'a str,
    order_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateInvoiceResponse {
    status: String,
    result: Option<CreatedInvoiceBody>,
}

#[derive(Debug, Deserialize)]
struct CreatedInvoiceBody {
    uuid: String,
    link: String,
}

#[derive(Debug, Deserialize)]
struct InvoiceInfoResponse {
    status: String,
    status_invoice: Option<String>,
}

/// CryptoCloud invoice API client
pub struct CryptoCloudClient {
    config: CryptoCloudConfig,
    client: reqwest::Client,
}

impl CryptoCloudClient {
    /// Create a client with the configured request timeout
    pub fn new(config: CryptoCloudConfig) -> PaymentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.config.api_key)
    }

    async fn read_error(response: reqwest::Response) -> PaymentError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
        PaymentError::ProviderUnavailable(format!("provider returned {status}: {body}"))
    }
}

/// Map a provider status string onto the invoice lifecycle.
fn parse_status(raw: &str) -> ProviderStatus {
    match raw {
        "paid" | "overpaid" => ProviderStatus::Paid,
        "canceled" | "cancelled" | "expired" | "failed" => ProviderStatus::Failed,
        "created" | "pending" | "partial" => ProviderStatus::Pending,
        other => {
            log::warn!("Unknown CryptoCloud invoice status {other:?}, treating as pending");
            ProviderStatus::Pending
        }
    }
}

#[async_trait]
impl PaymentProvider for CryptoCloudClient {
    async fn create_invoice(&self, amount: Cents, order_id: &str) -> PaymentResult<CreatedInvoice> {
        let request = CreateInvoiceRequest {
            shop_id: &self.config.shop_id,
            amount: cents_to_units(amount),
            currency: &self.config.currency,
            order_id,
        };

        let response = self
            .client
            .post(self.url("/v1/invoice/create"))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body: CreateInvoiceResponse = response.json().await?;
        match body.result {
            Some(result) if body.status == "success" => Ok(CreatedInvoice {
                invoice_id: result.uuid,
                pay_url: result.link,
            }),
            _ => Err(PaymentError::ProviderUnavailable(format!(
                "invoice creation answered {}",
                body.status
            ))),
        }
    }

    async fn invoice_status(&self, invoice_id: &str) -> PaymentResult<ProviderStatus> {
        let response = self
            .client
            .get(self.url("/v1/invoice/info"))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .query(&[("uuid", invoice_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body: InvoiceInfoResponse = response.json().await?;
        match body.status_invoice {
            Some(status) if body.status == "success" => Ok(parse_status(&status)),
            _ => Err(PaymentError::ProviderUnavailable(format!(
                "invoice info answered {}",
                body.status
            ))),
        }
    }
}
