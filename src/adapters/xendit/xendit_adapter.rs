//! Xendit invoice provider adapter.
//!
//! Implements the `InvoiceProvider` trait against the Xendit v2 invoice API.
//!
//! # Security
//!
//! - API key sent as HTTP basic auth username, held in `secrecy::SecretString`
//! - Callback tokens compared in constant time
//!
//! # Configuration
//!
//! ```ignore
//! let config = XenditConfig::new(api_key, callback_token);
//! let adapter = XenditInvoiceAdapter::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::payment::ExternalId;
use crate::ports::{
    CreateInvoiceRequest, Invoice, InvoiceProvider, InvoiceProviderError,
    InvoiceProviderErrorCode, InvoiceStatus, InvoiceWebhook,
};

use super::webhook_types::{verify_invoice_callback, XenditInvoiceSummary};

/// Default Xendit API host.
pub const DEFAULT_BASE_URL: &str = "https://api.xendit.co";

/// Xendit API configuration.
#[derive(Clone)]
pub struct XenditConfig {
    /// Secret API key.
    api_key: SecretString,

    /// Token Xendit sends in `x-callback-token` on every callback.
    callback_token: SecretString,

    /// Base URL for the API (default: https://api.xendit.co).
    api_base_url: String,

    /// Per-request timeout.
    timeout: Duration,
}

impl XenditConfig {
    /// Create a new Xendit configuration.
    pub fn new(api_key: SecretString, callback_token: SecretString) -> Self {
        Self {
            api_key,
            callback_token,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Xendit invoice provider adapter.
pub struct XenditInvoiceAdapter {
    config: XenditConfig,
    http_client: reqwest::Client,
}

impl XenditInvoiceAdapter {
    /// Create a new adapter with the given configuration.
    pub fn new(config: XenditConfig) -> Result<Self, InvoiceProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InvoiceProviderError::network(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn invoices_url(&self) -> String {
        format!("{}/v2/invoices", self.config.api_base_url)
    }
}

fn map_send_error(err: reqwest::Error) -> InvoiceProviderError {
    InvoiceProviderError::network(err.to_string())
}

/// Turn a non-2xx response into an error carrying the body text.
async fn error_from_response(response: reqwest::Response) -> InvoiceProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let code = match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            InvoiceProviderErrorCode::AuthenticationError
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => InvoiceProviderErrorCode::RateLimitExceeded,
        reqwest::StatusCode::NOT_FOUND => InvoiceProviderErrorCode::NotFound,
        _ => InvoiceProviderErrorCode::ProviderError,
    };
    InvoiceProviderError::new(code, body)
}

#[async_trait]
impl InvoiceProvider for XenditInvoiceAdapter {
    async fn create_invoice(
        &self,
        request: CreateInvoiceRequest,
    ) -> Result<Invoice, InvoiceProviderError> {
        let response = self
            .http_client
            .post(self.invoices_url())
            .basic_auth(self.config.api_key.expose_secret(), Some(""))
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            tracing::error!(
                external_id = %request.external_id,
                error = %err,
                "Xendit create_invoice failed"
            );
            return Err(err);
        }

        response.json::<Invoice>().await.map_err(|e| {
            InvoiceProviderError::invalid_response(format!(
                "Failed to parse Xendit invoice response: {}",
                e
            ))
        })
    }

    async fn invoice_status(
        &self,
        external_id: &ExternalId,
    ) -> Result<InvoiceStatus, InvoiceProviderError> {
        let response = self
            .http_client
            .get(self.invoices_url())
            .query(&[("external_id", external_id.to_string())])
            .basic_auth(self.config.api_key.expose_secret(), Some(""))
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            tracing::warn!(external_id = %external_id, error = %err, "Xendit invoice lookup failed");
            return Err(err);
        }

        let invoices: Vec<XenditInvoiceSummary> = response.json().await.map_err(|e| {
            InvoiceProviderError::invalid_response(format!(
                "Failed to parse Xendit invoice list: {}",
                e
            ))
        })?;

        invoices
            .into_iter()
            .next()
            .map(|invoice| invoice.status)
            .ok_or_else(|| {
                InvoiceProviderError::not_found(format!("no invoice for {}", external_id))
            })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        callback_token: &str,
    ) -> Result<InvoiceWebhook, InvoiceProviderError> {
        verify_invoice_callback(&self.config.callback_token, payload, callback_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> XenditInvoiceAdapter {
        let config = XenditConfig::new(
            SecretString::new("xnd_test".to_string()),
            SecretString::new("cb-token".to_string()),
        )
        .with_base_url("http://localhost:9999/");
        XenditInvoiceAdapter::new(config).unwrap()
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        assert_eq!(adapter().invoices_url(), "http://localhost:9999/v2/invoices");
    }

    #[test]
    fn default_base_url_points_at_xendit() {
        let config = XenditConfig::new(
            SecretString::new("k".to_string()),
            SecretString::new("t".to_string()),
        );
        let adapter = XenditInvoiceAdapter::new(config).unwrap();
        assert_eq!(adapter.invoices_url(), "https://api.xendit.co/v2/invoices");
    }

    #[test]
    fn verify_webhook_uses_configured_token() {
        let adapter = adapter();
        let payload = br#"{"external_id":"order-1","status":"PAID","amount":10}"#;

        assert!(adapter.verify_webhook(payload, "cb-token").is_ok());
        assert_eq!(
            adapter.verify_webhook(payload, "nope").unwrap_err().code,
            InvoiceProviderErrorCode::InvalidWebhookToken
        );
    }
}
