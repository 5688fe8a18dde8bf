//! Invoice provider port for the external invoicing API.
//!
//! # Design
//!
//! - **Provider agnostic**: any hosted-invoice gateway can implement it
//! - **Keyed by external id**: invoices are created and looked up with
//!   `order-<id>`, so retries never need provider-side ids

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::payment::ExternalId;

/// Port for the invoicing provider.
#[async_trait]
pub trait InvoiceProvider: Send + Sync {
    /// Create a hosted invoice.
    async fn create_invoice(&self, request: CreateInvoiceRequest)
        -> Result<Invoice, InvoiceProviderError>;

    /// Current status of the invoice with the given external id.
    async fn invoice_status(&self, external_id: &ExternalId)
        -> Result<InvoiceStatus, InvoiceProviderError>;

    /// Check the callback token of an invoice webhook and parse its payload.
    ///
    /// The token is checked before the payload is looked at.
    fn verify_webhook(
        &self,
        payload: &[u8],
        callback_token: &str,
    ) -> Result<InvoiceWebhook, InvoiceProviderError>;
}

/// Request to create an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateInvoiceRequest {
    pub external_id: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    pub description: String,

    pub payer_email: String,
}

/// Invoice issued by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub expiry_date: DateTime<Utc>,
    pub invoice_url: String,
    pub status: InvoiceStatus,
}

/// Invoice status callback sent by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceWebhook {
    pub external_id: String,

    pub status: InvoiceStatus,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// Invoice status as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Settled,
    Expired,
    Failed,
    Other(String),
}

impl InvoiceStatus {
    /// Returns true if the provider considers the invoice paid.
    pub fn is_paid(&self) -> bool {
        matches!(self, InvoiceStatus::Paid)
    }
}

impl From<String> for InvoiceStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => InvoiceStatus::Pending,
            "PAID" => InvoiceStatus::Paid,
            "SETTLED" => InvoiceStatus::Settled,
            "EXPIRED" => InvoiceStatus::Expired,
            "FAILED" => InvoiceStatus::Failed,
            _ => InvoiceStatus::Other(value),
        }
    }
}

impl From<InvoiceStatus> for String {
    fn from(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Pending => "PENDING".to_string(),
            InvoiceStatus::Paid => "PAID".to_string(),
            InvoiceStatus::Settled => "SETTLED".to_string(),
            InvoiceStatus::Expired => "EXPIRED".to_string(),
            InvoiceStatus::Failed => "FAILED".to_string(),
            InvoiceStatus::Other(s) => s,
        }
    }
}

/// Errors from invoice provider operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceProviderError {
    /// Error code for categorization.
    pub code: InvoiceProviderErrorCode,

    /// Human-readable message, usually the provider's response body.
    pub message: String,
}

impl InvoiceProviderError {
    pub fn new(code: InvoiceProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(InvoiceProviderErrorCode::NetworkError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(InvoiceProviderErrorCode::NotFound, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(InvoiceProviderErrorCode::ProviderError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(InvoiceProviderErrorCode::InvalidResponse, message)
    }

    pub fn invalid_webhook_token() -> Self {
        Self::new(
            InvoiceProviderErrorCode::InvalidWebhookToken,
            "Invalid callback token",
        )
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(InvoiceProviderErrorCode::InvalidPayload, message)
    }
}

impl std::fmt::Display for InvoiceProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for InvoiceProviderError {}

impl From<InvoiceProviderError> for DomainError {
    fn from(err: InvoiceProviderError) -> Self {
        let code = match err.code {
            InvoiceProviderErrorCode::NotFound => ErrorCode::InvoiceNotFound,
            InvoiceProviderErrorCode::InvalidPayload => ErrorCode::InvalidFormat,
            _ => ErrorCode::ExternalServiceError,
        };
        DomainError::new(code, err.message)
    }
}

/// Invoice provider error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceProviderErrorCode {
    /// Network connectivity issue or timeout.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// No invoice for the external id.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider rejected the request.
    ProviderError,

    /// Response body could not be decoded.
    InvalidResponse,

    /// Webhook callback token did not match.
    InvalidWebhookToken,

    /// Webhook body could not be decoded.
    InvalidPayload,
}

impl InvoiceProviderErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InvoiceProviderErrorCode::NetworkError | InvoiceProviderErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for InvoiceProviderErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InvoiceProviderErrorCode::NetworkError => "network_error",
            InvoiceProviderErrorCode::AuthenticationError => "authentication_error",
            InvoiceProviderErrorCode::NotFound => "not_found",
            InvoiceProviderErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            InvoiceProviderErrorCode::ProviderError => "provider_error",
            InvoiceProviderErrorCode::InvalidResponse => "invalid_response",
            InvoiceProviderErrorCode::InvalidWebhookToken => "invalid_webhook_token",
            InvoiceProviderErrorCode::InvalidPayload => "invalid_payload",
        };
        write!(f, "{}", s)
    }
}
