//! Mock invoice provider for testing.
//!
//! Provides a configurable implementation of `InvoiceProvider` for unit
//! and integration tests. Supports:
//! - Per-invoice status configuration
//! - Error injection (one-shot or per method)
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::SecretString;

use crate::domain::payment::ExternalId;
use crate::ports::{
    CreateInvoiceRequest, Invoice, InvoiceProvider, InvoiceProviderError, InvoiceStatus,
    InvoiceWebhook,
};

use super::webhook_types::verify_invoice_callback;

/// Callback token accepted by a mock that was not given one explicitly.
pub const MOCK_CALLBACK_TOKEN: &str = "mock-callback-token";

/// Mock invoice provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockInvoiceProvider::new();
///
/// // Report an invoice as paid
/// mock.set_status("order-100", InvoiceStatus::Paid);
///
/// // Inject errors
/// mock.set_method_error("create_invoice", InvoiceProviderError::network("timeout"));
/// ```
#[derive(Default)]
pub struct MockInvoiceProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Invoices created so far, by external id.
    invoices: HashMap<String, Invoice>,

    /// Status overrides by external id.
    statuses: HashMap<String, InvoiceStatus>,

    /// Error to return on the next call.
    next_error: Option<InvoiceProviderError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, InvoiceProviderError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,

    /// Accepted webhook callback token, `MOCK_CALLBACK_TOKEN` if unset.
    callback_token: Option<String>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockInvoiceProvider {
    /// Create a new mock provider with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner
            .lock()
            .expect("MockInvoiceProvider: state lock poisoned")
    }

    /// Create a mock that accepts webhooks carrying `token`.
    pub fn with_callback_token(token: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.state().callback_token = Some(token.into());
        mock
    }

    // === Configuration ===

    /// Set the status reported for `external_id`.
    pub fn set_status(&self, external_id: &str, status: InvoiceStatus) {
        self.state()
            .statuses
            .insert(external_id.to_string(), status);
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: InvoiceProviderError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: InvoiceProviderError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // === Call Tracking ===

    /// Invoices created so far.
    pub fn created_invoices(&self) -> Vec<Invoice> {
        self.state().invoices.values().cloned().collect()
    }

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    // === Internal Helpers ===

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), InvoiceProviderError> {
        let mut state = self.state();

        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

impl Clone for MockInvoiceProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl InvoiceProvider for MockInvoiceProvider {
    async fn create_invoice(
        &self,
        request: CreateInvoiceRequest,
    ) -> Result<Invoice, InvoiceProviderError> {
        self.record_call(
            "create_invoice",
            vec![
                request.external_id.clone(),
                request.amount.to_string(),
                request.description.clone(),
                request.payer_email.clone(),
            ],
        );
        self.check_error("create_invoice")?;

        let mut state = self.state();
        let id = format!("inv_mock_{}", state.invoices.len() + 1);
        let invoice = Invoice {
            invoice_url: format!("https://checkout.mock/{}", id),
            id,
            expiry_date: Utc::now() + Duration::hours(24),
            status: InvoiceStatus::Pending,
        };
        state
            .invoices
            .insert(request.external_id, invoice.clone());

        Ok(invoice)
    }

    async fn invoice_status(
        &self,
        external_id: &ExternalId,
    ) -> Result<InvoiceStatus, InvoiceProviderError> {
        let key = external_id.to_string();
        self.record_call("invoice_status", vec![key.clone()]);
        self.check_error("invoice_status")?;

        let state = self.state();
        if let Some(status) = state.statuses.get(&key) {
            return Ok(status.clone());
        }
        state
            .invoices
            .get(&key)
            .map(|invoice| invoice.status.clone())
            .ok_or_else(|| InvoiceProviderError::not_found(format!("no invoice for {}", key)))
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        callback_token: &str,
    ) -> Result<InvoiceWebhook, InvoiceProviderError> {
        self.record_call("verify_webhook", vec![callback_token.to_string()]);
        self.check_error("verify_webhook")?;

        let expected = self
            .state()
            .callback_token
            .clone()
            .unwrap_or_else(|| MOCK_CALLBACK_TOKEN.to_string());
        verify_invoice_callback(&SecretString::new(expected), payload, callback_token)
    }
}
