//! Xendit invoice provider adapters.
//!
//! - `XenditInvoiceAdapter` - Production adapter for the Xendit v2 invoice API
//! - `MockInvoiceProvider` - Configurable fake for tests

mod mock_invoice_provider;
mod webhook_types;
mod xendit_adapter;

pub use mock_invoice_provider::{MethodCall, MockInvoiceProvider, MOCK_CALLBACK_TOKEN};
pub use webhook_types::{callback_token_matches, CALLBACK_TOKEN_HEADER};
pub use xendit_adapter::{XenditConfig, XenditInvoiceAdapter, DEFAULT_BASE_URL};
