//! Xendit-specific wire types.
//!
//! Invoice API responses and the invoice callback payload, plus the
//! callback token check shared by the real adapter and the mock.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::ports::{InvoiceProviderError, InvoiceStatus, InvoiceWebhook};

/// Header carrying the callback verification token.
pub const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";

/// One element of the `GET /v2/invoices?external_id=` response array.
///
/// Only the status is needed; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct XenditInvoiceSummary {
    pub status: InvoiceStatus,
}

/// Compare the provided callback token to the configured one in constant time.
pub fn callback_token_matches(expected: &SecretString, provided: &str) -> bool {
    let expected_bytes = expected.expose_secret().as_bytes();
    !provided.is_empty() && expected_bytes.ct_eq(provided.as_bytes()).unwrap_u8() == 1
}

/// Verify the callback token, then decode the payload.
pub fn verify_invoice_callback(
    expected: &SecretString,
    payload: &[u8],
    callback_token: &str,
) -> Result<InvoiceWebhook, InvoiceProviderError> {
    if !callback_token_matches(expected, callback_token) {
        tracing::warn!("Invoice webhook rejected: callback token mismatch");
        return Err(InvoiceProviderError::invalid_webhook_token());
    }

    serde_json::from_slice(payload).map_err(|e| {
        tracing::warn!(error = %e, "Invoice webhook payload could not be decoded");
        InvoiceProviderError::invalid_payload(format!("Invalid webhook payload: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::InvoiceProviderErrorCode;
    use rust_decimal_macros::dec;

    fn secret() -> SecretString {
        SecretString::new("cb-token".to_string())
    }

    #[test]
    fn token_comparison() {
        assert!(callback_token_matches(&secret(), "cb-token"));
        assert!(!callback_token_matches(&secret(), "cb-tokem"));
        assert!(!callback_token_matches(&secret(), "cb"));
        assert!(!callback_token_matches(&secret(), ""));
    }

    #[test]
    fn bad_token_is_rejected_before_parsing() {
        let err = verify_invoice_callback(&secret(), b"not json", "wrong").unwrap_err();
        assert_eq!(err.code, InvoiceProviderErrorCode::InvalidWebhookToken);
    }

    #[test]
    fn malformed_payload_with_valid_token() {
        let err = verify_invoice_callback(&secret(), b"{", "cb-token").unwrap_err();
        assert_eq!(err.code, InvoiceProviderErrorCode::InvalidPayload);
    }

    #[test]
    fn valid_callback_is_decoded() {
        let webhook = verify_invoice_callback(
            &secret(),
            br#"{"external_id":"order-100","status":"PAID","amount":500}"#,
            "cb-token",
        )
        .unwrap();

        assert_eq!(webhook.external_id, "order-100");
        assert_eq!(webhook.amount, dec!(500));
    }

    #[test]
    fn status_lookup_element_ignores_extra_fields() {
        let list: Vec<XenditInvoiceSummary> =
            serde_json::from_str(r#"[{"id":"inv_1","status":"SETTLED","amount":10}]"#).unwrap();
        assert_eq!(list[0].status, InvoiceStatus::Settled);
    }
}
