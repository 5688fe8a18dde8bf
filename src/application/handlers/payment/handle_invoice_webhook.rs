//! HandleInvoiceWebhookHandler - applies invoice status callbacks from the provider.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::lifecycle::{PaymentLifecycleService, TransitionOutcome};
use crate::domain::foundation::OrderId;
use crate::domain::payment::{ExternalId, PaymentAnomaly, PaymentError};
use crate::ports::{InvoiceProvider, InvoiceProviderErrorCode, InvoiceStatus};

/// Command carrying the raw callback.
#[derive(Debug, Clone)]
pub struct HandleInvoiceWebhookCommand {
    /// Raw request body.
    pub payload: Vec<u8>,
    /// Value of the `x-callback-token` header.
    pub callback_token: String,
}

/// What the webhook caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleInvoiceWebhookResult {
    Paid {
        order_id: OrderId,
        outcome: TransitionOutcome,
    },
    Failed {
        order_id: OrderId,
        outcome: TransitionOutcome,
    },
    /// PENDING or an unknown status; logged only.
    Acknowledged { order_id: OrderId, status: String },
}

pub struct HandleInvoiceWebhookHandler {
    invoice_provider: Arc<dyn InvoiceProvider>,
    lifecycle: Arc<PaymentLifecycleService>,
}

impl HandleInvoiceWebhookHandler {
    pub fn new(
        invoice_provider: Arc<dyn InvoiceProvider>,
        lifecycle: Arc<PaymentLifecycleService>,
    ) -> Self {
        Self {
            invoice_provider,
            lifecycle,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleInvoiceWebhookCommand,
    ) -> Result<HandleInvoiceWebhookResult, PaymentError> {
        // 1. Token first, then payload
        let webhook = self
            .invoice_provider
            .verify_webhook(&cmd.payload, &cmd.callback_token)
            .map_err(|err| match err.code {
                InvoiceProviderErrorCode::InvalidWebhookToken => PaymentError::Unauthorized,
                _ => PaymentError::MalformedPayload(err.message),
            })?;

        // 2. Resolve the order
        let external_id = ExternalId::parse(&webhook.external_id)?;
        let order_id = external_id.order_id();

        tracing::info!(
            order_id = %order_id,
            status = %String::from(webhook.status.clone()),
            amount = %webhook.amount,
            "Invoice webhook received"
        );

        // 3. Apply
        match webhook.status {
            InvoiceStatus::Paid => {
                self.ensure_amount_matches(&external_id, webhook.amount).await?;
                let outcome = self.lifecycle.process_payment_success(order_id).await?;
                Ok(HandleInvoiceWebhookResult::Paid { order_id, outcome })
            }
            InvoiceStatus::Failed => {
                let outcome = self.lifecycle.process_payment_failed(order_id).await?;
                Ok(HandleInvoiceWebhookResult::Failed { order_id, outcome })
            }
            other => {
                let status = String::from(other);
                tracing::info!(order_id = %order_id, status = %status, "Webhook status needs no action");
                Ok(HandleInvoiceWebhookResult::Acknowledged { order_id, status })
            }
        }
    }

    /// A mismatch is recorded as an anomaly and the webhook is rejected.
    async fn ensure_amount_matches(
        &self,
        external_id: &ExternalId,
        actual: Decimal,
    ) -> Result<(), PaymentError> {
        let payment = self.lifecycle.payment_by_order(external_id.order_id()).await?;
        if payment.amount == actual {
            return Ok(());
        }

        tracing::warn!(
            order_id = %payment.order_id,
            expected = %payment.amount,
            actual = %actual,
            "Webhook amount does not match stored payment"
        );
        self.lifecycle
            .save_payment_anomaly(PaymentAnomaly::amount_mismatch(
                external_id.clone(),
                payment.amount,
                actual,
            ))
            .await?;

        Err(PaymentError::AmountMismatch {
            expected: payment.amount,
            actual,
        })
    }
}
