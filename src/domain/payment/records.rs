//! Append-only records: audit log, anomalies, dead-lettered events.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrderId, PaymentId, Timestamp, UserId, ValidationError};

use super::ExternalId;

/// Lifecycle events recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditEvent {
    SavePaymentRequest,
    CreateInvoice,
    PublishPaymentStatus,
    PublishPaymentStatusFailed,
    MarkPaid,
    MarkFailed,
    MarkExpired,
    SavePaymentAnomaly,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::SavePaymentRequest => "SavePaymentRequest",
            AuditEvent::CreateInvoice => "CreateInvoice",
            AuditEvent::PublishPaymentStatus => "PublishEventPaymentStatus",
            AuditEvent::PublishPaymentStatusFailed => "PublishEventPaymentStatus-Failed",
            AuditEvent::MarkPaid => "MarkPaid",
            AuditEvent::MarkFailed => "MarkFailed",
            AuditEvent::MarkExpired => "MarkExpired",
            AuditEvent::SavePaymentAnomaly => "SavePaymentAnomaly",
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditEvent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use AuditEvent::*;
        [
            SavePaymentRequest,
            CreateInvoice,
            PublishPaymentStatus,
            PublishPaymentStatusFailed,
            MarkPaid,
            MarkFailed,
            MarkExpired,
            SavePaymentAnomaly,
        ]
        .into_iter()
        .find(|event| event.as_str() == s)
        .ok_or_else(|| ValidationError::invalid_format("audit_event", format!("unknown event '{}'", s)))
    }
}

/// Who caused an audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditActor {
    Order,
    InvoiceProvider,
    Payment,
    Scheduler,
    Webhook,
}

impl AuditActor {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditActor::Order => "order",
            AuditActor::InvoiceProvider => "xendit",
            AuditActor::Payment => "payment",
            AuditActor::Scheduler => "scheduler",
            AuditActor::Webhook => "webhook",
        }
    }
}

impl fmt::Display for AuditActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditActor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" => Ok(AuditActor::Order),
            "xendit" => Ok(AuditActor::InvoiceProvider),
            "payment" => Ok(AuditActor::Payment),
            "scheduler" => Ok(AuditActor::Scheduler),
            "webhook" => Ok(AuditActor::Webhook),
            other => Err(ValidationError::invalid_format(
                "audit_actor",
                format!("unknown actor '{}'", other),
            )),
        }
    }
}

/// Immutable audit trail entry keyed by order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAuditLog {
    pub order_id: OrderId,
    pub user_id: Option<UserId>,
    pub payment_id: Option<PaymentId>,
    pub external_id: Option<ExternalId>,
    pub event: AuditEvent,
    pub actor: AuditActor,
    pub create_time: Timestamp,
}

impl PaymentAuditLog {
    /// Creates an entry stamped with the current time.
    pub fn new(order_id: OrderId, event: AuditEvent, actor: AuditActor) -> Self {
        Self {
            order_id,
            user_id: None,
            payment_id: None,
            external_id: None,
            event,
            actor,
            create_time: Timestamp::now(),
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_payment(mut self, payment_id: PaymentId) -> Self {
        self.payment_id = Some(payment_id);
        self
    }

    pub fn with_external_id(mut self, external_id: ExternalId) -> Self {
        self.external_id = Some(external_id);
        self
    }
}

/// Kind of inconsistency detected between webhook and stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyType {
    InvalidAmount = 1,
}

/// Review state of an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyStatus {
    Resolved = 1,
    NeedToCheck = 99,
}

/// Recorded amount mismatch between a webhook and the stored payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAnomaly {
    pub order_id: OrderId,
    pub external_id: ExternalId,
    pub anomaly_type: AnomalyType,
    pub notes: String,
    pub status: AnomalyStatus,
    pub create_time: Timestamp,
}

impl PaymentAnomaly {
    /// Anomaly for a webhook whose amount differs from the stored one.
    pub fn amount_mismatch(external_id: ExternalId, expected: Decimal, actual: Decimal) -> Self {
        Self {
            order_id: external_id.order_id(),
            notes: format!(
                "Webhook amount mismatch: expected {:.2}, got {:.2}",
                expected, actual
            ),
            external_id,
            anomaly_type: AnomalyType::InvalidAmount,
            status: AnomalyStatus::NeedToCheck,
            create_time: Timestamp::now(),
        }
    }
}

/// Reason an event was dead-lettered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailedEventType {
    PublishPaymentSuccess = 1,
}

/// Replay state of a dead-lettered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailedEventStatus {
    Replayed = 1,
    NeedToCheck = 99,
}

/// Dead-letter record of a status event that exhausted its publish retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedEvent {
    pub order_id: OrderId,
    pub external_id: ExternalId,
    pub failed_type: FailedEventType,
    pub status: FailedEventStatus,
    pub notes: String,
    pub create_time: Timestamp,
}

impl FailedEvent {
    /// Dead-letter for an undeliverable PAID event.
    pub fn payment_success(order_id: OrderId, error: impl Into<String>) -> Self {
        Self {
            order_id,
            external_id: ExternalId::for_order(order_id),
            failed_type: FailedEventType::PublishPaymentSuccess,
            status: FailedEventStatus::NeedToCheck,
            notes: error.into(),
            create_time: Timestamp::now(),
        }
    }
}
