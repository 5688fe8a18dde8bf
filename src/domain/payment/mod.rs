//! Payment domain: invoices, payment requests and their audit trail.
//!
//! An order-created event becomes a [`PaymentRequest`]; once the invoicing
//! provider issues an invoice the request succeeds and a [`Payment`] is
//! created in PENDING, which later settles as PAID, FAILED or EXPIRED.

mod errors;
mod events;
mod external_id;
mod payment;
mod records;
mod report;
mod status;

pub use errors::PaymentError;
pub use events::{
    OrderCreatedEvent, PaymentStatusUpdate, TOPIC_PAYMENT_FAILED, TOPIC_PAYMENT_SUCCESS,
};
pub use external_id::ExternalId;
pub use payment::{NewPayment, NewPaymentRequest, Payment, PaymentRequest};
pub use records::{
    AnomalyStatus, AnomalyType, AuditActor, AuditEvent, FailedEvent, FailedEventStatus,
    FailedEventType, PaymentAnomaly, PaymentAuditLog,
};
pub use report::FailedPaymentReport;
pub use status::{PaymentRequestStatus, PaymentStatus};
