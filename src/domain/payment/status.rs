//! Payment and payment-request status state machines.
//!
//! ```text
//! Payment:         PENDING ──► PAID | FAILED | EXPIRED   (all terminal)
//! PaymentRequest:  PENDING ──► SUCCESS | FAILED
//!                  FAILED  ──► PENDING                   (bounded by retry_count)
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle status of an issued invoice payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Invoice issued, awaiting payment.
    Pending,

    /// Provider confirmed payment.
    Paid,

    /// Provider reported failure.
    Failed,

    /// Invoice expiry passed without payment.
    Expired,
}

impl PaymentStatus {
    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Expired => "EXPIRED",
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Paid) | (Pending, Failed) | (Pending, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Paid, Failed, Expired],
            Paid | Failed | Expired => vec![],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Legacy rows were written in lower case.
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            "EXPIRED" => Ok(PaymentStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// Lifecycle status of a request to obtain an invoice for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentRequestStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentRequestStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentRequestStatus::Pending => "PENDING",
            PaymentRequestStatus::Success => "SUCCESS",
            PaymentRequestStatus::Failed => "FAILED",
        }
    }
}

impl StateMachine for PaymentRequestStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentRequestStatus::*;
        matches!(
            (self, target),
            (Pending, Success) | (Pending, Failed) | (Failed, Pending) | (Failed, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentRequestStatus::*;
        match self {
            Pending => vec![Success, Failed],
            Failed => vec![Pending, Failed],
            Success => vec![],
        }
    }
}

impl fmt::Display for PaymentRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentRequestStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentRequestStatus::Pending),
            "SUCCESS" => Ok(PaymentRequestStatus::Success),
            "FAILED" => Ok(PaymentRequestStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "payment_request_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}
