//! External ID correlating an order with the provider's invoice.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrderId, ValidationError};

const PREFIX: &str = "order-";

/// Invoice key of the form `order-<order_id>`.
///
/// Also used as the message key for status events so that every event of
/// one order lands on the same partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalId {
    order_id: OrderId,
}

impl ExternalId {
    /// Builds the external id for an order.
    pub fn for_order(order_id: OrderId) -> Self {
        Self { order_id }
    }

    /// Parses `order-<id>`; the id must be a positive integer in canonical
    /// form, so the parsed value always renders back to `raw`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let digits = raw.strip_prefix(PREFIX).ok_or_else(|| {
            ValidationError::invalid_format("external_id", format!("missing '{}' prefix", PREFIX))
        })?;

        if digits.is_empty() {
            return Err(ValidationError::empty_field("external_id"));
        }

        if !digits.bytes().all(|b| b.is_ascii_digit()) || digits.starts_with('0') {
            return Err(ValidationError::invalid_format(
                "external_id",
                format!("'{}' is not an order id", digits),
            ));
        }

        let id: i64 = digits.parse().map_err(|_| {
            ValidationError::invalid_format("external_id", format!("'{}' is not an order id", digits))
        })?;

        Ok(Self {
            order_id: OrderId::new(id),
        })
    }

    /// Order this id refers to.
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PREFIX, self.order_id)
    }
}

impl FromStr for ExternalId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ExternalId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ExternalId> for String {
    fn from(id: ExternalId) -> Self {
        id.to_string()
    }
}
