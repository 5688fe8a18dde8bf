//! Strongly-typed identifier value objects.
//!
//! Orders and users are owned by upstream services and identified by
//! database-assigned integers, so these wrap `i64` rather than UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! int_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates the identifier from a raw integer.
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw integer.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

int_id!(
    /// Identifier of an order in the order service.
    OrderId
);

int_id!(
    /// Identifier of a user in the user service.
    UserId
);

int_id!(
    /// Identifier of an issued payment row.
    PaymentId
);

int_id!(
    /// Identifier of a payment request row.
    PaymentRequestId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_displays_raw_value() {
        assert_eq!(OrderId::new(100).to_string(), "100");
    }

    #[test]
    fn order_id_parses_from_string() {
        let id: OrderId = "42".parse().unwrap();
        assert_eq!(id.as_i64(), 42);
    }

    #[test]
    fn order_id_rejects_non_numeric() {
        assert!("abc".parse::<OrderId>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&UserId::new(7)).unwrap();
        assert_eq!(json, "7");

        let id: PaymentId = serde_json::from_str("9").unwrap();
        assert_eq!(id, PaymentId::new(9));
    }
}
