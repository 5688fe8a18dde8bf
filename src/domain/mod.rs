//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `payment` - Payment and payment-request lifecycle, audit and anomaly records

pub mod foundation;
pub mod payment;
