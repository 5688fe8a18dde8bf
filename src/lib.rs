//! Payment Reconciler - keeps order payments in step with an external
//! invoicing provider.
//!
//! Order-created events become payment requests, requests become invoices,
//! and invoice outcomes (webhooks, polling, expiry) become terminal payment
//! states that are announced downstream on Redis streams.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
