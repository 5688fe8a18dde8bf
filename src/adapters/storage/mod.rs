//! Storage Adapters
//!
//! In-memory implementation of the PaymentRepository port, used by tests
//! and local runs without a database. The PostgreSQL adapter lives in
//! `adapters::postgres`.
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::InMemoryPaymentRepository;
//!
//! let repo = Arc::new(InMemoryPaymentRepository::new());
//! repo.fail_on("find_pending_requests").await;
//! ```

mod in_memory_payment_repository;

pub use in_memory_payment_repository::InMemoryPaymentRepository;
