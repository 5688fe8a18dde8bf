//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Payment storage in PostgreSQL
//! - `storage` - In-memory payment storage
//! - `events` - Redis stream publisher and consumer, in-memory event bus
//! - `xendit` - Invoice provider API and its mock
//! - `user_service` - User lookups
//! - `document` - Invoice documents
//! - `http` - REST endpoints

pub mod document;
pub mod events;
pub mod http;
pub mod postgres;
pub mod storage;
pub mod user_service;
pub mod xendit;

pub use events::{InMemoryEventBus, RedisOrderConsumer, RedisStreamPublisher};
pub use storage::InMemoryPaymentRepository;
