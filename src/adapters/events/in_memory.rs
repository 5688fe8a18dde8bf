//! In-memory event bus implementation for testing.
//!
//! Captures published status updates for assertions and can be told to
//! fail, so retry and dead-letter paths can be exercised deterministically.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in production.
//! It uses `.expect()` on lock operations which will panic if locks are poisoned.
//! Production code should use the Redis stream publisher.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::payment::PaymentStatusUpdate;
use crate::ports::PaymentEventPublisher;

/// A status update together with the topic it was published on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedStatus {
    pub topic: String,
    pub key: String,
    pub update: PaymentStatusUpdate,
}

/// How the bus responds to publish calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureMode {
    Never,
    /// Fail the next N attempts, then succeed.
    Next(usize),
    Always,
}

/// In-memory event bus for testing.
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned. This is acceptable
/// for test code but this adapter should NOT be used in production.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.fail_next(2);
///
/// service.process_payment_success(order_id).await?;
///
/// assert_eq!(bus.attempt_count(), 3);
/// assert_eq!(bus.event_count(), 1);
/// ```
pub struct InMemoryEventBus {
    published: RwLock<Vec<PublishedStatus>>,
    failure_mode: RwLock<FailureMode>,
    attempts: AtomicUsize,
}

impl InMemoryEventBus {
    /// Creates a new empty event bus.
    pub fn new() -> Self {
        Self {
            published: RwLock::new(Vec::new()),
            failure_mode: RwLock::new(FailureMode::Never),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Creates a bus that rejects every publish.
    pub fn failing() -> Self {
        let bus = Self::new();
        bus.fail_always();
        bus
    }

    // === Failure Injection ===

    /// Fail the next `count` publish attempts.
    pub fn fail_next(&self, count: usize) {
        *self
            .failure_mode
            .write()
            .expect("InMemoryEventBus: failure lock poisoned") = FailureMode::Next(count);
    }

    /// Fail every publish attempt until [`InMemoryEventBus::recover`] is called.
    pub fn fail_always(&self) {
        *self
            .failure_mode
            .write()
            .expect("InMemoryEventBus: failure lock poisoned") = FailureMode::Always;
    }

    /// Stop injecting failures.
    pub fn recover(&self) {
        *self
            .failure_mode
            .write()
            .expect("InMemoryEventBus: failure lock poisoned") = FailureMode::Never;
    }

    // === Test Helpers ===

    /// Returns all successfully published updates.
    pub fn published_events(&self) -> Vec<PublishedStatus> {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .clone()
    }

    /// Returns updates published on a specific topic.
    pub fn events_on_topic(&self, topic: &str) -> Vec<PublishedStatus> {
        self.published_events()
            .into_iter()
            .filter(|e| e.topic == topic)
            .collect()
    }

    /// Returns count of successfully published updates.
    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .len()
    }

    /// Returns how many publish calls were made, failed ones included.
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Clears all published updates and the attempt counter.
    pub fn clear(&self) {
        self.published
            .write()
            .expect("InMemoryEventBus: published write lock poisoned")
            .clear();
        self.attempts.store(0, Ordering::SeqCst);
    }

    fn should_fail(&self) -> bool {
        let mut mode = self
            .failure_mode
            .write()
            .expect("InMemoryEventBus: failure lock poisoned");
        match *mode {
            FailureMode::Never => false,
            FailureMode::Always => true,
            FailureMode::Next(0) => {
                *mode = FailureMode::Never;
                false
            }
            FailureMode::Next(n) => {
                *mode = FailureMode::Next(n - 1);
                true
            }
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentEventPublisher for InMemoryEventBus {
    async fn publish_status(
        &self,
        update: &PaymentStatusUpdate,
        topic: &str,
    ) -> Result<(), DomainError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.should_fail() {
            return Err(DomainError::new(
                ErrorCode::PublishFailed,
                format!("broker unavailable for topic {}", topic),
            ));
        }

        self.published
            .write()
            .expect("InMemoryEventBus: published write lock poisoned")
            .push(PublishedStatus {
                topic: topic.to_string(),
                key: update.key(),
                update: update.clone(),
            });

        Ok(())
    }
}
