//! MessageQueue port - named-source storage for messages.
//!
//! Implementations decide where messages live (memory, files, a broker).
//! Whatever the backend, they must provide:
//! - FIFO delivery per source for undelayed messages,
//! - at-least-once delivery (a received message that is never deleted comes
//!   back after the visibility timeout),
//! - at most one in-flight holder per message, even across processes.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Message, QueueError, Receipt, Received, Source};
use crate::observability::QueueCounts;

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueue `message` on `message.source()`.
    ///
    /// With a non-zero `delay` the message is not visible to `receive` until
    /// the delay has elapsed. Only storage failures and delays too large to
    /// schedule (`QueueError::DelayOutOfRange`) are errors.
    async fn send(&self, message: Message, delay: Duration) -> Result<(), QueueError>;

    /// Take the next eligible message from `source` without waiting.
    ///
    /// The message becomes in-flight: hidden from other callers until it is
    /// deleted or its visibility timeout expires. There is no lease
    /// extension: a task that outlives the timeout may run a second time on
    /// another consumer.
    async fn receive(&self, source: &Source) -> Result<Option<Received>, QueueError>;

    /// Acknowledge a received message.
    ///
    /// Only the receipt of the current lease deletes the message. Receipts of
    /// expired leases and unknown messages are ignored.
    async fn delete(&self, source: &Source, receipt: &Receipt) -> Result<(), QueueError>;

    /// Ready / delayed / in-flight counts for `source`.
    async fn counts(&self, source: &Source) -> Result<QueueCounts, QueueError>;
}
