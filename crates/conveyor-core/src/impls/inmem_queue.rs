//! In-memory message queue.
//!
//! Per source:
//! - `ready`: visible messages in FIFO order,
//! - `scheduled`: delayed messages in a min-heap keyed by visible-at,
//! - `in_flight`: received messages with their lease deadline.
//!
//! Time comes from `tokio::time::Instant`, so tests can pause the clock and
//! `advance` past delays instead of sleeping.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::{Message, MessageId, QueueError, Receipt, Received, Source};
use crate::observability::QueueCounts;
use crate::ports::MessageQueue;

/// Default time a received message stays hidden before redelivery.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Lease deadline used when the visibility timeout does not fit in an `Instant`.
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}

/// Delayed message entry.
///
/// Ordering is reversed so `BinaryHeap` pops the earliest entry first; `seq`
/// keeps send order among entries due at the same instant.
struct ScheduledMessage {
    visible_at: Instant,
    seq: u64,
    message: Message,
}

impl PartialEq for ScheduledMessage {
    fn eq(&self, other: &Self) -> bool {
        self.visible_at == other.visible_at && self.seq == other.seq
    }
}

impl Eq for ScheduledMessage {}

impl PartialOrd for ScheduledMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledMessage {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .visible_at
            .cmp(&self.visible_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct InFlight {
    message: Message,
    lease: String,
    lease_deadline: Instant,
}

#[derive(Default)]
struct SourceQueue {
    ready: VecDeque<Message>,
    scheduled: BinaryHeap<ScheduledMessage>,
    in_flight: HashMap<MessageId, InFlight>,
}

impl SourceQueue {
    /// Move delayed messages whose time has come to the back of `ready`.
    fn promote_scheduled(&mut self, now: Instant) {
        while let Some(entry) = self.scheduled.peek() {
            if entry.visible_at > now {
                break;
            }
            if let Some(entry) = self.scheduled.pop() {
                self.ready.push_back(entry.message);
            }
        }
    }

    /// Return expired leases to `ready` (at-least-once redelivery).
    fn reap_expired(&mut self, now: Instant) {
        let mut expired: Vec<MessageId> = self
            .in_flight
            .iter()
            .filter(|(_, lease)| lease.lease_deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        expired.sort();

        for id in expired {
            if let Some(lease) = self.in_flight.remove(&id) {
                tracing::warn!(
                    message_id = %id,
                    source = %lease.message.source(),
                    "visibility timeout expired, message will be redelivered"
                );
                self.ready.push_back(lease.message);
            }
        }
    }

    fn counts(&self) -> QueueCounts {
        QueueCounts {
            ready: self.ready.len(),
            delayed: self.scheduled.len(),
            in_flight: self.in_flight.len(),
        }
    }
}

struct InMemoryQueueState {
    sources: HashMap<Source, SourceQueue>,
    next_seq: u64,
}

/// Queue that lives inside one process.
///
/// Share it between producers and consumers through an `Arc`. A single lock
/// guards all sources; it is never held across an `.await`.
pub struct InMemoryMessageQueue {
    state: Mutex<InMemoryQueueState>,
    visibility_timeout: Duration,
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::with_visibility_timeout(DEFAULT_VISIBILITY_TIMEOUT)
    }

    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(InMemoryQueueState {
                sources: HashMap::new(),
                next_seq: 0,
            }),
            visibility_timeout,
        }
    }
}

impl Default for InMemoryMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn send(&self, message: Message, delay: Duration) -> Result<(), QueueError> {
        let visible_at = Instant::now()
            .checked_add(delay)
            .ok_or(QueueError::DelayOutOfRange(delay))?;
        let mut state = self.state.lock().await;
        let seq = state.next_seq;
        state.next_seq += 1;

        let queue = state.sources.entry(message.source().clone()).or_default();
        if delay.is_zero() {
            queue.ready.push_back(message);
        } else {
            queue.scheduled.push(ScheduledMessage {
                visible_at,
                seq,
                message,
            });
        }
        Ok(())
    }

    async fn receive(&self, source: &Source) -> Result<Option<Received>, QueueError> {
        let mut state = self.state.lock().await;
        let lease = state.next_seq;
        let Some(queue) = state.sources.get_mut(source) else {
            return Ok(None);
        };

        let now = Instant::now();
        queue.reap_expired(now);
        queue.promote_scheduled(now);

        let Some(message) = queue.ready.pop_front() else {
            return Ok(None);
        };
        let receipt = Receipt::new(message.id(), lease.to_string());
        queue.in_flight.insert(
            message.id(),
            InFlight {
                message: message.clone(),
                lease: receipt.lease().to_string(),
                lease_deadline: now
                    .checked_add(self.visibility_timeout)
                    .unwrap_or_else(far_future),
            },
        );
        state.next_seq += 1;
        Ok(Some(Received { message, receipt }))
    }

    async fn delete(&self, source: &Source, receipt: &Receipt) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let Some(queue) = state.sources.get_mut(source) else {
            return Ok(());
        };
        let current = queue
            .in_flight
            .get(&receipt.message_id())
            .is_some_and(|lease| lease.lease == receipt.lease());
        if current {
            queue.in_flight.remove(&receipt.message_id());
        } else {
            tracing::debug!(
                message_id = %receipt.message_id(),
                source = %source,
                "stale or unknown receipt, nothing deleted"
            );
        }
        Ok(())
    }

    async fn counts(&self, source: &Source) -> Result<QueueCounts, QueueError> {
        let mut state = self.state.lock().await;
        let Some(queue) = state.sources.get_mut(source) else {
            return Ok(QueueCounts::default());
        };
        let now = Instant::now();
        queue.reap_expired(now);
        queue.promote_scheduled(now);
        Ok(queue.counts())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ports::{IdGenerator, SystemClock, UlidGenerator};
    use chrono::Utc;

    fn source(name: &str) -> Source {
        Source::new(name).unwrap()
    }

    fn message(source_name: &str, body: &str) -> Message {
        let id = UlidGenerator::new(SystemClock).generate_message_id();
        Message::new(id, source(source_name), body.as_bytes().to_vec(), Utc::now())
    }

    async fn receive_body(queue: &InMemoryMessageQueue, name: &str) -> Option<String> {
        queue
            .receive(&source(name))
            .await
            .unwrap()
            .map(|r| String::from_utf8(r.message.body().to_vec()).unwrap())
    }

    #[tokio::test]
    async fn undelayed_messages_are_fifo() {
        let queue = InMemoryMessageQueue::new();
        for body in ["a", "b", "c"] {
            queue.send(message("mailers", body), Duration::ZERO).await.unwrap();
        }

        assert_eq!(receive_body(&queue, "mailers").await.as_deref(), Some("a"));
        assert_eq!(receive_body(&queue, "mailers").await.as_deref(), Some("b"));
        assert_eq!(receive_body(&queue, "mailers").await.as_deref(), Some("c"));
        assert_eq!(receive_body(&queue, "mailers").await, None);
    }

    #[tokio::test]
    async fn unknown_source_is_empty() {
        let queue = InMemoryMessageQueue::new();
        assert!(queue.receive(&source("nobody")).await.unwrap().is_none());
        assert!(queue.counts(&source("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sources_are_isolated() {
        let queue = InMemoryMessageQueue::new();
        queue.send(message("mailers", "m"), Duration::ZERO).await.unwrap();
        queue.send(message("billing", "b"), Duration::ZERO).await.unwrap();

        assert_eq!(receive_body(&queue, "billing").await.as_deref(), Some("b"));
        assert_eq!(receive_body(&queue, "billing").await, None);
        assert_eq!(receive_body(&queue, "mailers").await.as_deref(), Some("m"));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_message_is_invisible_until_due() {
        let queue = InMemoryMessageQueue::new();
        queue
            .send(message("mailers", "later"), Duration::from_secs(15))
            .await
            .unwrap();

        assert_eq!(receive_body(&queue, "mailers").await, None);
        assert_eq!(queue.counts(&source("mailers")).await.unwrap().delayed, 1);

        tokio::time::advance(Duration::from_secs(14)).await;
        assert_eq!(receive_body(&queue, "mailers").await, None);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(receive_body(&queue, "mailers").await.as_deref(), Some("later"));
    }

    #[tokio::test(start_paused = true)]
    async fn due_delayed_message_goes_behind_ready_ones() {
        let queue = InMemoryMessageQueue::new();
        queue
            .send(message("mailers", "retry"), Duration::from_secs(1))
            .await
            .unwrap();
        queue.send(message("mailers", "fresh"), Duration::ZERO).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(receive_body(&queue, "mailers").await.as_deref(), Some("fresh"));
        assert_eq!(receive_body(&queue, "mailers").await.as_deref(), Some("retry"));
    }

    #[tokio::test]
    async fn received_message_is_in_flight_until_deleted() {
        let queue = InMemoryMessageQueue::new();
        queue.send(message("mailers", "x"), Duration::ZERO).await.unwrap();

        let received = queue.receive(&source("mailers")).await.unwrap().unwrap();
        assert!(queue.receive(&source("mailers")).await.unwrap().is_none());
        assert_eq!(queue.counts(&source("mailers")).await.unwrap().in_flight, 1);

        queue.delete(&source("mailers"), &received.receipt).await.unwrap();
        assert!(queue.counts(&source("mailers")).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unacked_message_is_redelivered_after_visibility_timeout() {
        let queue = InMemoryMessageQueue::with_visibility_timeout(Duration::from_secs(5));
        queue.send(message("mailers", "x"), Duration::ZERO).await.unwrap();

        let first = queue.receive(&source("mailers")).await.unwrap().unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        let second = queue.receive(&source("mailers")).await.unwrap().unwrap();

        assert_eq!(first.message.id(), second.message.id());
        assert_ne!(first.receipt, second.receipt);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_receipt_does_not_ack_the_redelivery() {
        let queue = InMemoryMessageQueue::with_visibility_timeout(Duration::from_secs(5));
        queue.send(message("mailers", "x"), Duration::ZERO).await.unwrap();

        let first = queue.receive(&source("mailers")).await.unwrap().unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        let second = queue.receive(&source("mailers")).await.unwrap().unwrap();

        // the slow first holder acks late
        queue.delete(&source("mailers"), &first.receipt).await.unwrap();
        assert_eq!(queue.counts(&source("mailers")).await.unwrap().in_flight, 1);

        queue.delete(&source("mailers"), &second.receipt).await.unwrap();
        assert!(queue.counts(&source("mailers")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_unknown_id_is_a_no_op() {
        let queue = InMemoryMessageQueue::new();
        let stray = message("mailers", "x");
        queue
            .delete(&source("mailers"), &Receipt::new(stray.id(), "0"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unschedulable_delay_is_an_error() {
        let queue = InMemoryMessageQueue::new();
        let result = queue
            .send(message("mailers", "x"), Duration::from_secs(u64::MAX))
            .await;

        assert!(matches!(result, Err(QueueError::DelayOutOfRange(_))));
        assert!(queue.counts(&source("mailers")).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_receivers_never_share_a_message() {
        let queue = Arc::new(InMemoryMessageQueue::new());
        for i in 0..100 {
            queue
                .send(message("mailers", &i.to_string()), Duration::ZERO)
                .await
                .unwrap();
        }

        let mut joins = Vec::new();
        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            joins.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                while let Some(m) = queue.receive(&source("mailers")).await.unwrap() {
                    ids.push(m.message.id());
                }
                ids
            }));
        }

        let mut all = Vec::new();
        for join in joins {
            all.extend(join.await.unwrap());
        }
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(total, 100);
        assert_eq!(all.len(), 100);
    }
}
