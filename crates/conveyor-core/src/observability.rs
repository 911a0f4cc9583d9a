//! Counters exposed for observability and tests.

use serde::{Deserialize, Serialize};

use crate::domain::ListenerOutcome;

/// Per-source message counts as seen by a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Visible now.
    pub ready: usize,
    /// Waiting for their delay to elapse.
    pub delayed: usize,
    /// Received but not yet deleted.
    pub in_flight: usize,
}

impl QueueCounts {
    pub fn total(&self) -> usize {
        self.ready + self.delayed + self.in_flight
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// What a consumer has done since it started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerStats {
    pub received: u64,
    pub undecodable: u64,
    pub executed: u64,
    pub failed: u64,
    pub requeued: u64,
    pub dropped: u64,
    pub abandoned: u64,
    pub requeue_failed: u64,
    pub ignored: u64,
}

impl ConsumerStats {
    pub(crate) fn record(&mut self, outcome: ListenerOutcome) {
        if outcome.is_failure() {
            self.failed += 1;
        }
        match outcome {
            ListenerOutcome::Executed => self.executed += 1,
            ListenerOutcome::Requeued => self.requeued += 1,
            ListenerOutcome::Dropped => self.dropped += 1,
            ListenerOutcome::Abandoned => self.abandoned += 1,
            ListenerOutcome::RequeueFailed => self.requeue_failed += 1,
            ListenerOutcome::Ignored => self.ignored += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_failures_once() {
        let mut stats = ConsumerStats::default();
        stats.record(ListenerOutcome::Requeued);
        stats.record(ListenerOutcome::Abandoned);
        stats.record(ListenerOutcome::Executed);

        assert_eq!(stats.failed, 2);
        assert_eq!(stats.requeued, 1);
        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.executed, 1);
    }

    #[test]
    fn counts_total() {
        let counts = QueueCounts {
            ready: 1,
            delayed: 2,
            in_flight: 3,
        };
        assert_eq!(counts.total(), 6);
        assert!(!counts.is_empty());
        assert!(QueueCounts::default().is_empty());
    }
}
