//! Outcome of handing one delivered task to a listener.

use serde::{Deserialize, Serialize};

/// What happened to a delivered task.
///
/// Every variant except `Requeued` is terminal for this task instance; a
/// requeued task comes back later as a new message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListenerOutcome {
    /// `run()` succeeded.
    Executed,

    /// `run()` failed and the task was published again with its delay.
    Requeued,

    /// `run()` failed and the task has no retry capability.
    Dropped,

    /// `run()` failed and attempts now exceed max retries.
    Abandoned,

    /// `run()` failed and publishing the retry failed too. The task is lost.
    RequeueFailed,

    /// The listener does not execute tasks (default listener).
    Ignored,
}

impl ListenerOutcome {
    /// Did `run()` fail?
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            ListenerOutcome::Requeued
                | ListenerOutcome::Dropped
                | ListenerOutcome::Abandoned
                | ListenerOutcome::RequeueFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn serializes_as_screaming_snake_case() {
        let s = serde_json::to_string(&ListenerOutcome::RequeueFailed).unwrap();
        assert_eq!(s, "\"REQUEUE_FAILED\"");
    }

    #[rstest]
    #[case::executed(ListenerOutcome::Executed, false)]
    #[case::ignored(ListenerOutcome::Ignored, false)]
    #[case::requeued(ListenerOutcome::Requeued, true)]
    #[case::dropped(ListenerOutcome::Dropped, true)]
    #[case::abandoned(ListenerOutcome::Abandoned, true)]
    #[case::requeue_failed(ListenerOutcome::RequeueFailed, true)]
    fn failure_classification(#[case] outcome: ListenerOutcome, #[case] expected: bool) {
        assert_eq!(outcome.is_failure(), expected);
    }
}
