//! Runnable / Retryable - the task contract.
//!
//! A task is plain data (serde) plus a `run()` entry point. Retry support is
//! a capability: a task opts in by returning `Some` from `as_retryable_mut`,
//! and the listener checks for it once per failure.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::TaskError;

/// A unit of work that can travel through a queue.
///
/// # Example
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct SendWelcomeMail {
///     to: String,
/// }
///
/// #[async_trait]
/// impl Runnable for SendWelcomeMail {
///     const TYPE: &'static str = "acme.mail.welcome.v1";
///
///     async fn run(&mut self) -> Result<(), TaskError> {
///         mailer::send(&self.to).await.map_err(|e| TaskError::failed(e.to_string()))
///     }
/// }
/// ```
///
/// `TYPE` follows `{namespace}.{domain}.{action}.v{major}` and is what the
/// message body records, so renaming it orphans queued messages.
#[async_trait]
pub trait Runnable: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: &'static str;

    async fn run(&mut self) -> Result<(), TaskError>;

    /// Retry capability. Plain tasks keep the default.
    fn as_retryable_mut(&mut self) -> Option<&mut dyn Retryable> {
        None
    }
}

/// Bounded-retry capability.
///
/// `attempts()` never decreases and only grows through `fail()`.
pub trait Retryable: Send {
    fn attempts(&self) -> u32;

    fn max_retries(&self) -> u32;

    /// Delay before the task is delivered again after a failure.
    fn delay(&self) -> Duration;

    /// Record one failed attempt.
    fn fail(&mut self);

    /// Is another delivery allowed after the failures recorded so far?
    fn can_retry(&self) -> bool {
        self.attempts() <= self.max_retries()
    }
}

/// Serializable retry bookkeeping that tasks can embed.
///
/// The attempt counter is part of the payload, so a requeued task arrives
/// with the count of its previous failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    #[serde(default)]
    attempts: u32,
    max_retries: u32,
    delay_secs: u64,
}

impl RetryState {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            attempts: 0,
            max_retries,
            delay_secs: delay.as_secs(),
        }
    }
}

impl Retryable for RetryState {
    fn attempts(&self) -> u32 {
        self.attempts
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    fn fail(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }
}
