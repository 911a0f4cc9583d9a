//! Task fixtures and log capture shared by unit tests.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::domain::TaskError;
use crate::typed::{RetryState, Retryable, Runnable, TaskCodec, TaskRegistry};

/// Task without retry support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlainTask {
    pub succeed: bool,
}

impl PlainTask {
    pub fn succeeding() -> Self {
        Self { succeed: true }
    }

    pub fn failing() -> Self {
        Self { succeed: false }
    }
}

#[async_trait]
impl Runnable for PlainTask {
    const TYPE: &'static str = "test.plain.run.v1";

    async fn run(&mut self) -> Result<(), TaskError> {
        if self.succeed {
            Ok(())
        } else {
            Err(TaskError::failed("plain task failed"))
        }
    }
}

/// Task with embedded retry state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryTask {
    pub succeed: bool,
    pub retry: RetryState,
}

impl RetryTask {
    pub fn new(succeed: bool, max_retries: u32, delay_secs: u64) -> Self {
        Self {
            succeed,
            retry: RetryState::new(max_retries, Duration::from_secs(delay_secs)),
        }
    }

    pub fn failing(max_retries: u32, delay_secs: u64) -> Self {
        Self::new(false, max_retries, delay_secs)
    }
}

#[async_trait]
impl Runnable for RetryTask {
    const TYPE: &'static str = "test.retry.run.v1";

    async fn run(&mut self) -> Result<(), TaskError> {
        if self.succeed {
            Ok(())
        } else {
            Err(TaskError::failed(format!(
                "retry task failed (attempts={})",
                self.retry.attempts()
            )))
        }
    }

    fn as_retryable_mut(&mut self) -> Option<&mut dyn Retryable> {
        Some(&mut self.retry)
    }
}

pub fn test_registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry.register::<PlainTask>().unwrap();
    registry.register::<RetryTask>().unwrap();
    registry
}

pub fn test_codec() -> TaskCodec {
    TaskCodec::new(Arc::new(test_registry()))
}

/// Log events recorded on the current thread while the guard is alive.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<(Level, String)>>>);

impl CapturedLogs {
    pub fn count(&self, level: Level, message: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, m)| *l == level && m == message)
            .count()
    }
}

struct CaptureLayer(CapturedLogs);

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0
            .0
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.0));
    }
}

/// Record log events for the rest of the test (single-threaded runtimes only).
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(logs.clone()));
    (logs, tracing::subscriber::set_default(subscriber))
}
