//! Demo task types the worker binary understands.

use std::time::Duration;

use async_trait::async_trait;
use conveyor_core::domain::TaskError;
use conveyor_core::typed::{RetryState, Retryable, Runnable};
use serde::{Deserialize, Serialize};

/// Logs a greeting. Never fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetTask {
    pub name: String,
}

#[async_trait]
impl Runnable for GreetTask {
    const TYPE: &'static str = "demo.greet.v1";

    async fn run(&mut self) -> Result<(), TaskError> {
        tracing::info!("Hello, {}!", self.name);
        Ok(())
    }
}

fn default_retry() -> RetryState {
    RetryState::new(3, Duration::from_secs(5))
}

/// Fails its first `fail_times` attempts, then greets.
///
/// Payload example: `{"name":"ada","fail_times":2,"retry":{"max_retries":3,"delay_secs":1}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlakyTask {
    pub name: String,
    #[serde(default)]
    pub fail_times: u32,
    #[serde(default = "default_retry")]
    pub retry: RetryState,
}

#[async_trait]
impl Runnable for FlakyTask {
    const TYPE: &'static str = "demo.flaky.v1";

    async fn run(&mut self) -> Result<(), TaskError> {
        let attempts = self.retry.attempts();
        if attempts < self.fail_times {
            return Err(TaskError::failed(format!(
                "intentional failure (left={})",
                self.fail_times - attempts
            )));
        }
        tracing::info!("Hello, {}! (after {} failures)", self.name, attempts);
        Ok(())
    }

    fn as_retryable_mut(&mut self) -> Option<&mut dyn Retryable> {
        Some(&mut self.retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flaky_task_recovers_after_its_failures() {
        let mut task: FlakyTask =
            serde_json::from_str(r#"{ "name": "ada", "fail_times": 2 }"#).unwrap();
        assert_eq!(task.retry.max_retries(), 3);

        assert!(task.run().await.is_err());
        task.retry.fail();
        assert!(task.run().await.is_err());
        task.retry.fail();
        assert!(task.run().await.is_ok());
    }

    #[tokio::test]
    async fn greet_task_succeeds() {
        let mut task = GreetTask {
            name: "ada".to_string(),
        };
        assert!(task.run().await.is_ok());
    }
}
