//! MessageListener - what the consumer calls for each decoded task.
//!
//! `RetryListener` is the worker's listener: it runs the task and applies the
//! retry policy. `LoggingListener` is the consumer default and only logs.
//!
//! Per task instance:
//! ```text
//! Pending -> Running -> Succeeded
//!                    -> Failed -> (attempts <= max) Requeued -> Pending (new message)
//!                              -> (attempts >  max) Abandoned
//!                              -> (not retryable)   Dropped
//! ```
//!
//! A failed requeue send is logged and the task is lost. There is no retry of
//! the retry.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::producer::MessageProducer;
use crate::domain::{ListenerOutcome, MessageId, Source};
use crate::typed::DynTask;

/// One decoded message handed to a listener.
pub struct Delivery {
    pub source: Source,
    pub message_id: MessageId,
    pub task: Box<dyn DynTask>,
}

#[async_trait]
pub trait MessageListener: Send + Sync {
    async fn handle(&self, delivery: Delivery) -> ListenerOutcome;
}

/// Default listener: warns and does not run the task.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

#[async_trait]
impl MessageListener for LoggingListener {
    async fn handle(&self, delivery: Delivery) -> ListenerOutcome {
        warn!(
            task_type = delivery.task.task_type(),
            message_id = %delivery.message_id,
            source = %delivery.source,
            "no message listener configured, task ignored"
        );
        ListenerOutcome::Ignored
    }
}

/// Runs tasks and requeues retryable failures onto the source they came from.
pub struct RetryListener {
    producer: MessageProducer,
}

impl RetryListener {
    pub fn new(producer: MessageProducer) -> Self {
        Self { producer }
    }

    /// Apply the retry policy to a task whose `run()` failed.
    pub async fn on_error(
        &self,
        source: &Source,
        message_id: MessageId,
        mut task: Box<dyn DynTask>,
    ) -> ListenerOutcome {
        let task_type = task.task_type();
        let Some(retryable) = task.as_retryable_mut() else {
            debug!(task_type, message_id = %message_id, "task is not retryable, dropping it");
            return ListenerOutcome::Dropped;
        };

        retryable.fail();
        let attempts = retryable.attempts();
        let max_retries = retryable.max_retries();
        let delay = retryable.delay();

        if !retryable.can_retry() {
            warn!(
                task_type,
                message_id = %message_id,
                attempts,
                max_retries,
                "task exhausted its retries, abandoning it"
            );
            return ListenerOutcome::Abandoned;
        }

        match self.producer.send_dyn(source, task.as_ref(), delay).await {
            Ok(retry_id) => {
                info!(
                    task_type,
                    message_id = %message_id,
                    retry_message_id = %retry_id,
                    attempts,
                    max_retries,
                    delay_secs = delay.as_secs(),
                    "task requeued for retry"
                );
                ListenerOutcome::Requeued
            }
            Err(err) => {
                error!(
                    task_type,
                    message_id = %message_id,
                    attempts,
                    error = %err,
                    "task could not be sent to retry"
                );
                ListenerOutcome::RequeueFailed
            }
        }
    }
}

#[async_trait]
impl MessageListener for RetryListener {
    async fn handle(&self, delivery: Delivery) -> ListenerOutcome {
        let Delivery {
            source,
            message_id,
            mut task,
        } = delivery;
        let task_type = task.task_type();
        debug!(task_type, message_id = %message_id, source = %source, "task received");

        match task.run().await {
            Ok(()) => {
                info!(task_type, message_id = %message_id, "task executed");
                ListenerOutcome::Executed
            }
            Err(err) => {
                error!(task_type, message_id = %message_id, error = %err, "task failed");
                self.on_error(&source, message_id, task).await
            }
        }
    }
}
