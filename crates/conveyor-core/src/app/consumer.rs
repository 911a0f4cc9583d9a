//! MessageConsumer - pulls messages from one source and dispatches them.
//!
//! Two modes:
//! - **drain** (`receive_no_wait` / `drain`): process until the source is
//!   empty, then return.
//! - **daemon** (`receive`): drain, wait one poll interval, repeat until
//!   stopped.
//!
//! Stopping is cooperative. `StopHandle::stop()` only flips a flag; the loop
//! notices it between messages or while idle, so a running task is always
//! allowed to finish.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use super::listener::{Delivery, LoggingListener, MessageListener};
use crate::domain::{ConsumerError, Message, Received, Source};
use crate::observability::ConsumerStats;
use crate::ports::MessageQueue;
use crate::typed::TaskCodec;

/// Default idle wait between polls in daemon mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Cloneable trigger for a consumer's graceful stop.
///
/// `stop()` never blocks and never fails, so it can be called from a signal
/// handler task.
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

pub struct MessageConsumer {
    queue: Arc<dyn MessageQueue>,
    codec: TaskCodec,
    listener: Arc<dyn MessageListener>,
    source: Option<Source>,
    started: bool,
    poll_interval: Duration,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
    stats: ConsumerStats,
}

impl MessageConsumer {
    pub fn new(queue: Arc<dyn MessageQueue>, codec: TaskCodec) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            queue,
            codec,
            listener: Arc::new(LoggingListener),
            source: None,
            started: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
            stats: ConsumerStats::default(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn MessageListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Bind the consumer to `source` (builder form of `set_source`).
    pub fn receive_from(mut self, source: Source) -> Result<Self, ConsumerError> {
        self.set_source(source)?;
        Ok(self)
    }

    /// Bind the working source.
    ///
    /// A consumer serves exactly one source. Once it has polled, switching to
    /// a different source is refused.
    pub fn set_source(&mut self, source: Source) -> Result<(), ConsumerError> {
        if let Some(bound) = &self.source
            && self.started
            && bound != &source
        {
            return Err(ConsumerError::SourceRebound {
                bound: bound.to_string(),
                requested: source.to_string(),
            });
        }
        self.source = Some(source);
        Ok(())
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Request a graceful stop. Idempotent.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_rx.borrow()
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    /// Process at most one message.
    ///
    /// Returns `Ok(false)` when the source had nothing eligible. Queue errors
    /// are fatal and returned as-is; task failures never are.
    pub async fn receive_no_wait(&mut self) -> Result<bool, ConsumerError> {
        let source = self.source.clone().ok_or(ConsumerError::SourceNotBound)?;
        self.started = true;

        let Some(Received { message, receipt }) = self.queue.receive(&source).await? else {
            return Ok(false);
        };
        self.stats.received += 1;

        self.dispatch(&source, &message).await;

        // a retry, if any, was published as a new message; this one is done
        self.queue.delete(&source, &receipt).await?;
        Ok(true)
    }

    /// Process messages until the source is empty or a stop is requested.
    pub async fn drain(&mut self) -> Result<usize, ConsumerError> {
        let mut processed = 0;
        while !self.is_stopped() && self.receive_no_wait().await? {
            processed += 1;
        }
        Ok(processed)
    }

    /// Daemon mode: drain, idle for one poll interval, repeat until stopped.
    pub async fn receive(&mut self) -> Result<(), ConsumerError> {
        let source = self.source.clone().ok_or(ConsumerError::SourceNotBound)?;
        info!(source = %source, poll_interval_ms = self.poll_interval.as_millis() as u64, "consumer started");

        let poll_interval = self.poll_interval;
        while !self.is_stopped() {
            self.drain().await?;
            if self.is_stopped() {
                break;
            }
            tokio::select! {
                // the sender lives in `self`, so `changed` cannot fail here
                _ = self.stop_rx.changed() => {}
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }

        info!(source = %source, stats = ?self.stats, "consumer stopped");
        Ok(())
    }

    async fn dispatch(&mut self, source: &Source, message: &Message) {
        let task = match self.codec.decode(message.body()) {
            Ok(task) => task,
            Err(err) => {
                warn!(
                    message_id = %message.id(),
                    source = %source,
                    error = %err,
                    "message is not runnable, dropping it"
                );
                self.stats.undecodable += 1;
                return;
            }
        };

        let outcome = self
            .listener
            .handle(Delivery {
                source: source.clone(),
                message_id: message.id(),
                task,
            })
            .await;
        self.stats.record(outcome);
    }
}
