//! MessageProducer - publishes tasks onto a source.
//!
//! Stateless forwarding: encode, wrap in a `Message`, hand to the queue.
//! Retry orchestration lives in the listener, not here.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Message, MessageId, SendError, Source};
use crate::ports::{Clock, IdGenerator, MessageQueue, SystemClock, UlidGenerator};
use crate::typed::{DynTask, Runnable, TaskCodec};

#[derive(Clone)]
pub struct MessageProducer {
    queue: Arc<dyn MessageQueue>,
    codec: TaskCodec,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl MessageProducer {
    pub fn new(queue: Arc<dyn MessageQueue>, codec: TaskCodec) -> Self {
        Self {
            queue,
            codec,
            ids: Arc::new(UlidGenerator::new(SystemClock)),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publish `task` on `source`, visible after `delay`.
    pub async fn send<T: Runnable>(
        &self,
        source: &Source,
        task: &T,
        delay: Duration,
    ) -> Result<MessageId, SendError> {
        let body = self.codec.encode(task)?;
        self.publish(source, body, delay).await
    }

    /// Publish an already decoded task (used for requeues).
    pub async fn send_dyn(
        &self,
        source: &Source,
        task: &dyn DynTask,
        delay: Duration,
    ) -> Result<MessageId, SendError> {
        let body = self.codec.encode_dyn(task)?;
        self.publish(source, body, delay).await
    }

    /// Publish a raw body. No check that it decodes to a task.
    pub async fn send_raw(
        &self,
        source: &Source,
        body: Vec<u8>,
        delay: Duration,
    ) -> Result<MessageId, SendError> {
        self.publish(source, body, delay).await
    }

    async fn publish(
        &self,
        source: &Source,
        body: Vec<u8>,
        delay: Duration,
    ) -> Result<MessageId, SendError> {
        let id = self.ids.generate_message_id();
        let message = Message::new(id, source.clone(), body, self.clock.now());
        self.queue.send(message, delay).await?;
        tracing::debug!(message_id = %id, source = %source, delay_secs = delay.as_secs(), "message sent");
        Ok(id)
    }
}
