//! TaskCodec - task <-> message body.
//!
//! Wire format (JSON):
//! ```text
//! { "task_type": "acme.mail.welcome.v1", "payload": { ...task fields... } }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::handler::DynTask;
use super::registry::TaskRegistry;
use super::task::Runnable;
use crate::domain::{DecodeError, EncodeError};

/// The body stored in a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub task_type: String,
    pub payload: serde_json::Value,
}

#[derive(Clone)]
pub struct TaskCodec {
    registry: Arc<TaskRegistry>,
}

impl TaskCodec {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn encode<T: Runnable>(&self, task: &T) -> Result<Vec<u8>, EncodeError> {
        let payload = serde_json::to_value(task).map_err(|source| EncodeError {
            task_type: T::TYPE.to_string(),
            source,
        })?;
        Self::encode_envelope(T::TYPE, payload)
    }

    pub fn encode_dyn(&self, task: &dyn DynTask) -> Result<Vec<u8>, EncodeError> {
        let payload = task.to_payload().map_err(|source| EncodeError {
            task_type: task.task_type().to_string(),
            source,
        })?;
        Self::encode_envelope(task.task_type(), payload)
    }

    fn encode_envelope(task_type: &str, payload: serde_json::Value) -> Result<Vec<u8>, EncodeError> {
        let envelope = TaskEnvelope {
            task_type: task_type.to_string(),
            payload,
        };
        serde_json::to_vec(&envelope).map_err(|source| EncodeError {
            task_type: task_type.to_string(),
            source,
        })
    }

    /// Turn a message body back into a runnable task.
    ///
    /// Fails when the body is not an envelope, the type is not registered, or
    /// the payload does not match the registered type.
    pub fn decode(&self, body: &[u8]) -> Result<Box<dyn DynTask>, DecodeError> {
        let envelope: TaskEnvelope = serde_json::from_slice(body).map_err(DecodeError::Envelope)?;
        let decoder = self
            .registry
            .get(&envelope.task_type)
            .ok_or_else(|| DecodeError::UnknownTaskType(envelope.task_type.clone()))?;
        decoder
            .decode(envelope.payload)
            .map_err(|source| DecodeError::Payload {
                task_type: envelope.task_type,
                source,
            })
    }
}
