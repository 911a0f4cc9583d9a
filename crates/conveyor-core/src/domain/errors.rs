//! Error types, one enum per concern.
//!
//! - `QueueError`: storage/transport failures. Fatal to a consumer loop.
//! - `DecodeError`: a message body that is not a runnable task. Recovered.
//! - `TaskError`: a task's `run()` failed. Recovered through the retry policy.
//! - `ConsumerError`: what stops a consumer loop.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("invalid source name `{0}`")]
    InvalidSource(String),

    #[error("queue storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("queue record could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("delay of {0:?} is out of range")]
    DelayOutOfRange(std::time::Duration),

    #[error("queue operation failed: {0}")]
    OperationFailed(String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("body is not a task envelope: {0}")]
    Envelope(serde_json::Error),

    #[error("unknown task type `{0}`")]
    UnknownTaskType(String),

    #[error("payload for `{task_type}` is invalid: {source}")]
    Payload {
        task_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Encoding a task into a message body failed.
#[derive(Debug, Error)]
#[error("task `{task_type}` could not be encoded: {source}")]
pub struct EncodeError {
    pub task_type: String,
    #[source]
    pub source: serde_json::Error,
}

/// Failure reported by a task's `run()`.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Publishing a task failed.
#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("consumer is not bound to a source")]
    SourceNotBound,

    #[error("consumer is already bound to `{bound}`, refusing to switch to `{requested}`")]
    SourceRebound { bound: String, requested: String },

    #[error(transparent)]
    Queue(#[from] QueueError),
}
