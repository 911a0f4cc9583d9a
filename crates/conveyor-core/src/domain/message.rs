//! Message - the immutable envelope stored by a queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::MessageId;
use super::source::Source;

/// A queued message.
///
/// The body is opaque to the queue. Producers fill it with an encoded task and
/// consumers decode it; the queue only moves bytes around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    source: Source,
    body: Vec<u8>,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(id: MessageId, source: Source, body: Vec<u8>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            source,
            body,
            created_at,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Token for one particular receive of a message.
///
/// Each receive opens a new lease and gets a new receipt. Deleting with the
/// receipt of an expired lease does nothing, so a slow consumer cannot
/// acknowledge a redelivery it does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Receipt {
    message_id: MessageId,
    lease: String,
}

impl Receipt {
    pub fn new(message_id: MessageId, lease: impl Into<String>) -> Self {
        Self {
            message_id,
            lease: lease.into(),
        }
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Backend-specific lease token.
    pub fn lease(&self) -> &str {
        &self.lease
    }
}

/// A message returned by `receive`, with the receipt that acknowledges it.
#[derive(Debug, Clone)]
pub struct Received {
    pub message: Message,
    pub receipt: Receipt,
}
