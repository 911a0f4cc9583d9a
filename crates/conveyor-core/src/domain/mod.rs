//! Domain model (IDs, sources, messages, outcomes, errors).

pub mod errors;
pub mod ids;
pub mod message;
pub mod outcome;
pub mod source;

pub use self::errors::{
    ConsumerError, DecodeError, EncodeError, QueueError, SendError, TaskError,
};
pub use self::ids::{MessageId, ParseIdError};
pub use self::message::{Message, Received, Receipt};
pub use self::outcome::ListenerOutcome;
pub use self::source::Source;
