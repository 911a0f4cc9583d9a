//! Ports - the seams between the worker pipeline and the outside world.
//!
//! Each trait hides an external concern (storage, time, ID generation) so the
//! app layer can be wired with production or test implementations.

pub mod clock;
pub mod id_generator;
pub mod message_queue;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::message_queue::MessageQueue;
