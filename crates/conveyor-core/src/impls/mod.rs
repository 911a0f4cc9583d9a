//! Port implementations.
//!
//! - **InMemoryMessageQueue**: single-process queue (tests, embedded use)
//! - **FileMessageQueue**: directory-backed queue shared by worker processes

pub mod file_queue;
pub mod inmem_queue;

pub use self::file_queue::FileMessageQueue;
pub use self::inmem_queue::{DEFAULT_VISIBILITY_TIMEOUT, InMemoryMessageQueue};
