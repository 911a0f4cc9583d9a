//! Typed task API.
//!
//! - **Surface (typed)**: `Runnable`, `Retryable`, `RetryState`
//! - **Inside (erased)**: `DynTask`, `TaskDecoder`
//! - **Wire**: `TaskCodec`, `TaskEnvelope`

pub mod codec;
pub mod handler;
pub mod registry;
pub mod task;

pub use self::codec::{TaskCodec, TaskEnvelope};
pub use self::handler::{DynTask, TypedTask};
pub use self::registry::{RegistryError, TaskDecoder, TaskRegistry};
pub use self::task::{RetryState, Retryable, Runnable};
