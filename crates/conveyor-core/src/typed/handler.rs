//! DynTask - object-safe view of a `Runnable`.
//!
//! The consumer does not know concrete task types; it gets a
//! `Box<dyn DynTask>` from the codec. `TypedTask<T>` does the type erasure,
//! in the same way a typed handler is erased behind a trait object.

use async_trait::async_trait;

use super::task::{Retryable, Runnable};
use crate::domain::TaskError;

#[async_trait]
pub trait DynTask: Send + Sync {
    fn task_type(&self) -> &'static str;

    async fn run(&mut self) -> Result<(), TaskError>;

    fn as_retryable_mut(&mut self) -> Option<&mut dyn Retryable>;

    /// Current state as JSON (used when the task is published again).
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error>;
}

pub struct TypedTask<T: Runnable> {
    task: T,
}

impl<T: Runnable> TypedTask<T> {
    pub fn new(task: T) -> Self {
        Self { task }
    }

    pub fn boxed(task: T) -> Box<dyn DynTask> {
        Box::new(Self::new(task))
    }
}

#[async_trait]
impl<T: Runnable> DynTask for TypedTask<T> {
    fn task_type(&self) -> &'static str {
        T::TYPE
    }

    async fn run(&mut self) -> Result<(), TaskError> {
        self.task.run().await
    }

    fn as_retryable_mut(&mut self) -> Option<&mut dyn Retryable> {
        self.task.as_retryable_mut()
    }

    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.task)
    }
}
