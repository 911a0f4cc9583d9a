//! TaskRegistry - maps task type names to decoders.
//!
//! Registration is generic (`register::<T>()`), lookup is by name. Each
//! decoder is a `TypedDecoder<T>` stored behind `Arc<dyn TaskDecoder>`.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use super::handler::{DynTask, TypedTask};
use super::task::Runnable;

/// Object-safe decoder from a JSON payload to an erased task.
pub trait TaskDecoder: Send + Sync {
    fn decode(&self, payload: serde_json::Value) -> Result<Box<dyn DynTask>, serde_json::Error>;
}

struct TypedDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Runnable> TaskDecoder for TypedDecoder<T> {
    fn decode(&self, payload: serde_json::Value) -> Result<Box<dyn DynTask>, serde_json::Error> {
        let task: T = serde_json::from_value(payload)?;
        Ok(TypedTask::boxed(task))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("task type '{0}' is already registered")]
    AlreadyRegistered(String),
}

/// Known task types.
///
/// Built during startup, then shared read-only.
#[derive(Default)]
pub struct TaskRegistry {
    decoders: HashMap<String, Arc<dyn TaskDecoder>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    pub fn register<T: Runnable>(&mut self) -> Result<(), RegistryError> {
        let task_type = T::TYPE.to_string();
        if self.decoders.contains_key(&task_type) {
            return Err(RegistryError::AlreadyRegistered(task_type));
        }
        let decoder = TypedDecoder::<T> {
            _marker: PhantomData,
        };
        self.decoders.insert(task_type, Arc::new(decoder));
        Ok(())
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn TaskDecoder>> {
        self.decoders.get(task_type).cloned()
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.decoders.contains_key(task_type)
    }

    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.decoders.keys().cloned().collect();
        types.sort();
        types
    }
}
