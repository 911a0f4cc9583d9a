//! AppBuilder - wires registry, codec, queue, producer and consumers.
//!
//! Startup is fail-fast: `expect_tasks()` declares the task types this
//! deployment must understand and `build()` refuses to start when any of them
//! is missing from the registry.

use std::sync::Arc;

use super::config::WorkerConfig;
use super::consumer::MessageConsumer;
use super::listener::RetryListener;
use super::producer::MessageProducer;
use crate::domain::{ConsumerError, Source};
use crate::ports::MessageQueue;
use crate::typed::{RegistryError, Runnable, TaskCodec, TaskRegistry};

/// # Example
/// ```ignore
/// let app = AppBuilder::new(queue)
///     .register::<SendWelcomeMail>()?
///     .expect_tasks(&["acme.mail.welcome.v1"])
///     .build()?;
/// let mut consumer = app.consumer(Source::new("mailers")?)?;
/// consumer.drain().await?;
/// ```
pub struct AppBuilder {
    queue: Arc<dyn MessageQueue>,
    registry: TaskRegistry,
    expected_tasks: Option<Vec<String>>,
    config: WorkerConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task types: {0:?}. These tasks were expected but not registered.")]
    MissingTaskTypes(Vec<String>),
}

impl AppBuilder {
    pub fn new(queue: Arc<dyn MessageQueue>) -> Self {
        Self {
            queue,
            registry: TaskRegistry::new(),
            expected_tasks: None,
            config: WorkerConfig::default(),
        }
    }

    pub fn register<T: Runnable>(mut self) -> Result<Self, RegistryError> {
        self.registry.register::<T>()?;
        Ok(self)
    }

    pub fn expect_tasks(mut self, task_types: &[&str]) -> Self {
        self.expected_tasks = Some(task_types.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        if let Some(expected_tasks) = &self.expected_tasks {
            let missing_tasks: Vec<String> = expected_tasks
                .iter()
                .filter(|t| !self.registry.contains(t))
                .cloned()
                .collect();
            if !missing_tasks.is_empty() {
                return Err(BuildError::MissingTaskTypes(missing_tasks));
            }
        }

        let codec = TaskCodec::new(Arc::new(self.registry));
        let producer = MessageProducer::new(Arc::clone(&self.queue), codec.clone());
        Ok(App {
            queue: self.queue,
            codec,
            producer,
            config: self.config,
        })
    }
}

/// A wired application.
pub struct App {
    queue: Arc<dyn MessageQueue>,
    codec: TaskCodec,
    producer: MessageProducer,
    config: WorkerConfig,
}

impl App {
    pub fn producer(&self) -> MessageProducer {
        self.producer.clone()
    }

    pub fn queue(&self) -> Arc<dyn MessageQueue> {
        Arc::clone(&self.queue)
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.codec.registry().registered_types()
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// A consumer bound to `source` whose failures are retried on `source`.
    pub fn consumer(&self, source: Source) -> Result<MessageConsumer, ConsumerError> {
        MessageConsumer::new(Arc::clone(&self.queue), self.codec.clone())
            .with_listener(Arc::new(RetryListener::new(self.producer())))
            .with_poll_interval(self.config.poll_interval)
            .receive_from(source)
    }
}
