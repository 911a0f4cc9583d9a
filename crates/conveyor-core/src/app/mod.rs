//! App - the worker pipeline built on top of the ports.
//!
//! # Components
//! - **MessageProducer**: publishes tasks onto a source
//! - **MessageConsumer**: pulls one source, drain or daemon mode
//! - **MessageListener / RetryListener**: runs tasks, applies the retry policy
//! - **AppBuilder / App**: wiring and startup validation
//! - **WorkerConfig**: environment-driven settings

pub mod builder;
pub mod config;
pub mod consumer;
pub mod listener;
pub mod producer;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::config::{ConfigError, LogFormat, WorkerConfig};
pub use self::consumer::{DEFAULT_POLL_INTERVAL, MessageConsumer, StopHandle};
pub use self::listener::{Delivery, LoggingListener, MessageListener, RetryListener};
pub use self::producer::MessageProducer;
