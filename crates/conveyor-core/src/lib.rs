//! conveyor-core
//!
//! Message queue worker with a bounded-retry pipeline.
//!
//! # Modules
//! - **domain**: messages, IDs, sources, outcomes, errors
//! - **ports**: `MessageQueue`, `Clock`, `IdGenerator`
//! - **typed**: `Runnable` / `Retryable` task contract, registry, codec
//! - **impls**: in-memory and file-backed queues
//! - **app**: producer, consumer, listeners, builder, config
//! - **observability**: queue and consumer counters
//!
//! # Flow
//! ```text
//! MessageProducer::send -> MessageQueue -> MessageConsumer::receive_no_wait
//!   -> TaskCodec::decode -> MessageListener::handle -> task.run()
//!   -> on failure: RetryListener::on_error -> requeue with delay | drop
//! ```

pub mod app;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod typed;

#[cfg(test)]
pub(crate) mod testing;
