//! Downstream message queues.
//!
//! - Point-to-point: one message goes to one named queue
//! - At-least-once: consumers must tolerate a redelivered dispatch
//! - Body is an opaque JSON string

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis_list;

use std::sync::Arc;

use crate::error::InfraError;

pub use in_memory::{InMemoryQueues, QueuedMessage};
#[cfg(feature = "redis")]
pub use redis_list::RedisQueuePublisher;

pub trait QueuePublisher: Send + Sync {
    fn send(&self, queue: &str, body: &str) -> Result<(), InfraError>;
}

impl<Q> QueuePublisher for Arc<Q>
where
    Q: QueuePublisher + ?Sized,
{
    fn send(&self, queue: &str, body: &str) -> Result<(), InfraError> {
        (**self).send(queue, body)
    }
}
