//! Redis-list-backed queues.
//!
//! Each queue is a Redis list at `docflow:queue:<name>`. Producers `RPUSH`;
//! consumers `BLPOP`/`LMOVE` on their side.

use std::sync::Arc;

use tracing::{instrument, warn};

use super::QueuePublisher;
use crate::error::InfraError;

const DEFAULT_KEY_PREFIX: &str = "docflow:queue";

#[derive(Debug, Clone)]
pub struct RedisQueuePublisher {
    client: Arc<redis::Client>,
    key_prefix: String,
}

impl RedisQueuePublisher {
    pub fn new(redis_url: impl AsRef<str>, key_prefix: Option<String>) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| InfraError::Queue(format!("redis connection: {e}")))?;

        Ok(Self {
            client: Arc::new(client),
            key_prefix: key_prefix.unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
        })
    }

    pub fn key_for(&self, queue: &str) -> String {
        format!("{}:{}", self.key_prefix, queue)
    }
}

impl QueuePublisher for RedisQueuePublisher {
    #[instrument(skip(self, body), fields(queue = %queue, body_len = body.len()))]
    fn send(&self, queue: &str, body: &str) -> Result<(), InfraError> {
        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| InfraError::Queue(format!("redis connection: {e}")))?;

        let _: i64 = redis::cmd("RPUSH")
            .arg(self.key_for(queue))
            .arg(body)
            .query(&mut conn)
            .map_err(|e| {
                warn!(error = %e, "RPUSH failed");
                InfraError::Queue(format!("RPUSH {queue}: {e}"))
            })?;

        Ok(())
    }
}
