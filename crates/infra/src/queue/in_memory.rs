//! In-memory queues for tests/dev.

use std::sync::Mutex;

use super::QueuePublisher;
use crate::error::InfraError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub queue: String,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct InMemoryQueues {
    sent: Mutex<Vec<QueuedMessage>>,
    unavailable: Mutex<bool>,
}

impl InMemoryQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message sent so far, in send order.
    pub fn sent(&self) -> Vec<QueuedMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn messages(&self, queue: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.queue == queue)
            .map(|m| m.body)
            .collect()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut flag) = self.unavailable.lock() {
            *flag = unavailable;
        }
    }
}

impl QueuePublisher for InMemoryQueues {
    fn send(&self, queue: &str, body: &str) -> Result<(), InfraError> {
        if *self
            .unavailable
            .lock()
            .map_err(InfraError::poisoned("queues"))?
        {
            return Err(InfraError::Queue(format!("queue {queue} unavailable")));
        }

        self.sent
            .lock()
            .map_err(InfraError::poisoned("queues"))?
            .push(QueuedMessage {
                queue: queue.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}
