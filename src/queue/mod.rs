// src/queue/mod.rs
//! Task queue between the term producer and the scrape workers.
//!
//! Delivery is at-least-once: a task stays pending until its `Delivery` is
//! acked, and a retried (or never acked) task is handed out again.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::ScrapeTask;

pub mod memory;
pub mod nats;

pub use memory::InMemoryTaskQueue;
pub use nats::NatsTaskQueue;

#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Submit one task
    async fn submit(&self, task: &ScrapeTask) -> Result<()>;

    /// Wait for the next task. `None` means the wait window elapsed with
    /// nothing to do; callers simply ask again.
    async fn receive(&self) -> Result<Option<Delivery>>;
}

/// Settles one received message with the broker
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> Result<()>;
    async fn retry(&self) -> Result<()>;
}

/// A received task plus the handle used to settle it
pub struct Delivery {
    pub task: ScrapeTask,
    /// Times the broker has handed this message out, starting at 1
    pub attempt: u64,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(task: ScrapeTask, attempt: u64, acker: Box<dyn Acknowledger>) -> Self {
        Self {
            task,
            attempt,
            acker,
        }
    }

    /// Task finished; remove it from the queue
    pub async fn ack(self) -> Result<()> {
        self.acker.ack().await
    }

    /// Task failed; make it available for redelivery
    pub async fn retry(self) -> Result<()> {
        self.acker.retry().await
    }
}

/// Decode a queued payload, rejecting anything that is not a `pull_jobs` task
pub fn decode_task(payload: &[u8]) -> Result<ScrapeTask> {
    let task: ScrapeTask = serde_json::from_slice(payload)
        .map_err(|e| anyhow::anyhow!("Failed to decode task payload: {}", e))?;
    if !task.is_pull_jobs() {
        anyhow::bail!("Unsupported task type: {}", task.name);
    }
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_task() {
        let payload = serde_json::to_vec(&ScrapeTask::pull_jobs("golang")).unwrap();
        let task = decode_task(&payload).unwrap();
        assert_eq!(task.term, "golang");
    }

    #[test]
    fn test_decode_task_rejects_other_types() {
        let mut task = ScrapeTask::pull_jobs("golang");
        task.name = "push_jobs".to_string();
        let payload = serde_json::to_vec(&task).unwrap();
        assert!(decode_task(&payload).is_err());
    }

    #[test]
    fn test_decode_task_rejects_garbage() {
        assert!(decode_task(b"golang").is_err());
    }
}
