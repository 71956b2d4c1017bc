// src/queue/memory.rs
//! In-process queue with the same at-least-once contract as the broker.
//! Used by tests and by single-process runs.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use super::{Acknowledger, Delivery, TaskQueue};
use crate::types::ScrapeTask;

#[derive(Default)]
struct Inner {
    pending: Mutex<VecDeque<(ScrapeTask, u64)>>,
    submitted: Mutex<Vec<ScrapeTask>>,
    acked: Mutex<Vec<ScrapeTask>>,
    notify: Notify,
}

#[derive(Clone)]
pub struct InMemoryTaskQueue {
    inner: Arc<Inner>,
    wait: Duration,
}

impl Default for InMemoryTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::with_wait(Duration::from_millis(200))
    }

    /// `wait` bounds how long `receive` blocks on an empty queue
    pub fn with_wait(wait: Duration) -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            wait,
        }
    }

    /// Every task ever submitted, in submission order
    pub fn submitted(&self) -> Vec<ScrapeTask> {
        self.inner
            .submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn acked(&self) -> Vec<ScrapeTask> {
        self.inner
            .acked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn pending_len(&self) -> usize {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn push(&self, task: ScrapeTask, attempt: u64) {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back((task, attempt));
        self.inner.notify.notify_one();
    }

    fn pop(&self) -> Option<(ScrapeTask, u64)> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn submit(&self, task: &ScrapeTask) -> Result<()> {
        self.inner
            .submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(task.clone());
        self.push(task.clone(), 0);
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>> {
        if let Some((task, attempt)) = self.pop() {
            return Ok(Some(self.delivery(task, attempt)));
        }

        let _ = tokio::time::timeout(self.wait, self.inner.notify.notified()).await;
        Ok(self.pop().map(|(task, attempt)| self.delivery(task, attempt)))
    }
}

impl InMemoryTaskQueue {
    fn delivery(&self, task: ScrapeTask, attempt: u64) -> Delivery {
        let acker = MemoryAck {
            queue: self.clone(),
            task: task.clone(),
            attempt: attempt + 1,
        };
        Delivery::new(task, attempt + 1, Box::new(acker))
    }
}

struct MemoryAck {
    queue: InMemoryTaskQueue,
    task: ScrapeTask,
    attempt: u64,
}

#[async_trait]
impl Acknowledger for MemoryAck {
    async fn ack(&self) -> Result<()> {
        self.queue
            .inner
            .acked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(self.task.clone());
        Ok(())
    }

    async fn retry(&self) -> Result<()> {
        self.queue.push(self.task.clone(), self.attempt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_delivery_and_ack() {
        let queue = InMemoryTaskQueue::new();
        queue.submit(&ScrapeTask::pull_jobs("a")).await.unwrap();
        queue.submit(&ScrapeTask::pull_jobs("b")).await.unwrap();

        let first = queue.receive().await.unwrap().unwrap();
        assert_eq!(first.task.term, "a");
        assert_eq!(first.attempt, 1);
        first.ack().await.unwrap();

        assert_eq!(queue.acked().len(), 1);
        assert_eq!(queue.pending_len(), 1);
    }

    #[tokio::test]
    async fn test_retry_redelivers() {
        let queue = InMemoryTaskQueue::new();
        queue.submit(&ScrapeTask::pull_jobs("a")).await.unwrap();

        let delivery = queue.receive().await.unwrap().unwrap();
        delivery.retry().await.unwrap();

        let again = queue.receive().await.unwrap().unwrap();
        assert_eq!(again.task.term, "a");
        assert_eq!(again.attempt, 2);
    }

    #[tokio::test]
    async fn test_receive_times_out_when_empty() {
        let queue = InMemoryTaskQueue::with_wait(Duration::from_millis(10));
        assert!(queue.receive().await.unwrap().is_none());
    }
}
