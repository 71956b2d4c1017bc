// src/worker.rs
//! Scrape workers: take `pull_jobs` tasks off the queue and run one browser
//! session per task.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::queue::{Delivery, TaskQueue};
use crate::scraping::SessionController;

/// Pause after a queue error before asking again
const RECEIVE_BACKOFF: Duration = Duration::from_secs(5);

/// How a processed task was settled with the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Acked,
    Retried,
}

pub struct WorkerPool {
    queue: Arc<dyn TaskQueue>,
    controller: Arc<SessionController>,
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        controller: Arc<SessionController>,
        concurrency: usize,
    ) -> Self {
        Self {
            queue,
            controller,
            concurrency: concurrency.max(1),
        }
    }

    /// Run `concurrency` independent consumers until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Starting {} scrape worker(s)", self.concurrency);

        let mut workers = JoinSet::new();
        for id in 0..self.concurrency {
            let queue = Arc::clone(&self.queue);
            let controller = Arc::clone(&self.controller);
            let cancel = cancel.clone();
            workers.spawn(async move { consume(id, queue, controller, cancel).await });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Scrape worker panicked: {}", e);
            }
        }
        info!("All scrape workers stopped");
    }
}

async fn consume(
    id: usize,
    queue: Arc<dyn TaskQueue>,
    controller: Arc<SessionController>,
    cancel: CancellationToken,
) {
    debug!("Worker {} waiting for tasks", id);

    loop {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = queue.receive() => received,
        };

        match received {
            Ok(Some(delivery)) => {
                process(&controller, delivery, &cancel).await;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Worker {} failed to receive a task: {:#}", id, e);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(RECEIVE_BACKOFF) => {}
                }
            }
        }
    }

    debug!("Worker {} stopped", id);
}

/// Run one task to completion and settle it: ack on success, retry on failure.
pub async fn process(
    controller: &SessionController,
    delivery: Delivery,
    cancel: &CancellationToken,
) -> Settlement {
    let term = delivery.task.term.clone();
    info!(
        "Processing task {} for term \"{}\" (attempt {})",
        delivery.task.id, term, delivery.attempt
    );

    let task_cancel = cancel.child_token();
    match controller.scrape_term(&term, &task_cancel).await {
        Ok(batch) => {
            debug!(
                "Term \"{}\": {} postings from {} containers, {} skipped",
                term,
                batch.len(),
                batch.containers,
                batch.skipped
            );
            if let Err(e) = delivery.ack().await {
                error!("Failed to ack task for term \"{}\": {:#}", term, e);
            }
            Settlement::Acked
        }
        Err(e) => {
            error!("Task for term \"{}\" failed: {}", term, e);
            if let Err(e) = delivery.retry().await {
                error!("Failed to return task for term \"{}\": {:#}", term, e);
            }
            Settlement::Retried
        }
    }
}
