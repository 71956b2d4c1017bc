// src/producer.rs
//! Periodic term producer: matching criteria in, one `pull_jobs` task per term out.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::CriteriaSource;
use crate::queue::TaskQueue;
use crate::types::ScrapeTask;
use crate::utils::normalize_terms;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Unique search terms, sorted
    pub terms: Vec<String>,
    pub submitted: usize,
    pub elapsed: Duration,
}

pub struct TermProducer {
    source: Arc<dyn CriteriaSource>,
    queue: Arc<dyn TaskQueue>,
}

impl TermProducer {
    pub fn new(source: Arc<dyn CriteriaSource>, queue: Arc<dyn TaskQueue>) -> Self {
        Self { source, queue }
    }

    /// One cycle. A failed fetch submits nothing.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = Instant::now();

        let criteria = self
            .source
            .fetch_criteria()
            .await
            .context("Failed to retrieve matching criteria")?;

        let blank = criteria
            .iter()
            .filter(|c| c.position.trim().is_empty())
            .count();
        if blank > 0 {
            warn!("Dropping {} criteria with an empty position", blank);
        }

        let terms: Vec<String> = normalize_terms(criteria.iter().map(|c| c.position.as_str()))
            .into_iter()
            .collect();
        info!("Terms to process: {}", terms.len());

        let mut submitted = 0;
        for term in &terms {
            let task = ScrapeTask::pull_jobs(term);
            self.queue
                .submit(&task)
                .await
                .with_context(|| format!("Failed to submit task for term \"{}\"", term))?;
            submitted += 1;
            info!("Submitted task for term \"{}\" ({})", term, task.id);
        }

        Ok(CycleReport {
            terms,
            submitted,
            elapsed: started.elapsed(),
        })
    }

    /// Run cycles until `cancel` fires. Cycle starts are spaced by `interval`;
    /// a failed cycle is logged and the loop carries on.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        info!("Term producer started, interval {}s", interval.as_secs());

        loop {
            let started = Instant::now();

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.run_cycle() => match outcome {
                    Ok(report) => info!(
                        "Cycle submitted {} tasks in {:.1}s",
                        report.submitted,
                        report.elapsed.as_secs_f64()
                    ),
                    Err(e) => error!("Producer cycle failed: {:#}", e),
                },
            }

            let pause = interval.saturating_sub(started.elapsed());
            debug!("Next cycle in {}s", pause.as_secs());

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!("Term producer stopped");
    }
}
