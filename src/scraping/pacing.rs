// src/scraping/pacing.rs
//! Waits that make a session look like a person browsing

use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::ScrapeError;
use crate::browser::BrowserSession;
use crate::core::config_manager::ChallengeWaitConfig;

/// Random pause between opening a posting and reading it, in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    min_secs: u64,
    max_secs: u64,
}

impl Pacing {
    /// Bounds are inclusive; they are swapped if given in the wrong order
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs: min_secs.min(max_secs),
            max_secs: min_secs.max(max_secs),
        }
    }

    pub fn none() -> Self {
        Self::new(0, 0)
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.gen_range(self.min_secs..=self.max_secs))
    }

    pub fn sample(&self) -> Duration {
        self.sample_with(&mut rand::thread_rng())
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(2, 8)
    }
}

/// Wait for the anti-automation interstitial to clear after navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeWait {
    /// Blind sleep
    Fixed(Duration),
    /// Check for `selector` every `interval` until it matches or `timeout` passes
    Poll { interval: Duration, timeout: Duration },
}

impl ChallengeWait {
    pub async fn wait(&self, session: &dyn BrowserSession, selector: &str) -> Result<(), ScrapeError> {
        match self {
            ChallengeWait::Fixed(delay) => {
                debug!("Waiting {}s for bot challenge", delay.as_secs());
                tokio::time::sleep(*delay).await;
                Ok(())
            }
            ChallengeWait::Poll { interval, timeout } => {
                let deadline = Instant::now() + *timeout;
                loop {
                    if !session.find_all(selector).await?.is_empty() {
                        return Ok(());
                    }
                    if Instant::now() >= deadline {
                        debug!(
                            "No {} after {}s, continuing",
                            selector,
                            timeout.as_secs()
                        );
                        return Ok(());
                    }
                    tokio::time::sleep(*interval).await;
                }
            }
        }
    }
}

impl From<&ChallengeWaitConfig> for ChallengeWait {
    fn from(config: &ChallengeWaitConfig) -> Self {
        match config {
            ChallengeWaitConfig::Fixed { delay_secs } => {
                ChallengeWait::Fixed(Duration::from_secs(*delay_secs))
            }
            ChallengeWaitConfig::Poll {
                interval_secs,
                timeout_secs,
            } => ChallengeWait::Poll {
                interval: Duration::from_secs((*interval_secs).max(1)),
                timeout: Duration::from_secs(*timeout_secs),
            },
        }
    }
}
