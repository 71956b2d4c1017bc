// src/cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::browser::{BrowserDriver, ChromeDriver, SnapshotDriver};
use crate::core::{ConfigManager, MatchingClient};
use crate::producer::TermProducer;
use crate::queue::NatsTaskQueue;
use crate::scraping::{ChallengeWait, Pacing, SessionController, SessionSettings};
use crate::types::ScrapeBatch;
use crate::worker::WorkerPool;

#[derive(Parser)]
#[command(name = "job-scout")]
#[command(about = "Discover job postings for matching search terms")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch matching terms and queue one scrape task per term
    Produce {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Consume scrape tasks from the queue
    Work {
        /// Number of concurrent browser sessions
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Scrape one term directly, bypassing the queue
    Scrape { term: String },
    /// Run extraction against a saved results page
    Replay {
        html: PathBuf,
        #[arg(long, default_value = "replay")]
        term: String,
        /// URL the page is treated as having been loaded from
        #[arg(long, default_value = "https://www.indeed.com/jobs")]
        base_url: String,
    },
}

pub async fn handle_command(cli: Cli, config: ConfigManager) -> Result<()> {
    let shutdown = shutdown_token();

    match cli.command {
        Command::Produce { once } => {
            let source = Arc::new(MatchingClient::new(&config.matching)?);
            let queue = Arc::new(NatsTaskQueue::connect(&config.broker).await?);
            let producer = TermProducer::new(source, queue);

            if once {
                let report = producer.run_cycle().await?;
                info!(
                    "Submitted {} tasks in {:.1}s",
                    report.submitted,
                    report.elapsed.as_secs_f64()
                );
            } else {
                producer.run(config.producer.interval(), shutdown).await;
            }
        }

        Command::Work { concurrency } => {
            let queue = Arc::new(NatsTaskQueue::connect(&config.broker).await?);
            let controller = Arc::new(live_controller(&config));
            let concurrency = concurrency.unwrap_or(config.worker.concurrency);

            WorkerPool::new(queue, controller, concurrency)
                .run(shutdown)
                .await;
        }

        Command::Scrape { term } => {
            let term = term.trim().to_lowercase();
            if term.is_empty() {
                anyhow::bail!("Search term must not be empty");
            }
            let batch = live_controller(&config)
                .scrape_term(&term, &shutdown)
                .await?;
            print_batch(&batch)?;
        }

        Command::Replay {
            html,
            term,
            base_url,
        } => {
            let driver = SnapshotDriver::from_file(&html, base_url.clone()).await?;
            let settings = SessionSettings {
                jobs_url: replay_template(&base_url),
                challenge_wait: ChallengeWait::Fixed(Duration::ZERO),
                pacing: Pacing::none(),
                ..SessionSettings::from_config(&config)
            };
            let controller = SessionController::new(Arc::new(driver), settings);

            let batch = controller.scrape_term(&term, &shutdown).await?;
            print_batch(&batch)?;
        }
    }

    Ok(())
}

fn live_controller(config: &ConfigManager) -> SessionController {
    let driver: Arc<dyn BrowserDriver> =
        Arc::new(ChromeDriver::new(config.scraper.chrome_executable.clone()));
    SessionController::new(driver, SessionSettings::from_config(config))
}

/// Search template for a saved page; the term only ends up in the query
fn replay_template(base_url: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}q={{term}}", base_url, separator)
}

fn print_batch(batch: &ScrapeBatch) -> Result<()> {
    let json = serde_json::to_string_pretty(&batch.postings).context("Failed to encode postings")?;
    println!("{}", json);
    Ok(())
}

/// Token cancelled on Ctrl-C
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
        trigger.cancel();
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["job-scout", "produce", "--once"]).unwrap();
        assert!(matches!(cli.command, Command::Produce { once: true }));

        let cli = Cli::try_parse_from(["job-scout", "work", "--concurrency", "3"]).unwrap();
        assert!(matches!(cli.command, Command::Work { concurrency: Some(3) }));

        let cli = Cli::try_parse_from(["job-scout", "replay", "page.html"]).unwrap();
        match cli.command {
            Command::Replay { html, term, .. } => {
                assert_eq!(html, PathBuf::from("page.html"));
                assert_eq!(term, "replay");
            }
            _ => panic!("expected replay"),
        }
    }

    #[test]
    fn test_replay_template() {
        assert_eq!(
            replay_template("https://www.indeed.com/jobs"),
            "https://www.indeed.com/jobs?q={term}"
        );
        assert_eq!(
            replay_template("https://www.indeed.com/jobs?l=Berlin"),
            "https://www.indeed.com/jobs?l=Berlin&q={term}"
        );
    }
}
