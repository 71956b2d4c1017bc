// src/lib.rs
//! Job posting discovery: a periodic term producer feeds `pull_jobs` tasks to
//! browser-driven scrape workers through a durable queue.

pub mod browser;
pub mod cli;
pub mod core;
pub mod logging;
pub mod producer;
pub mod queue;
pub mod scraping;
pub mod types;
pub mod utils;
pub mod worker;

pub use crate::core::ConfigManager;
pub use producer::{CycleReport, TermProducer};
pub use scraping::{ScrapeError, SessionController};
pub use types::{JobPosting, JobType, ScrapeBatch, ScrapeTask};
pub use worker::WorkerPool;
