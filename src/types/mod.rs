// src/types/mod.rs
pub mod job;
pub mod matching;
pub mod task;

pub use job::{JobPosting, JobType, ScrapeBatch};
pub use matching::MatchingCriterion;
pub use task::{ScrapeTask, PULL_JOBS_TASK};
