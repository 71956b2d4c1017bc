// src/types/task.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Logical task name carried by every queued message.
pub const PULL_JOBS_TASK: &str = "pull_jobs";

/// Unit of queue work: one raw search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeTask {
    pub name: String,
    pub term: String,
    pub id: Uuid,
    pub submitted_at: DateTime<Utc>,
}

impl ScrapeTask {
    pub fn pull_jobs(term: impl Into<String>) -> Self {
        Self {
            name: PULL_JOBS_TASK.to_string(),
            term: term.into(),
            id: Uuid::new_v4(),
            submitted_at: Utc::now(),
        }
    }

    pub fn is_pull_jobs(&self) -> bool {
        self.name == PULL_JOBS_TASK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_jobs_envelope() {
        let task = ScrapeTask::pull_jobs("rust developer");
        let json = serde_json::to_value(&task).unwrap();

        assert_eq!(json["name"], "pull_jobs");
        assert_eq!(json["term"], "rust developer");
        assert!(json["id"].is_string());
        assert!(task.is_pull_jobs());
    }
}
