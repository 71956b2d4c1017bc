// src/types/job.rs
//! Output records produced by the scrape worker

use serde::{Deserialize, Serialize};

// ===== Work Arrangement =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Remote,
    Hybrid,
    Onsite,
}

impl JobType {
    /// Classify from the raw location text. Exact, case-sensitive prefix match,
    /// evaluated before any newline stripping.
    pub fn from_location(location: &str) -> Self {
        if location.starts_with("Remote") {
            JobType::Remote
        } else if location.starts_with("Hybrid") {
            JobType::Hybrid
        } else {
            JobType::Onsite
        }
    }
}

// ===== Job Posting =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_type: JobType,
    pub salary: Option<String>,
    pub tags: Vec<String>,
    pub external_id: String,
    pub description: String,
    pub url: String,
}

// ===== Batch =====

/// Postings collected for one term, in page order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeBatch {
    pub term: String,
    pub containers: usize,
    pub skipped: usize,
    pub postings: Vec<JobPosting>,
}

impl ScrapeBatch {
    pub fn empty(term: &str) -> Self {
        Self {
            term: term.to_string(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_from_location() {
        assert_eq!(
            JobType::from_location("Remote in New York, NY"),
            JobType::Remote
        );
        assert_eq!(
            JobType::from_location("Hybrid work in Austin, TX"),
            JobType::Hybrid
        );
        assert_eq!(JobType::from_location("Austin, TX"), JobType::Onsite);
    }

    #[test]
    fn test_job_type_prefix_is_case_sensitive() {
        assert_eq!(JobType::from_location("remote"), JobType::Onsite);
        assert_eq!(JobType::from_location("HYBRID"), JobType::Onsite);
        assert_eq!(JobType::from_location("Austin (Remote)"), JobType::Onsite);
    }

    #[test]
    fn test_job_type_serializes_lowercase() {
        let value = serde_json::to_value(JobType::Onsite).unwrap();
        assert_eq!(value, "onsite");
    }
}
