// src/scraping/error.rs
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A lookup matched zero elements
    #[error("HTML element not found: {selector}")]
    MissingElement { selector: String },

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("session exceeded its deadline of {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("session cancelled")]
    Cancelled,

    #[error("invalid search url: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    pub fn missing(selector: impl Into<String>) -> Self {
        ScrapeError::MissingElement {
            selector: selector.into(),
        }
    }

    pub fn browser(err: impl std::fmt::Display) -> Self {
        ScrapeError::Browser(err.to_string())
    }

    pub fn is_missing_element(&self) -> bool {
        matches!(self, ScrapeError::MissingElement { .. })
    }
}
