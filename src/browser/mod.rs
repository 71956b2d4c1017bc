// src/browser/mod.rs
//! Browser automation seam.
//!
//! The scraping state machine only talks to these traits. `chrome` drives a real
//! Chromium over CDP; `snapshot` serves a saved HTML page and backs the
//! `replay` command and the tests.

use async_trait::async_trait;
use std::path::Path;

use crate::scraping::ScrapeError;

pub mod chrome;
pub mod snapshot;

pub use chrome::ChromeDriver;
pub use snapshot::SnapshotDriver;

pub type BrowserResult<T> = Result<T, ScrapeError>;

/// Launch options for one session
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub headless: bool,
    pub user_agent: Option<String>,
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserSession>>;
}

/// One browser instance, owned by one task
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()>;

    /// URL of the loaded page, used to resolve relative links
    async fn current_url(&self) -> BrowserResult<String>;

    /// All elements in the page matching `selector`, in document order
    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn PageElement>>>;

    /// Scoped view of the detail pane opened by the last link activation
    async fn detail_view(&self, selector: &str) -> BrowserResult<Box<dyn PageElement>>;

    async fn screenshot(&self, path: &Path) -> BrowserResult<()>;

    /// Release the browser. Must be safe to call after a failure.
    async fn close(&mut self) -> BrowserResult<()>;
}

#[async_trait]
pub trait PageElement: Send + Sync {
    async fn text(&self) -> BrowserResult<String>;

    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>>;

    async fn click(&self) -> BrowserResult<()>;

    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn PageElement>>>;

    /// First descendant matching `selector`, or `MissingElement`
    async fn find(&self, selector: &str) -> BrowserResult<Box<dyn PageElement>> {
        self.find_all(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::missing(selector))
    }

    /// Attribute that must be present, or `MissingElement`
    async fn required_attribute(&self, name: &str) -> BrowserResult<String> {
        self.attribute(name)
            .await?
            .ok_or_else(|| ScrapeError::missing(format!("[{}]", name)))
    }
}
