// src/browser/chrome.rs
//! Chromium over CDP via chromiumoxide

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Handler, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{BrowserDriver, BrowserResult, BrowserSession, LaunchOptions, PageElement};
use crate::core::FsOps;
use crate::scraping::ScrapeError;

#[derive(Debug, Clone, Default)]
pub struct ChromeDriver {
    executable: Option<PathBuf>,
}

impl ChromeDriver {
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }

    fn config(&self, options: &LaunchOptions) -> BrowserResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder().arg("--disable-gpu");

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(user_agent) = &options.user_agent {
            builder = builder.arg(format!("--user-agent={}", user_agent));
        }
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }

        builder.build().map_err(ScrapeError::Launch)
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn launch(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserSession>> {
        let config = self.config(options)?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let closed = Arc::new(AtomicBool::new(false));
        let handler_task = spawn_handler_task(handler, Arc::clone(&closed));

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(ScrapeError::Launch(e.to_string()));
            }
        };

        debug!(
            "Browser launched (headless={}, custom user agent={})",
            options.headless,
            options.user_agent.is_some()
        );

        Ok(Box::new(ChromeSession {
            browser,
            page,
            handler_task,
            closed,
        }))
    }
}

fn spawn_handler_task(mut handler: Handler, closed: Arc<AtomicBool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("chromiumoxide handler event error: {}", e);
            }
        }
        closed.store(true, Ordering::SeqCst);
    })
}

pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    closed: Arc<AtomicBool>,
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

fn wrap(elements: Vec<Element>) -> Vec<Box<dyn PageElement>> {
    elements
        .into_iter()
        .map(|element| Box::new(ChromeElement { element }) as Box<dyn PageElement>)
        .collect()
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        self.page
            .url()
            .await
            .map_err(ScrapeError::browser)?
            .ok_or_else(|| ScrapeError::Browser("page has no url".to_string()))
    }

    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn PageElement>>> {
        match self.page.find_elements(selector).await {
            Ok(elements) => Ok(wrap(elements)),
            Err(e) if self.closed.load(Ordering::SeqCst) => Err(ScrapeError::Browser(format!(
                "browser connection closed during find_elements({}): {}",
                selector, e
            ))),
            Err(e) => Err(ScrapeError::browser(e)),
        }
    }

    async fn detail_view(&self, selector: &str) -> BrowserResult<Box<dyn PageElement>> {
        self.find_all(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::missing(selector))
    }

    async fn screenshot(&self, path: &Path) -> BrowserResult<()> {
        let bytes = self
            .page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(ScrapeError::browser)?;

        FsOps::write_bytes(path, &bytes)
            .await
            .map_err(|e| ScrapeError::Io(std::io::Error::other(e.to_string())))
    }

    async fn close(&mut self) -> BrowserResult<()> {
        if let Err(e) = self.browser.close().await {
            warn!("Browser did not close cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Browser process did not exit cleanly: {}", e);
        }
        self.handler_task.abort();
        Ok(())
    }
}

struct ChromeElement {
    element: Element,
}

#[async_trait]
impl PageElement for ChromeElement {
    async fn text(&self) -> BrowserResult<String> {
        Ok(self
            .element
            .inner_text()
            .await
            .map_err(ScrapeError::browser)?
            .unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>> {
        self.element
            .attribute(name)
            .await
            .map_err(ScrapeError::browser)
    }

    async fn click(&self) -> BrowserResult<()> {
        self.element.click().await.map_err(ScrapeError::browser)?;
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn PageElement>>> {
        let elements = self
            .element
            .find_elements(selector)
            .await
            .map_err(ScrapeError::browser)?;
        Ok(wrap(elements))
    }
}
