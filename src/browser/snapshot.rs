// src/browser/snapshot.rs
//! Static HTML "browser" built on the scraper crate.
//!
//! Serves one saved results page. Clicking an element that carries the detail
//! key attribute (`data-jk`) selects the detail pane with the same key, which is
//! how the live page swaps its right-hand pane. Screenshots are written as a
//! placeholder image since nothing is rendered.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{BrowserDriver, BrowserResult, BrowserSession, LaunchOptions, PageElement};
use crate::core::FsOps;
use crate::scraping::ScrapeError;

/// Attribute linking a result link to its detail pane
pub const DETAIL_KEY_ATTR: &str = "data-jk";

/// 1x1 transparent PNG
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Default)]
struct Counters {
    launches: AtomicUsize,
    closes: AtomicUsize,
    screenshots: Mutex<Vec<PathBuf>>,
}

#[derive(Clone)]
pub struct SnapshotDriver {
    html: Arc<String>,
    base_url: String,
    faults: Faults,
    counters: Arc<Counters>,
}

/// Driver failures a test can switch on
#[derive(Debug, Clone, Default)]
struct Faults {
    navigation: bool,
    /// Page-level lookups of this selector fail
    lookup: Option<String>,
    /// Clicking the link with this detail key fails
    click: Option<String>,
}

impl SnapshotDriver {
    pub fn new(html: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            html: Arc::new(html.into()),
            base_url: base_url.into(),
            faults: Faults::default(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub async fn from_file(path: &Path, base_url: impl Into<String>) -> anyhow::Result<Self> {
        let html = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        Ok(Self::new(html, base_url))
    }

    /// Every navigation fails, as if the driver crashed
    pub fn with_failing_navigation(mut self) -> Self {
        self.faults.navigation = true;
        self
    }

    /// Page-level `find_all(selector)` fails, as if the driver stopped responding
    pub fn with_failing_lookup(mut self, selector: impl Into<String>) -> Self {
        self.faults.lookup = Some(selector.into());
        self
    }

    /// Clicking the link whose `data-jk` is `key` fails
    pub fn with_failing_click(mut self, key: impl Into<String>) -> Self {
        self.faults.click = Some(key.into());
        self
    }

    pub fn launches(&self) -> usize {
        self.counters.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.counters
            .screenshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl BrowserDriver for SnapshotDriver {
    async fn launch(&self, _options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserSession>> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SnapshotSession {
            html: Arc::clone(&self.html),
            url: self.base_url.clone(),
            faults: self.faults.clone(),
            active_key: Arc::new(Mutex::new(None)),
            counters: Arc::clone(&self.counters),
        }))
    }
}

pub struct SnapshotSession {
    html: Arc<String>,
    url: String,
    faults: Faults,
    active_key: Arc<Mutex<Option<String>>>,
    counters: Arc<Counters>,
}

// ===== Parsing helpers (sync; Html never crosses an await) =====

fn parse_selector(selector: &str) -> BrowserResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::Browser(format!("invalid selector '{}': {:?}", selector, e)))
}

fn select_outer_html(html: &str, fragment: bool, selector: &str) -> BrowserResult<Vec<String>> {
    let selector = parse_selector(selector)?;
    if fragment {
        let document = Html::parse_fragment(html);
        let Some(root) = first_element(&document) else {
            return Ok(Vec::new());
        };
        Ok(root
            .select(&selector)
            .filter(|el| el.id() != root.id())
            .map(|el| el.html())
            .collect())
    } else {
        let document = Html::parse_document(html);
        Ok(document.select(&selector).map(|el| el.html()).collect())
    }
}

fn first_element(document: &Html) -> Option<ElementRef<'_>> {
    document.root_element().children().find_map(ElementRef::wrap)
}

fn fragment_text(html: &str) -> String {
    let document = Html::parse_fragment(html);
    first_element(&document)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn fragment_attribute(html: &str, name: &str) -> Option<String> {
    let document = Html::parse_fragment(html);
    first_element(&document).and_then(|el| el.value().attr(name).map(str::to_string))
}

fn detail_pane(html: &str, selector: &str, key: Option<&str>) -> BrowserResult<Option<String>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let mut panes = document.select(&selector);

    let pane = match key {
        Some(key) => panes.find(|el| el.value().attr(DETAIL_KEY_ATTR) == Some(key)),
        None => panes.next(),
    };
    Ok(pane.map(|el| el.html()))
}

impl SnapshotSession {
    fn element(&self, html: String) -> Box<dyn PageElement> {
        Box::new(SnapshotElement {
            html,
            failing_click: self.faults.click.clone(),
            active_key: Arc::clone(&self.active_key),
        })
    }
}

#[async_trait]
impl BrowserSession for SnapshotSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        if self.faults.navigation {
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        self.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.url.clone())
    }

    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn PageElement>>> {
        if self.faults.lookup.as_deref() == Some(selector) {
            return Err(ScrapeError::Browser(format!(
                "request timed out: DOM.querySelectorAll({})",
                selector
            )));
        }
        let found = select_outer_html(&self.html, false, selector)?;
        Ok(found.into_iter().map(|html| self.element(html)).collect())
    }

    async fn detail_view(&self, selector: &str) -> BrowserResult<Box<dyn PageElement>> {
        let key = self
            .active_key
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        detail_pane(&self.html, selector, key.as_deref())?
            .map(|html| self.element(html))
            .ok_or_else(|| ScrapeError::missing(selector))
    }

    async fn screenshot(&self, path: &Path) -> BrowserResult<()> {
        FsOps::write_bytes(path, PLACEHOLDER_PNG)
            .await
            .map_err(|e| ScrapeError::Io(std::io::Error::other(e.to_string())))?;
        self.counters
            .screenshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_path_buf());
        Ok(())
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct SnapshotElement {
    html: String,
    failing_click: Option<String>,
    active_key: Arc<Mutex<Option<String>>>,
}

#[async_trait]
impl PageElement for SnapshotElement {
    async fn text(&self) -> BrowserResult<String> {
        Ok(fragment_text(&self.html))
    }

    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>> {
        Ok(fragment_attribute(&self.html, name))
    }

    async fn click(&self) -> BrowserResult<()> {
        let key = fragment_attribute(&self.html, DETAIL_KEY_ATTR);
        if key.is_some() && key == self.failing_click {
            return Err(ScrapeError::Browser(
                "element is not clickable at point".to_string(),
            ));
        }
        if let Some(key) = key {
            *self.active_key.lock().unwrap_or_else(|e| e.into_inner()) = Some(key);
        }
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn PageElement>>> {
        let found = select_outer_html(&self.html, true, selector)?;
        Ok(found
            .into_iter()
            .map(|html| {
                Box::new(SnapshotElement {
                    html,
                    failing_click: self.failing_click.clone(),
                    active_key: Arc::clone(&self.active_key),
                }) as Box<dyn PageElement>
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="job_seen_beacon"><a class="link" data-jk="a1" href="/a1">First</a></div>
          <div class="job_seen_beacon"><a class="link" data-jk="b2" href="/b2">Second</a></div>
          <div class="pane" data-jk="a1"><p id="text">Pane A</p></div>
          <div class="pane" data-jk="b2"><p id="text">Pane B</p></div>
        </body></html>
    "#;

    #[tokio::test]
    async fn test_find_all_in_document_order() {
        let driver = SnapshotDriver::new(PAGE, "https://example.test/jobs");
        let session = driver.launch(&LaunchOptions::default()).await.unwrap();

        let containers = session.find_all(".job_seen_beacon").await.unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[1].text().await.unwrap(), "Second");
    }

    #[tokio::test]
    async fn test_click_selects_matching_detail_pane() {
        let driver = SnapshotDriver::new(PAGE, "https://example.test/jobs");
        let session = driver.launch(&LaunchOptions::default()).await.unwrap();

        let containers = session.find_all(".job_seen_beacon").await.unwrap();
        let link = containers[1].find("a.link").await.unwrap();
        link.click().await.unwrap();

        let pane = session.detail_view(".pane").await.unwrap();
        let text = pane.find("#text").await.unwrap().text().await.unwrap();
        assert_eq!(text, "Pane B");
    }

    #[tokio::test]
    async fn test_find_missing_element() {
        let driver = SnapshotDriver::new(PAGE, "https://example.test/jobs");
        let session = driver.launch(&LaunchOptions::default()).await.unwrap();

        let containers = session.find_all(".job_seen_beacon").await.unwrap();
        let err = containers[0].find(".company_location").await.err().unwrap();
        assert!(err.is_missing_element());
    }

    #[tokio::test]
    async fn test_failing_lookup_is_an_error() {
        let driver =
            SnapshotDriver::new(PAGE, "https://example.test/jobs").with_failing_lookup(".job_seen_beacon");
        let session = driver.launch(&LaunchOptions::default()).await.unwrap();

        let err = session.find_all(".job_seen_beacon").await.err().unwrap();
        assert!(matches!(err, ScrapeError::Browser(_)));
        assert_eq!(session.find_all("a.link").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_click_only_hits_its_key() {
        let driver = SnapshotDriver::new(PAGE, "https://example.test/jobs").with_failing_click("b2");
        let session = driver.launch(&LaunchOptions::default()).await.unwrap();

        let links = session.find_all("a.link").await.unwrap();
        assert!(links[0].click().await.is_ok());
        let err = links[1].click().await.err().unwrap();
        assert!(!err.is_missing_element());
    }

    #[tokio::test]
    async fn test_attribute_and_counters() {
        let driver = SnapshotDriver::new(PAGE, "https://example.test/jobs");
        let mut session = driver.launch(&LaunchOptions::default()).await.unwrap();

        let link = session.find_all("a.link").await.unwrap().remove(0);
        assert_eq!(link.attribute("href").await.unwrap().as_deref(), Some("/a1"));
        assert_eq!(link.attribute("title").await.unwrap(), None);

        session.close().await.unwrap();
        assert_eq!(driver.launches(), 1);
        assert_eq!(driver.closes(), 1);
    }
}
