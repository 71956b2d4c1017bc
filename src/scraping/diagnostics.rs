// src/scraping/diagnostics.rs
//! Screenshots taken when a page does not look the way we expect

use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::browser::BrowserSession;
use crate::core::FsOps;
use crate::utils::diagnostic_timestamp;

const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// The results page had no result containers
    NoContainers,
    /// An expected element was missing inside a container
    MissingElement,
    /// Anything else that went wrong while extracting a container
    Unexpected,
}

impl Anomaly {
    pub fn category(&self) -> &'static str {
        match self {
            Anomaly::NoContainers => "no-containers",
            Anomaly::MissingElement => "no-element",
            Anomaly::Unexpected => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    dir: PathBuf,
}

impl Diagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Save a full-page screenshot as `<category>-<YYYYMMDD-HHMMSS>.png`.
    /// Failures are logged and swallowed.
    pub async fn capture(&self, session: &dyn BrowserSession, anomaly: Anomaly) -> Option<PathBuf> {
        if let Err(e) = FsOps::ensure_dir_exists(&self.dir).await {
            warn!("Cannot prepare screenshot directory: {}", e);
            return None;
        }

        let stem = format!(
            "{}-{}",
            anomaly.category(),
            diagnostic_timestamp(&Local::now())
        );
        let path = FsOps::unique_path(&self.dir, &stem, "png");

        match tokio::time::timeout(SCREENSHOT_TIMEOUT, session.screenshot(&path)).await {
            Ok(Ok(())) => {
                debug!("Saved screenshot {}", path.display());
                Some(path)
            }
            Ok(Err(e)) => {
                warn!("Failed to save screenshot {}: {}", path.display(), e);
                None
            }
            Err(_) => {
                warn!(
                    "Screenshot {} timed out after {}s",
                    path.display(),
                    SCREENSHOT_TIMEOUT.as_secs()
                );
                None
            }
        }
    }
}
