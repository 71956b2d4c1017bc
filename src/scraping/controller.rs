// src/scraping/controller.rs
//! One browser session per term: launch, search, extract, always close.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::diagnostics::{Anomaly, Diagnostics};
use super::extractor::ContainerExtractor;
use super::pacing::{ChallengeWait, Pacing};
use super::selectors;
use super::ScrapeError;
use crate::browser::{BrowserDriver, BrowserSession, LaunchOptions};
use crate::core::ConfigManager;
use crate::types::ScrapeBatch;
use crate::utils::search_url;

/// Everything a session needs besides the driver
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub jobs_url: String,
    pub launch: LaunchOptions,
    pub challenge_wait: ChallengeWait,
    pub pacing: Pacing,
    pub deadline: Duration,
    pub screenshot_dir: PathBuf,
}

impl SessionSettings {
    pub fn from_config(config: &ConfigManager) -> Self {
        let scraper = &config.scraper;
        let launch = if scraper.production {
            LaunchOptions {
                headless: true,
                user_agent: Some(scraper.user_agent.clone()),
            }
        } else {
            LaunchOptions {
                headless: false,
                user_agent: None,
            }
        };

        Self {
            jobs_url: scraper.jobs_url.clone(),
            launch,
            challenge_wait: ChallengeWait::from(&scraper.challenge_wait),
            pacing: Pacing::new(scraper.pacing_min_secs, scraper.pacing_max_secs),
            deadline: scraper.task_deadline(),
            screenshot_dir: config.logging.dir.clone(),
        }
    }
}

pub struct SessionController {
    driver: Arc<dyn BrowserDriver>,
    settings: SessionSettings,
    extractor: ContainerExtractor,
    diagnostics: Diagnostics,
}

impl SessionController {
    pub fn new(driver: Arc<dyn BrowserDriver>, settings: SessionSettings) -> Self {
        Self {
            extractor: ContainerExtractor::new(settings.pacing),
            diagnostics: Diagnostics::new(settings.screenshot_dir.clone()),
            driver,
            settings,
        }
    }

    /// Scrape every result for `term`. The browser is closed on every exit
    /// path, including deadline expiry and cancellation.
    pub async fn scrape_term(
        &self,
        term: &str,
        cancel: &CancellationToken,
    ) -> Result<ScrapeBatch, ScrapeError> {
        let started = Instant::now();
        debug!("Processing term \"{}\"", term);

        let url = search_url(&self.settings.jobs_url, term)
            .map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?;

        let mut session = self.driver.launch(&self.settings.launch).await?;

        let deadline = self.settings.deadline;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
            result = tokio::time::timeout(deadline, self.run(session.as_mut(), term, &url)) => {
                result.unwrap_or(Err(ScrapeError::TimedOut(deadline)))
            }
        };

        if let Err(e) = session.close().await {
            warn!("Failed to close browser for term \"{}\": {}", term, e);
        }

        let elapsed = started.elapsed();
        match &outcome {
            Ok(batch) => {
                info!("Collected jobs for term \"{}\": {}", term, batch.len());
                for posting in &batch.postings {
                    match serde_json::to_string(posting) {
                        Ok(json) => debug!("{}", json),
                        Err(e) => debug!("Unserializable posting {}: {}", posting.external_id, e),
                    }
                }
                info!(
                    "Complete scraping for term \"{}\" after {:.1}s",
                    term,
                    elapsed.as_secs_f64()
                );
            }
            Err(e) => {
                error!(
                    "Scraping for term \"{}\" failed after {:.1}s: {}",
                    term,
                    elapsed.as_secs_f64(),
                    e
                );
            }
        }

        outcome
    }

    async fn run(
        &self,
        session: &mut dyn BrowserSession,
        term: &str,
        url: &str,
    ) -> Result<ScrapeBatch, ScrapeError> {
        debug!("Scraping {}", url);
        session.navigate(url).await?;

        let session: &dyn BrowserSession = session;
        self.settings
            .challenge_wait
            .wait(session, selectors::RESULT_CONTAINER)
            .await?;

        let containers = session.find_all(selectors::RESULT_CONTAINER).await?;
        debug!("Containers to process: {}. URL {}", containers.len(), url);

        let mut batch = ScrapeBatch::empty(term);
        batch.containers = containers.len();

        if containers.is_empty() {
            warn!("No job containers found for term \"{}\". URL {}", term, url);
            self.diagnostics
                .capture(session, Anomaly::NoContainers)
                .await;
            return Ok(batch);
        }

        for (index, container) in containers.iter().enumerate() {
            match self.extractor.extract(session, container.as_ref()).await {
                Ok(posting) => batch.postings.push(posting),
                Err(e) => {
                    let anomaly = if e.is_missing_element() {
                        error!(
                            "HTML element not found for term \"{}\" (container {}): {}",
                            term, index, e
                        );
                        Anomaly::MissingElement
                    } else {
                        error!(
                            "Unexpected error for term \"{}\" (container {}): {}",
                            term, index, e
                        );
                        Anomaly::Unexpected
                    };
                    self.diagnostics.capture(session, anomaly).await;
                    batch.skipped += 1;
                }
            }
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::SnapshotDriver;
    use tempfile::TempDir;

    fn container(jk: &str, title: &str, with_company: bool) -> String {
        let company = if with_company {
            r#"<div class="company_location">
                 <span data-testid="company-name">Acme</span>
                 <div data-testid="text-location">Hybrid work in Austin, TX</div>
               </div>"#
        } else {
            ""
        };
        format!(
            r#"<div class="job_seen_beacon">
                 <h2 class="jobTitle"><a href="/viewjob?jk={jk}" data-jk="{jk}"><span>{title}</span></a></h2>
                 {company}
               </div>
               <div id="jobsearch-ViewjobPaneWrapper" data-jk="{jk}">
                 <div id="salaryInfoAndJobType"><span>- Full-time</span></div>
                 <div data-testid="list-item">tag-{jk}</div>
                 <div id="jobDescriptionText">About {title}</div>
               </div>"#
        )
    }

    fn page(containers: &[String]) -> String {
        format!("<html><body>{}</body></html>", containers.join("\n"))
    }

    fn settings(dir: &TempDir) -> SessionSettings {
        SessionSettings {
            jobs_url: "https://jobs.test/jobs?q={term}".to_string(),
            launch: LaunchOptions::default(),
            challenge_wait: ChallengeWait::Fixed(Duration::ZERO),
            pacing: Pacing::none(),
            deadline: Duration::from_secs(30),
            screenshot_dir: dir.path().to_path_buf(),
        }
    }

    fn controller(driver: &SnapshotDriver, settings: SessionSettings) -> SessionController {
        SessionController::new(Arc::new(driver.clone()), settings)
    }

    #[tokio::test]
    async fn test_missing_element_skips_one_container() {
        let temp = TempDir::new().unwrap();
        let html = page(&[
            container("a1", "First", true),
            container("b2", "Second", false),
            container("c3", "Third", true),
        ]);
        let driver = SnapshotDriver::new(html, "https://jobs.test/");
        let controller = controller(&driver, settings(&temp));

        let batch = controller
            .scrape_term("rust developer", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(batch.term, "rust developer");
        assert_eq!(batch.containers, 3);
        assert_eq!(batch.skipped, 1);
        let titles: Vec<_> = batch.postings.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Third"]);

        let shots = driver.screenshots();
        assert_eq!(shots.len(), 1);
        let name = shots[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("no-element-"));
        assert_eq!(driver.closes(), 1);
    }

    #[tokio::test]
    async fn test_unexpected_error_skips_one_container() {
        let temp = TempDir::new().unwrap();
        let html = page(&[
            container("a1", "First", true),
            container("b2", "Second", true),
            container("c3", "Third", true),
        ]);
        let driver = SnapshotDriver::new(html, "https://jobs.test/").with_failing_click("b2");
        let controller = controller(&driver, settings(&temp));

        let batch = controller
            .scrape_term("rust", &CancellationToken::new())
            .await
            .unwrap();

        let titles: Vec<_> = batch.postings.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Third"]);
        assert_eq!(batch.skipped, 1);

        let shots = driver.screenshots();
        assert_eq!(shots.len(), 1);
        let name = shots[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("error-"), "unexpected screenshot {}", name);
        assert_eq!(driver.closes(), 1);
    }

    #[tokio::test]
    async fn test_container_lookup_failure_fails_the_task() {
        let temp = TempDir::new().unwrap();
        let html = page(&[container("a1", "First", true)]);
        let driver = SnapshotDriver::new(html, "https://jobs.test/")
            .with_failing_lookup(selectors::RESULT_CONTAINER);
        let controller = controller(&driver, settings(&temp));

        let err = controller
            .scrape_term("rust", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::Browser(_)));
        assert!(driver.screenshots().is_empty());
        assert_eq!(driver.closes(), 1);
    }

    #[tokio::test]
    async fn test_tags_come_from_the_clicked_posting() {
        let temp = TempDir::new().unwrap();
        let html = page(&[container("a1", "First", true), container("b2", "Second", true)]);
        let driver = SnapshotDriver::new(html, "https://jobs.test/");
        let controller = controller(&driver, settings(&temp));

        let batch = controller
            .scrape_term("rust", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(batch.postings[0].tags, vec!["Full-time", "tag-a1"]);
        assert_eq!(batch.postings[1].tags, vec!["Full-time", "tag-b2"]);
        assert_eq!(batch.postings[1].description, "About Second");
        assert_eq!(batch.postings[1].url, "https://jobs.test/viewjob?jk=b2");
    }

    #[tokio::test]
    async fn test_zero_containers_is_empty_batch() {
        let temp = TempDir::new().unwrap();
        let driver = SnapshotDriver::new("<html><body>Verify you are human</body></html>", "https://jobs.test/");
        let controller = controller(&driver, settings(&temp));

        let batch = controller
            .scrape_term("rust", &CancellationToken::new())
            .await
            .unwrap();

        assert!(batch.is_empty());
        assert_eq!(batch.containers, 0);
        let shots = driver.screenshots();
        assert_eq!(shots.len(), 1);
        assert!(shots[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("no-containers-"));
        assert_eq!(driver.closes(), 1);
    }

    #[tokio::test]
    async fn test_navigation_failure_still_closes() {
        let temp = TempDir::new().unwrap();
        let driver = SnapshotDriver::new(page(&[]), "https://jobs.test/").with_failing_navigation();
        let controller = controller(&driver, settings(&temp));

        let err = controller
            .scrape_term("rust", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::Navigation { .. }));
        assert_eq!(driver.launches(), 1);
        assert_eq!(driver.closes(), 1);
    }

    #[tokio::test]
    async fn test_deadline_expiry_closes_session() {
        let temp = TempDir::new().unwrap();
        let driver = SnapshotDriver::new(page(&[container("a1", "First", true)]), "https://jobs.test/");
        let mut settings = settings(&temp);
        settings.challenge_wait = ChallengeWait::Fixed(Duration::from_secs(60));
        settings.deadline = Duration::from_millis(50);
        let controller = controller(&driver, settings);

        let err = controller
            .scrape_term("rust", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::TimedOut(_)));
        assert_eq!(driver.closes(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_closes_session() {
        let temp = TempDir::new().unwrap();
        let driver = SnapshotDriver::new(page(&[container("a1", "First", true)]), "https://jobs.test/");
        let mut settings = settings(&temp);
        settings.challenge_wait = ChallengeWait::Fixed(Duration::from_secs(60));
        let controller = controller(&driver, settings);

        let token = CancellationToken::new();
        token.cancel();
        let err = controller.scrape_term("rust", &token).await.unwrap_err();

        assert!(matches!(err, ScrapeError::Cancelled));
        assert_eq!(driver.closes(), 1);
    }

    #[tokio::test]
    async fn test_invalid_template_never_launches() {
        let temp = TempDir::new().unwrap();
        let driver = SnapshotDriver::new(page(&[]), "https://jobs.test/");
        let mut settings = settings(&temp);
        settings.jobs_url = "https://jobs.test/jobs".to_string();
        let controller = controller(&driver, settings);

        let err = controller
            .scrape_term("rust", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::InvalidUrl(_)));
        assert_eq!(driver.launches(), 0);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = ConfigManager::default();
        config.scraper.production = true;
        let settings = SessionSettings::from_config(&config);

        assert!(settings.launch.headless);
        assert_eq!(
            settings.launch.user_agent.as_deref(),
            Some(config.scraper.user_agent.as_str())
        );
        assert_eq!(settings.deadline, Duration::from_secs(900));

        config.scraper.production = false;
        let settings = SessionSettings::from_config(&config);
        assert!(!settings.launch.headless);
        assert_eq!(settings.launch.user_agent, None);
    }
}
