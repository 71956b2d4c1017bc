// src/scraping/extractor.rs
//! Turns one result container into a `JobPosting`

use tracing::debug;
use url::Url;

use super::pacing::Pacing;
use super::selectors;
use super::ScrapeError;
use crate::browser::{BrowserSession, PageElement};
use crate::types::{JobPosting, JobType};
use crate::utils::strip_newlines;

/// Detail pane opened by clicking a result's title link. Every lookup is
/// scoped to the pane so nothing leaks in from other postings.
pub struct DetailView {
    pane: Box<dyn PageElement>,
}

impl DetailView {
    pub async fn open(session: &dyn BrowserSession) -> Result<Self, ScrapeError> {
        let pane = session.detail_view(selectors::DETAIL_PANE).await?;
        Ok(Self { pane })
    }

    pub async fn description(&self) -> Result<String, ScrapeError> {
        self.pane.find(selectors::DESCRIPTION).await?.text().await
    }

    pub async fn badges(&self) -> Result<Vec<String>, ScrapeError> {
        texts(self.pane.as_ref(), selectors::SALARY_JOB_TYPE).await
    }

    pub async fn list_items(&self) -> Result<Vec<String>, ScrapeError> {
        texts(self.pane.as_ref(), selectors::LIST_ITEM).await
    }
}

async fn texts(scope: &dyn PageElement, selector: &str) -> Result<Vec<String>, ScrapeError> {
    let mut out = Vec::new();
    for element in scope.find_all(selector).await? {
        out.push(element.text().await?);
    }
    Ok(out)
}

/// Split the salary/job-type badges. A badge containing `$` is the salary
/// (the last one wins); the rest become tags with a leading "- " removed.
pub fn split_badges(badges: Vec<String>) -> (Option<String>, Vec<String>) {
    let mut salary = None;
    let mut tags = Vec::new();

    for badge in badges {
        if badge.contains('$') {
            salary = Some(badge);
        } else {
            let tag = badge.strip_prefix("- ").unwrap_or(&badge).to_string();
            tags.push(tag);
        }
    }
    (salary, tags)
}

/// Absolute URL for a result link. Hrefs that cannot be resolved are kept as-is.
pub fn resolve_url(page_url: &str, href: &str) -> String {
    Url::parse(page_url)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}

#[derive(Debug, Clone)]
pub struct ContainerExtractor {
    pacing: Pacing,
}

impl ContainerExtractor {
    pub fn new(pacing: Pacing) -> Self {
        Self { pacing }
    }

    pub async fn extract(
        &self,
        session: &dyn BrowserSession,
        container: &dyn PageElement,
    ) -> Result<JobPosting, ScrapeError> {
        let title = container.find(selectors::TITLE).await?.text().await?;

        let link = container.find(selectors::TITLE_LINK).await?;
        let href = link.required_attribute("href").await?;
        let url = resolve_url(&session.current_url().await?, &href);

        link.click().await?;
        let pause = self.pacing.sample();
        debug!("Waiting {}s before reading detail. URL {}", pause.as_secs(), url);
        tokio::time::sleep(pause).await;

        let external_id = link
            .required_attribute(selectors::EXTERNAL_ID_ATTR)
            .await?;

        let detail = DetailView::open(session).await?;
        let description = detail.description().await?;

        let company_location = container.find(selectors::COMPANY_LOCATION).await?;
        let company = company_location
            .find(selectors::COMPANY)
            .await?
            .text()
            .await?;
        let raw_location = company_location
            .find(selectors::LOCATION)
            .await?
            .text()
            .await?;

        // Classify before stripping: the prefix check sees the raw text
        let job_type = JobType::from_location(&raw_location);
        let location = strip_newlines(&raw_location);

        let (salary, mut tags) = split_badges(detail.badges().await?);
        tags.extend(detail.list_items().await?);

        Ok(JobPosting {
            title,
            company,
            location,
            job_type,
            salary,
            tags,
            external_id,
            description,
            url,
        })
    }
}
