// src/scraping/selectors.rs
//! CSS selectors for the single supported results-page template

/// One result entry on the search page
pub const RESULT_CONTAINER: &str = ".job_seen_beacon";

pub const TITLE: &str = ".jobTitle span";
pub const TITLE_LINK: &str = ".jobTitle a";
pub const EXTERNAL_ID_ATTR: &str = "data-jk";

pub const COMPANY_LOCATION: &str = ".company_location";
pub const COMPANY: &str = "span[data-testid='company-name']";
pub const LOCATION: &str = "div[data-testid='text-location']";

/// Right-hand pane that shows the posting selected by the last click
pub const DETAIL_PANE: &str = "#jobsearch-ViewjobPaneWrapper";
pub const DESCRIPTION: &str = "#jobDescriptionText";
pub const SALARY_JOB_TYPE: &str = "#salaryInfoAndJobType span";
pub const LIST_ITEM: &str = "div[data-testid='list-item']";
