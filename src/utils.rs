// src/utils.rs
use anyhow::Result;
use chrono::{DateTime, TimeZone};
use std::collections::BTreeSet;

/// Placeholder substituted with the encoded term in the jobs URL template
pub const TERM_PLACEHOLDER: &str = "{term}";

/// Lowercase and deduplicate raw positions into the terms of one dispatch cycle.
/// Blank positions are dropped.
pub fn normalize_terms<'a, I>(positions: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    positions
        .into_iter()
        .filter(|position| !position.trim().is_empty())
        .map(|position| position.to_lowercase())
        .collect()
}

/// Percent-encode a term for use in a query string (space becomes `%20`).
/// `/` is left as-is.
pub fn encode_term(term: &str) -> String {
    term.split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the search-results URL for a term
pub fn search_url(template: &str, term: &str) -> Result<String> {
    if !template.contains(TERM_PLACEHOLDER) {
        anyhow::bail!(
            "Jobs URL template has no {} placeholder: {}",
            TERM_PLACEHOLDER,
            template
        );
    }
    Ok(template.replace(TERM_PLACEHOLDER, &encode_term(term)))
}

/// Timestamp used in diagnostic file names
pub fn diagnostic_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y%m%d-%H%M%S").to_string()
}

/// Remove newline characters from scraped text
pub fn strip_newlines(text: &str) -> String {
    text.replace(['\n', '\r'], "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_normalize_terms_collapses_case_duplicates() {
        let terms = normalize_terms(["Rust Developer", "rust developer", "RUST DEVELOPER", "Go"]);
        assert_eq!(terms.len(), 2);
        assert!(terms.contains("rust developer"));
        assert!(terms.contains("go"));
    }

    #[test]
    fn test_normalize_terms_set_semantics() {
        let terms = normalize_terms(["qa", "qa"]);
        assert_eq!(terms.len(), 1);
    }

    #[test]
    fn test_normalize_terms_drops_blank_positions() {
        let terms = normalize_terms(["", "   ", "devops"]);
        assert_eq!(terms.into_iter().collect::<Vec<_>>(), vec!["devops"]);
    }

    #[test]
    fn test_normalize_terms_keeps_inner_whitespace_distinct() {
        let terms = normalize_terms(["data engineer", "data  engineer"]);
        assert_eq!(terms.len(), 2);
    }

    #[test]
    fn test_encode_term() {
        assert_eq!(encode_term("rust developer"), "rust%20developer");
        assert_eq!(encode_term("c++"), "c%2B%2B");
    }

    #[test]
    fn test_encode_term_keeps_slash() {
        assert_eq!(encode_term("ui/ux"), "ui/ux");
        assert_eq!(encode_term("ui / ux designer"), "ui%20/%20ux%20designer");
    }

    #[test]
    fn test_search_url() {
        let url = search_url(
            "https://www.indeed.com/jobs?q={term}&fromage=1",
            "site reliability",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://www.indeed.com/jobs?q=site%20reliability&fromage=1"
        );
    }

    #[test]
    fn test_search_url_requires_placeholder() {
        assert!(search_url("https://www.indeed.com/jobs", "rust").is_err());
    }

    #[test]
    fn test_diagnostic_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(diagnostic_timestamp(&at), "20240309-070501");
    }

    #[test]
    fn test_strip_newlines() {
        assert_eq!(strip_newlines("Austin,\nTX"), "Austin,TX");
    }
}
