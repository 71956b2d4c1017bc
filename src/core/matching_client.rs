// src/core/matching_client.rs
//! HTTP client for the matching service that decides what to search for

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::core::config_manager::MatchingConfig;
use crate::types::MatchingCriterion;

/// Source of matching criteria for one producer cycle
#[async_trait]
pub trait CriteriaSource: Send + Sync {
    async fn fetch_criteria(&self) -> Result<Vec<MatchingCriterion>>;
}

pub struct MatchingClient {
    client: reqwest::Client,
    url: String,
}

impl MatchingClient {
    pub fn new(config: &MatchingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl CriteriaSource for MatchingClient {
    async fn fetch_criteria(&self) -> Result<Vec<MatchingCriterion>> {
        info!("Retrieving matching terms from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to GET from {}", self.url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read matching response body")?;

        if !status.is_success() {
            error!("Matching service error {}: {}", status, body);
            anyhow::bail!("Matching service returned error {}: {}", status, body);
        }

        let criteria = decode_criteria(&body)?;
        debug!("Matching service returned {} criteria", criteria.len());
        Ok(criteria)
    }
}

/// Strictly decode the matching payload: a JSON array of
/// `{position: string, prompt: string, user: integer}`
pub fn decode_criteria(body: &str) -> Result<Vec<MatchingCriterion>> {
    serde_json::from_str::<Vec<MatchingCriterion>>(body).with_context(|| {
        format!(
            "Matching response does not match schema. Raw response: {}",
            body
        )
    })
}
