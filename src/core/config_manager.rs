// src/core/config_manager.rs
//! Unified configuration management - defaults, config.yaml, then environment

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::FsOps;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) KHTML, like Gecko";
const DEFAULT_JOBS_URL: &str = "https://www.indeed.com/jobs?q={term}&fromage=1";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigManager {
    pub environment: String,
    pub broker: BrokerConfig,
    pub matching: MatchingConfig,
    pub scraper: ScraperConfig,
    pub producer: ProducerConfig,
    pub worker: WorkerConfig,
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub url: String,
    pub stream: String,
    pub subject: String,
    pub consumer: String,
    pub max_deliver: i64,
    pub ack_wait_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Search URL template containing a `{term}` placeholder
    pub jobs_url: String,
    /// Headless browser with a fixed user agent
    pub production: bool,
    pub user_agent: String,
    pub challenge_wait: ChallengeWaitConfig,
    pub pacing_min_secs: u64,
    pub pacing_max_secs: u64,
    pub task_deadline_secs: u64,
    pub chrome_executable: Option<PathBuf>,
}

/// How to wait out the anti-automation challenge after navigation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ChallengeWaitConfig {
    Fixed { delay_secs: u64 },
    Poll { interval_secs: u64, timeout_secs: u64 },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub level: String,
    pub max_bytes: u64,
    pub backup_count: usize,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    local: Option<serde_yaml::Value>,
    production: Option<serde_yaml::Value>,
}

// ===== Defaults =====

impl Default for ConfigManager {
    fn default() -> Self {
        Self {
            environment: "local".to_string(),
            broker: BrokerConfig::default(),
            matching: MatchingConfig::default(),
            scraper: ScraperConfig::default(),
            producer: ProducerConfig::default(),
            worker: WorkerConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            stream: "JOB_SCOUT_TASKS".to_string(),
            subject: "job_scout.tasks.pull_jobs".to_string(),
            consumer: "pull-jobs-workers".to_string(),
            max_deliver: 3,
            ack_wait_secs: 30 * 60,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/api/matching".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            jobs_url: DEFAULT_JOBS_URL.to_string(),
            production: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            challenge_wait: ChallengeWaitConfig::default(),
            pacing_min_secs: 2,
            pacing_max_secs: 8,
            task_deadline_secs: 15 * 60,
            chrome_executable: None,
        }
    }
}

impl Default for ChallengeWaitConfig {
    fn default() -> Self {
        ChallengeWaitConfig::Fixed { delay_secs: 10 }
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1200,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            level: "debug".to_string(),
            max_bytes: 16 * 1024 * 1024,
            backup_count: 5,
        }
    }
}

// ===== Loading =====

impl ConfigManager {
    /// Load all configuration: defaults, then `config.yaml` if present, then environment
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();

        let mut config = Self::load_from_file(Path::new("config.yaml"), &environment)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn get_environment() -> String {
        std::env::var("JOB_SCOUT_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    /// Read the section matching `environment` from a YAML file with
    /// `local:` and `production:` keys. A missing file yields defaults.
    pub fn load_from_file(path: &Path, environment: &str) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Self::from_yaml(&content, environment)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        config.environment = environment.to_string();
        if environment == "production" && !path.exists() {
            config.scraper.production = true;
        }
        Ok(config)
    }

    fn from_yaml(content: &str, environment: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        let section = match environment {
            "production" => file.production,
            _ => file.local,
        };

        match section {
            Some(value) => {
                let mut config: ConfigManager = serde_yaml::from_value(value.clone())?;
                // A production section without an explicit flag runs headless
                let has_flag = value
                    .get("scraper")
                    .and_then(|s| s.get("production"))
                    .is_some();
                if environment == "production" && !has_flag {
                    config.scraper.production = true;
                }
                Ok(config)
            }
            None => {
                let mut config = Self::default();
                config.scraper.production = environment == "production";
                Ok(config)
            }
        }
    }

    /// Apply environment variable overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BROKER_URL") {
            self.broker.url = v;
        }
        if let Some(v) = lookup("MATCHING_URL") {
            self.matching.url = v;
        }
        if let Some(v) = lookup("JOBS_URL") {
            self.scraper.jobs_url = v;
        }
        if let Some(v) = lookup("PRODUCTION") {
            self.scraper.production = parse_bool(&v)
                .with_context(|| format!("PRODUCTION must be a boolean, got '{}'", v))?;
        }
        if let Some(v) = lookup("USER_AGENT") {
            self.scraper.user_agent = v;
        }
        if let Some(v) = lookup("CHROME_EXECUTABLE") {
            self.scraper.chrome_executable = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("TASK_DEADLINE_SECS") {
            self.scraper.task_deadline_secs = v
                .parse()
                .context("TASK_DEADLINE_SECS must be a number of seconds")?;
        }
        if let Some(v) = lookup("LOOP_TIME") {
            self.producer.interval_secs = v
                .parse()
                .context("LOOP_TIME must be a number of seconds")?;
        }
        if let Some(v) = lookup("WORKER_CONCURRENCY") {
            self.worker.concurrency = v
                .parse()
                .context("WORKER_CONCURRENCY must be a positive integer")?;
        }
        if let Some(v) = lookup("LOG_DIR") {
            self.logging.dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("LOG_MAX_BYTES") {
            self.logging.max_bytes = v.parse().context("LOG_MAX_BYTES must be a number")?;
        }
        if let Some(v) = lookup("LOG_BACKUP_COUNT") {
            self.logging.backup_count =
                v.parse().context("LOG_BACKUP_COUNT must be a number")?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        crate::utils::search_url(&self.scraper.jobs_url, "validate")
            .context("Invalid JOBS_URL")?;

        if self.scraper.pacing_min_secs > self.scraper.pacing_max_secs {
            anyhow::bail!(
                "Pacing range is empty: min {}s > max {}s",
                self.scraper.pacing_min_secs,
                self.scraper.pacing_max_secs
            );
        }
        if self.worker.concurrency == 0 {
            anyhow::bail!("Worker concurrency must be at least 1");
        }
        if self.producer.interval_secs == 0 {
            anyhow::bail!("Producer interval must be greater than zero");
        }
        Ok(())
    }

    /// Ensure all required directories exist
    pub async fn ensure_directories(&self) -> Result<()> {
        FsOps::ensure_dir_exists(&self.logging.dir).await
    }
}

impl ScraperConfig {
    pub fn task_deadline(&self) -> Duration {
        Duration::from_secs(self.task_deadline_secs)
    }
}

impl ProducerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("not a boolean: {}", other),
    }
}
