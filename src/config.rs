//! Runtime configuration.
//!
//! Everything has a default that reproduces the stock PR Newswire supply
//! chain crawl, so the YAML file is optional. A partial file only overrides
//! the keys it names:
//!
//! ```yaml
//! seeds:
//!   - https://www.prnewswire.com/news-releases/consumer-technology-latest-news/supply-chain-logistics-list/?page=1&pagesize=25
//! concurrency: 4
//! llm:
//!   model: gpt-4o-mini
//! ```

use crate::error::CrawlError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for a crawl session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listing pages to start from. Each one starts its own pagination chain.
    pub seeds: Vec<String>,
    /// Hosts the crawl may follow links into. Empty allows every host.
    pub allowed_domains: Vec<String>,
    /// Maximum number of detail pages in flight.
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    /// Extra attempts for a page that failed transiently.
    pub fetch_retries: usize,
    pub user_agent: String,
    pub llm: LlmConfig,
}

/// Settings for the OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_base: String,
    /// Usually supplied through `OPENAI_API_KEY` instead.
    pub api_key: Option<String>,
    /// Model used for classification and top-k selection.
    pub model: String,
    /// Model used for digest narratives.
    pub narrative_model: String,
    pub classify_max_tokens: u32,
    pub select_max_tokens: u32,
    pub narrative_max_tokens: u32,
    /// Body characters sent along with a title for classification.
    pub body_char_limit: usize,
    pub max_retries: usize,
    /// Labels offered to the model when classifying.
    pub categories: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            seeds: vec![
                "https://www.prnewswire.com/news-releases/consumer-technology-latest-news/supply-chain-logistics-list/?page=1&pagesize=25".to_string(),
                "https://www.prnewswire.com/news-releases/consumer-technology-latest-news/supply-chain-logistics-list/?page=2&pagesize=25".to_string(),
            ],
            allowed_domains: vec!["prnewswire.com".to_string()],
            concurrency: 8,
            request_timeout_secs: 30,
            fetch_retries: 2,
            user_agent: concat!("pr_news_digest/", env!("CARGO_PKG_VERSION")).to_string(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            narrative_model: "gpt-4-turbo".to_string(),
            classify_max_tokens: 400,
            select_max_tokens: 300,
            narrative_max_tokens: 400,
            body_char_limit: 2000,
            max_retries: 5,
            categories: CATEGORY_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    /// Load a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CrawlError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, CrawlError> {
        let config: Config =
            serde_yaml::from_str(contents).map_err(|e| CrawlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.seeds.is_empty() {
            return Err(CrawlError::Config("at least one seed URL is required".into()));
        }
        for seed in &self.seeds {
            url::Url::parse(seed)
                .map_err(|e| CrawlError::Config(format!("seed {seed:?} is not a URL: {e}")))?;
        }
        if self.concurrency == 0 {
            return Err(CrawlError::Config("concurrency must be at least 1".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Controlled vocabulary offered to the classifier. The model may still
/// answer with labels outside it.
pub const CATEGORY_LABELS: &[&str] = &[
    "Retail & E-commerce",
    "Manufacturing & Industrial",
    "Pharmaceutical & Healthcare Supply Chain",
    "Food & Agriculture Logistics",
    "Energy & Commodities Transport",
    "Technology & AI in Supply Chain",
    "Shipping & Freight",
    "Warehousing & Distribution",
    "Transportation & Freight Management",
    "Procurement & Sourcing",
    "Inventory Management",
    "Last-Mile Delivery",
    "Reverse Logistics & Returns Management",
    "AI & Automation in Supply Chain",
    "Blockchain & Transparency Solutions",
    "IoT & Smart Logistics",
    "Autonomous Vehicle & Self-driving Trucks",
    "CHIPS Act & Semiconductor Supply Chain",
    "USMCA, Nearshoring & Friendshoring Trends",
    "Environmental & Sustainable Regulations",
    "Cybersecurity & Supply Chain Resilience",
    "Trade Tariffs & Geopolitical Shifts",
    "M&A",
    "New Partnerships & Collaborations",
    "Supply Chain Disruptions & Risk Management",
    "Investment & Expansion News",
    "Bankruptcies & Business Closures",
    "ESG",
    "North America",
    "Europe",
    "Asia-Pacific",
    "Latin America",
    "Middle East & Africa",
];
