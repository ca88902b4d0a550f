use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
// Contract types shared with the query layer and the metrics exporter
pub use interfaces::defs::{Article, IngestTrigger, MetricEvent, MetricsSink, NewArticle};

/// Candidate entry read from a syndication feed. Never persisted directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub title: String,
    pub url: String,
    pub published: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_entries: usize,
    pub max_redirects: usize,
    pub host_interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Briefed-NewsAggregator/1.0".to_string(),
            timeout_seconds: 10,
            max_entries: 10,
            max_redirects: 5,
            host_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub compression_ratio: f64,
    pub damping: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            compression_ratio: 0.2,
            damping: 0.85,
            tolerance: 1.0e-6,
            max_iterations: 100,
        }
    }
}

/// Outcome of proposing an article to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Article),
    /// The url is already stored, either from an earlier run or a concurrent insert.
    AlreadyExists,
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed read error: {0}")]
    FeedRead(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Summarization error: {0}")]
    Summarization(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
