use crate::types::{AggregatorError, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

/// A news source: short identifier plus the feed it publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub id: String,
    pub feed_url: String,
}

impl SourceSpec {
    pub fn new(id: impl Into<String>, feed_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            feed_url: feed_url.into(),
        }
    }
}

impl FromStr for SourceSpec {
    type Err = AggregatorError;

    /// Parses `id=url`.
    fn from_str(s: &str) -> Result<Self> {
        let (id, url) = s
            .split_once('=')
            .ok_or_else(|| AggregatorError::General(format!("expected id=url, got {:?}", s)))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(AggregatorError::General("source id must not be empty".to_string()));
        }
        let url = Url::parse(url.trim())?;
        Ok(Self::new(id, url.as_str()))
    }
}

/// Ordered set of sources. Registering an existing id replaces its feed url
/// in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    sources: Vec<SourceSpec>,
}

impl SourceRegistry {
    pub fn empty() -> Self {
        Self { sources: Vec::new() }
    }

    pub fn register(&mut self, spec: SourceSpec) {
        match self.sources.iter_mut().find(|s| s.id == spec.id) {
            Some(existing) => existing.feed_url = spec.feed_url,
            None => self.sources.push(spec),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceSpec> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(SourceSpec::new("cnn", "http://rss.cnn.com/rss/cnn_topstories.rss"));
        registry.register(SourceSpec::new("bbc", "http://feeds.bbci.co.uk/news/rss.xml"));
        registry
    }
}

impl FromIterator<SourceSpec> for SourceRegistry {
    fn from_iter<I: IntoIterator<Item = SourceSpec>>(iter: I) -> Self {
        let mut registry = Self::empty();
        for spec in iter {
            registry.register(spec);
        }
        registry
    }
}

#[derive(Debug, Parser)]
#[command(name = "news-aggregator", about = "Fetch, summarize and store news articles")]
pub struct AppConfig {
    /// PostgreSQL connection string. Articles are kept in memory when unset.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Redis connection string for the summary cache. Falls back to an
    /// in-process cache when unset or unreachable.
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Seconds between ingestion runs.
    #[arg(long, env = "INGEST_INTERVAL_SECS", default_value_t = 300)]
    pub interval_secs: u64,

    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 3600)]
    pub cache_ttl_secs: u64,

    /// Fraction of sentences kept in a summary.
    #[arg(long, default_value_t = 0.2)]
    pub compression_ratio: f64,

    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Extra source as `id=url`; may be repeated.
    #[arg(long = "source", value_name = "ID=URL")]
    pub sources: Vec<SourceSpec>,

    /// Only use sources given with --source.
    #[arg(long)]
    pub no_default_sources: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest on a fixed interval until interrupted.
    Run,
    /// Ingest once and print the report.
    Once,
    /// Look up the stored summary for an article url.
    Summary { url: String },
}

impl AppConfig {
    pub fn source_registry(&self) -> SourceRegistry {
        let mut registry = if self.no_default_sources {
            SourceRegistry::empty()
        } else {
            SourceRegistry::default()
        };
        for spec in &self.sources {
            registry.register(spec.clone());
        }
        registry
    }
}
