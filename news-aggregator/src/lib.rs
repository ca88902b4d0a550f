pub mod types;
pub mod config;
pub mod logging;
pub mod fetcher;
pub mod parser;
pub mod feed_reader;
pub mod extraction;
pub mod summarizer;
pub mod cache;
pub mod repository;
pub mod metrics;
pub mod pipeline;
pub mod scheduler;
pub mod query;

pub use types::*;
pub use cache::{KeyValueStore, MemoryStore, RedisStore, SummaryCache};
pub use config::{AppConfig, SourceRegistry, SourceSpec};
pub use extraction::{ContentExtractor, ExtractionRule, RuleRegistry};
pub use feed_reader::FeedReader;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use pipeline::{IngestionOrchestrator, RunReport, SourceOutcome, SourceReport};
pub use query::ArticleQuery;
pub use repository::{ArticleRepository, ArticleSession, MemoryArticleRepository, PgArticleRepository};
pub use scheduler::{IngestionHandle, Scheduler};
pub use summarizer::TextRankSummarizer;
