pub mod defs;

pub use defs::{Article, IngestTrigger, MetricEvent, MetricsSink, NewArticle};
