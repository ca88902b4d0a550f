use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored article as exposed to the query/API layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub source: String,
    pub content: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// An article proposed for insertion. The store assigns `id` and `created_at`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub url: String,
    pub source: String,
    pub content: String,
    pub summary: String,
}

impl NewArticle {
    pub fn into_article(self, id: i64, created_at: DateTime<Utc>) -> Article {
        Article {
            id,
            title: self.title,
            url: self.url,
            source: self.source,
            content: self.content,
            summary: self.summary,
            created_at,
            updated_at: None,
        }
    }
}

/// Plain metric events. Aggregation and exposition belong to the exporter.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricEvent {
    Request {
        method: String,
        endpoint: String,
        status_code: u16,
        duration: Duration,
    },
    Source {
        source: String,
        duration: Duration,
    },
    ArticlesProcessed {
        source: String,
        count: usize,
    },
    DbOperation {
        operation: String,
        duration: Duration,
    },
    Run {
        duration: Duration,
        sources: usize,
        inserted: usize,
    },
}

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricEvent);

    fn record_request(&self, method: &str, endpoint: &str, status_code: u16, duration: Duration) {
        self.record(MetricEvent::Request {
            method: method.to_owned(),
            endpoint: endpoint.to_owned(),
            status_code,
            duration,
        });
    }

    fn record_source(&self, source: &str, duration: Duration) {
        self.record(MetricEvent::Source {
            source: source.to_owned(),
            duration,
        });
    }

    fn record_db_operation(&self, operation: &str, duration: Duration) {
        self.record(MetricEvent::DbOperation {
            operation: operation.to_owned(),
            duration,
        });
    }
}

// Object style note:
// The trigger is fire-and-forget from the caller's point of view. The
// implementation decides whether an overlapping request starts a run or is
// absorbed by the one already in flight.
pub trait IngestTrigger: Send + Sync {
    fn trigger(&self);
}
