use super::{ArticleRepository, ArticleSession};
use crate::types::{AggregatorError, Article, InsertOutcome, NewArticle, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};
use std::time::Duration;
use tracing::{debug, info, warn};

const TITLE_MAX_CHARS: usize = 300;
const SOURCE_MAX_CHARS: usize = 50;

const ARTICLE_COLUMNS: &str = "id, title, url, source, content, summary, created_at, updated_at";

#[derive(Clone)]
pub struct PgArticleRepository {
    db: PgPool,
}

impl PgArticleRepository {
    /// Connect, retrying with exponential backoff up to `max_attempts` times.
    pub async fn connect(database_url: &str, max_attempts: u32) -> Result<Self> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_millis(500),
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(16),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        };

        let mut attempt = 1;
        loop {
            match PgPool::connect(database_url).await {
                Ok(db) => {
                    info!("Connected to database after {} attempt(s)", attempt);
                    return Ok(Self { db });
                }
                Err(e) if attempt < max_attempts => {
                    let Some(delay) = backoff.next_backoff() else {
                        return Err(e.into());
                    };
                    warn!("Database connect attempt {} failed, retrying in {:?}: {}", attempt, delay, e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id BIGSERIAL PRIMARY KEY,
                title VARCHAR(300) NOT NULL,
                url TEXT NOT NULL UNIQUE,
                source VARCHAR(50) NOT NULL,
                content TEXT,
                summary TEXT,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS ix_articles_source_created_at ON articles (source, created_at)",
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS ix_articles_created_at ON articles (created_at)")
            .execute(&self.db)
            .await?;

        debug!("Article schema ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

#[async_trait]
impl ArticleRepository for PgArticleRepository {
    async fn session(&self) -> Result<Box<dyn ArticleSession>> {
        Ok(Box::new(PgArticleSession {
            db: self.db.clone(),
            tx: None,
        }))
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Article>> {
        let row = sqlx::query(&format!("SELECT {} FROM articles WHERE url = $1", ARTICLE_COLUMNS))
            .bind(url)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Article>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM articles ORDER BY created_at DESC, id DESC LIMIT $1",
            ARTICLE_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(article_from_row).collect()
    }

    async fn by_source(&self, source: &str, limit: usize) -> Result<Vec<Article>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM articles WHERE source = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
            ARTICLE_COLUMNS
        ))
        .bind(source)
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(article_from_row).collect()
    }
}

/// One transaction per batch, begun on first use. Dropping an open
/// transaction rolls it back.
struct PgArticleSession {
    db: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgArticleSession {
    async fn transaction(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        if self.tx.is_none() {
            self.tx = Some(self.db.begin().await?);
        }
        self.tx
            .as_mut()
            .ok_or_else(|| AggregatorError::Persistence("transaction not open".to_string()))
    }
}

#[async_trait]
impl ArticleSession for PgArticleSession {
    async fn exists(&mut self, url: &str) -> Result<bool> {
        let tx = self.transaction().await?;
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM articles WHERE url = $1) AS found")
            .bind(url)
            .fetch_one(&mut **tx)
            .await?;
        Ok(row.try_get("found")?)
    }

    async fn insert(&mut self, article: NewArticle) -> Result<InsertOutcome> {
        let tx = self.transaction().await?;
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO articles (title, url, source, content, summary)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (url) DO NOTHING
            RETURNING {}
            "#,
            ARTICLE_COLUMNS
        ))
        .bind(truncate_chars(&article.title, TITLE_MAX_CHARS))
        .bind(&article.url)
        .bind(truncate_chars(&article.source, SOURCE_MAX_CHARS))
        .bind(&article.content)
        .bind(&article.summary)
        .fetch_optional(&mut **tx)
        .await?;

        match row {
            Some(row) => Ok(InsertOutcome::Inserted(article_from_row(&row)?)),
            None => {
                debug!("Article already stored: {}", article.url);
                Ok(InsertOutcome::AlreadyExists)
            }
        }
    }

    /// Conflicts surface at insert time through `ON CONFLICT`, so nothing is
    /// ever dropped here.
    async fn commit(&mut self) -> Result<usize> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(0)
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

fn article_from_row(row: &PgRow) -> Result<Article> {
    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        source: row.try_get("source")?,
        content: row.try_get::<Option<String>, _>("content")?.unwrap_or_default(),
        summary: row.try_get::<Option<String>, _>("summary")?.unwrap_or_default(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
    })
}

fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 300), "short");
        assert_eq!(truncate_chars("", 3), "");
    }
}
