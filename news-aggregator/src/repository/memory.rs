use super::{ArticleRepository, ArticleSession};
use crate::types::{Article, InsertOutcome, NewArticle, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Store {
    articles: Vec<Article>,
    next_id: i64,
}

impl Store {
    fn contains(&self, url: &str) -> bool {
        self.articles.iter().any(|a| a.url == url)
    }
}

/// Process-local repository, used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemoryArticleRepository {
    store: Arc<Mutex<Store>>,
}

impl MemoryArticleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed articles in insertion order.
    pub async fn articles(&self) -> Vec<Article> {
        self.store.lock().await.articles.clone()
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.articles.len()
    }
}

#[async_trait]
impl ArticleRepository for MemoryArticleRepository {
    async fn session(&self) -> Result<Box<dyn ArticleSession>> {
        Ok(Box::new(MemorySession {
            store: self.store.clone(),
            staged: Vec::new(),
        }))
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Article>> {
        let store = self.store.lock().await;
        Ok(store.articles.iter().find(|a| a.url == url).cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Article>> {
        let store = self.store.lock().await;
        Ok(newest_first(store.articles.iter(), limit))
    }

    async fn by_source(&self, source: &str, limit: usize) -> Result<Vec<Article>> {
        let store = self.store.lock().await;
        Ok(newest_first(
            store.articles.iter().filter(|a| a.source == source),
            limit,
        ))
    }
}

fn newest_first<'a>(articles: impl Iterator<Item = &'a Article>, limit: usize) -> Vec<Article> {
    let mut selected: Vec<Article> = articles.cloned().collect();
    selected.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    selected.truncate(limit);
    selected
}

/// Staged rows are invisible to other sessions until commit.
struct MemorySession {
    store: Arc<Mutex<Store>>,
    staged: Vec<Article>,
}

#[async_trait]
impl ArticleSession for MemorySession {
    async fn exists(&mut self, url: &str) -> Result<bool> {
        if self.staged.iter().any(|a| a.url == url) {
            return Ok(true);
        }
        Ok(self.store.lock().await.contains(url))
    }

    async fn insert(&mut self, article: NewArticle) -> Result<InsertOutcome> {
        if self.exists(&article.url).await? {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let id = {
            let mut store = self.store.lock().await;
            store.next_id += 1;
            store.next_id
        };
        let stored = article.into_article(id, Utc::now());
        self.staged.push(stored.clone());
        Ok(InsertOutcome::Inserted(stored))
    }

    async fn commit(&mut self) -> Result<usize> {
        let mut store = self.store.lock().await;
        let mut dropped = 0;
        for article in self.staged.drain(..) {
            // a concurrent session may have committed the same url first
            if store.contains(&article.url) {
                debug!("Dropping staged duplicate {}", article.url);
                dropped += 1;
                continue;
            }
            store.articles.push(article);
        }
        Ok(dropped)
    }

    async fn rollback(&mut self) -> Result<()> {
        self.staged.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(url: &str, source: &str) -> NewArticle {
        NewArticle {
            title: format!("Title for {}", url),
            url: url.to_string(),
            source: source.to_string(),
            content: "Body.".to_string(),
            summary: "Body.".to_string(),
        }
    }

    #[tokio::test]
    async fn commit_makes_batch_visible() {
        let repo = MemoryArticleRepository::new();
        let mut session = repo.session().await.unwrap();

        let outcome = session.insert(article("https://a/1", "a")).await.unwrap();
        assert!(matches!(outcome, InsertOutcome::Inserted(ref a) if a.id == 1));
        assert!(session.exists("https://a/1").await.unwrap());
        assert_eq!(repo.find_by_url("https://a/1").await.unwrap(), None);

        session.commit().await.unwrap();
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn rollback_discards_batch() {
        let repo = MemoryArticleRepository::new();
        let mut session = repo.session().await.unwrap();
        session.insert(article("https://a/1", "a")).await.unwrap();
        session.rollback().await.unwrap();
        session.commit().await.unwrap();

        assert_eq!(repo.len().await, 0);
    }

    #[tokio::test]
    async fn dropped_session_discards_batch() {
        let repo = MemoryArticleRepository::new();
        {
            let mut session = repo.session().await.unwrap();
            session.insert(article("https://a/1", "a")).await.unwrap();
        }
        assert_eq!(repo.len().await, 0);
    }

    #[tokio::test]
    async fn duplicate_url_is_reported_not_stored() {
        let repo = MemoryArticleRepository::new();
        let mut session = repo.session().await.unwrap();
        session.insert(article("https://a/1", "a")).await.unwrap();
        session.commit().await.unwrap();

        let outcome = session.insert(article("https://a/1", "b")).await.unwrap();
        assert_eq!(outcome, InsertOutcome::AlreadyExists);
        session.commit().await.unwrap();
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_sessions_keep_urls_unique() {
        let repo = MemoryArticleRepository::new();
        let mut first = repo.session().await.unwrap();
        let mut second = repo.session().await.unwrap();

        first.insert(article("https://a/1", "a")).await.unwrap();
        second.insert(article("https://a/1", "a")).await.unwrap();
        second.insert(article("https://a/2", "a")).await.unwrap();
        assert_eq!(first.commit().await.unwrap(), 0);
        assert_eq!(second.commit().await.unwrap(), 1);

        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn reads_are_newest_first_and_filtered() {
        let repo = MemoryArticleRepository::new();
        let mut session = repo.session().await.unwrap();
        for (url, source) in [("https://a/1", "a"), ("https://b/1", "b"), ("https://a/2", "a")] {
            session.insert(article(url, source)).await.unwrap();
        }
        session.commit().await.unwrap();

        let recent: Vec<String> = repo.recent(2).await.unwrap().into_iter().map(|a| a.url).collect();
        assert_eq!(recent, vec!["https://a/2", "https://b/1"]);

        let by_a: Vec<String> = repo
            .by_source("a", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.url)
            .collect();
        assert_eq!(by_a, vec!["https://a/2", "https://a/1"]);
    }
}
