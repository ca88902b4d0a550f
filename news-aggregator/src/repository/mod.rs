pub mod memory;
pub mod postgres;

pub use memory::MemoryArticleRepository;
pub use postgres::PgArticleRepository;

use crate::types::{Article, InsertOutcome, NewArticle, Result};
use async_trait::async_trait;

/// Deduplicated article storage. The url is the unique key.
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Open a session for one ingestion run. Dropping the session rolls back
    /// any batch that was not committed.
    async fn session(&self) -> Result<Box<dyn ArticleSession>>;

    async fn find_by_url(&self, url: &str) -> Result<Option<Article>>;

    /// Newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<Article>>;

    /// Newest first.
    async fn by_source(&self, source: &str, limit: usize) -> Result<Vec<Article>>;
}

/// Write side of one run. A batch opens implicitly on first use and ends with
/// `commit` or `rollback`.
///
/// `exists` followed by `insert` is not atomic across sessions; a url that
/// lands in between comes back as [`InsertOutcome::AlreadyExists`].
#[async_trait]
pub trait ArticleSession: Send {
    /// True if `url` is stored or staged in the current batch.
    async fn exists(&mut self, url: &str) -> Result<bool>;

    async fn insert(&mut self, article: NewArticle) -> Result<InsertOutcome>;

    /// Returns how many staged rows were discarded because another session
    /// committed the same url first. Those rows were reported as
    /// [`InsertOutcome::Inserted`] by `insert`.
    async fn commit(&mut self) -> Result<usize>;

    async fn rollback(&mut self) -> Result<()>;
}
