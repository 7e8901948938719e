use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::PersistenceError;
use crate::article::Article;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn get_article(&self, id: Uuid) -> Result<Option<Article>, PersistenceError>;

    /// Inserts or replaces the article with the same id
    async fn put_article(&self, article: &Article) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default)]
pub struct InMemoryArticleStore {
    articles: RwLock<HashMap<Uuid, Article>>,
}

impl InMemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        Self {
            articles: RwLock::new(articles.into_iter().map(|a| (a.id, a)).collect()),
        }
    }
}

#[async_trait]
impl ArticleStore for InMemoryArticleStore {
    async fn get_article(&self, id: Uuid) -> Result<Option<Article>, PersistenceError> {
        Ok(self.articles.read().await.get(&id).cloned())
    }

    async fn put_article(&self, article: &Article) -> Result<(), PersistenceError> {
        self.articles
            .write()
            .await
            .insert(article.id, article.clone());
        Ok(())
    }
}
