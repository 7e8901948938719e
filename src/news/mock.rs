use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{normalize_domain, RelatedArticle, SourceDirectory, SourceRecord};
use crate::llm::BackendError;

/// Directory answering from fixed records; remembers the domains it was asked about
#[derive(Default)]
pub struct StaticSourceDirectory {
    sources: HashMap<String, SourceRecord>,
    related: Vec<RelatedArticle>,
    failure: Option<BackendError>,
    lookups: Mutex<Vec<String>>,
}

impl StaticSourceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists `name` under `domain` as a verified source
    pub fn with_source(mut self, domain: &str, name: &str) -> Self {
        let domain = normalize_domain(domain).unwrap_or_else(|| domain.to_string());
        self.sources.insert(
            domain.clone(),
            SourceRecord {
                id: Some(name.to_lowercase().replace(' ', "-")),
                name: name.to_string(),
                url: Some(format!("https://{}", domain)),
                domain,
                category: Some("general".to_string()),
                language: Some("en".to_string()),
                country: None,
                is_verified: true,
                article_count: None,
            },
        );
        self
    }

    /// Knows `domain` only through `article_count` indexed articles
    pub fn with_unlisted(mut self, domain: &str, article_count: u64) -> Self {
        let domain = normalize_domain(domain).unwrap_or_else(|| domain.to_string());
        self.sources.insert(
            domain.clone(),
            SourceRecord {
                id: None,
                name: domain.clone(),
                url: Some(format!("https://{}", domain)),
                domain,
                category: None,
                language: None,
                country: None,
                is_verified: false,
                article_count: Some(article_count),
            },
        );
        self
    }

    pub fn with_related(mut self, article: RelatedArticle) -> Self {
        self.related.push(article);
        self
    }

    /// Every call fails with `error`
    pub fn failing(error: BackendError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceDirectory for StaticSourceDirectory {
    fn name(&self) -> &str {
        "static"
    }

    async fn verify_source(&self, domain: &str) -> Result<Option<SourceRecord>, BackendError> {
        self.lookups.lock().unwrap().push(domain.to_string());
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(normalize_domain(domain).and_then(|d| self.sources.get(&d).cloned()))
    }

    async fn find_related_articles(
        &self,
        _title: &str,
        max_results: usize,
    ) -> Result<Vec<RelatedArticle>, BackendError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(self.related.iter().take(max_results).cloned().collect())
    }
}
