//! News source directory
//!
//! Source verification and fact checking can consult a directory of known news
//! outlets through [`SourceDirectory`]. [`NewsApiClient`] backs it with
//! NewsAPI; [`StaticSourceDirectory`] answers from fixed data in tests and
//! offline runs.

mod mock;
mod newsapi;

pub use mock::StaticSourceDirectory;
pub use newsapi::{NewsApiClient, SearchQuery, NEWSAPI_BASE_URL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::BackendError;

/// What the directory knows about a publishing domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: Option<String>,
    pub name: String,
    pub domain: String,
    pub url: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    /// Listed as a source by the directory, not merely seen in its article index
    pub is_verified: bool,
    /// Indexed articles from the domain, for unlisted domains
    pub article_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedArticle {
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_at: Option<String>,
    pub description: Option<String>,
}

#[async_trait]
pub trait SourceDirectory: Send + Sync {
    fn name(&self) -> &str;

    /// Looks up a domain. `Ok(None)` means the directory has never seen it.
    async fn verify_source(&self, domain: &str) -> Result<Option<SourceRecord>, BackendError>;

    /// Coverage of the same story by other outlets, most relevant first
    async fn find_related_articles(
        &self,
        title: &str,
        max_results: usize,
    ) -> Result<Vec<RelatedArticle>, BackendError>;
}

/// Lowercased host without a leading `www.`. Accepts bare domains and full URLs.
pub fn normalize_domain(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let host = if trimmed.contains("://") {
        reqwest::Url::parse(trimmed).ok()?.host_str()?.to_string()
    } else {
        let authority = trimmed.split(&['/', '?', '#'][..]).next().unwrap_or_default();
        authority.split(':').next().unwrap_or_default().to_string()
    };

    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).trim_end_matches('.');
    (!host.is_empty()).then(|| host.to_string())
}

/// Query built from the first words of a headline
pub fn headline_query(title: &str) -> String {
    title.split_whitespace().take(5).collect::<Vec<_>>().join(" ")
}
