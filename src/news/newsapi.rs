//! NewsAPI HTTP client
//!
//! Uses the `/top-headlines/sources` listing to recognise established outlets
//! and `/everything` for domain activity and related coverage.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::{headline_query, normalize_domain, RelatedArticle, SourceDirectory, SourceRecord};
use crate::llm::BackendError;

pub const NEWSAPI_BASE_URL: &str = "https://newsapi.org/v2";

const MAX_PAGE_SIZE: u32 = 100;
const MAX_RELATED: usize = 10;

/// Parameters for the `/everything` endpoint
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub domains: Vec<String>,
    pub language: Option<String>,
    pub sort_by: Option<String>,
    pub page_size: u32,
}

impl SearchQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![(
            "pageSize",
            self.page_size.clamp(1, MAX_PAGE_SIZE).to_string(),
        )];
        if let Some(q) = self.query.as_ref().filter(|q| !q.is_empty()) {
            params.push(("q", q.clone()));
        }
        if !self.domains.is_empty() {
            params.push(("domains", self.domains.join(",")));
        }
        if let Some(language) = &self.language {
            params.push(("language", language.clone()));
        }
        if let Some(sort_by) = &self.sort_by {
            params.push(("sortBy", sort_by.clone()));
        }
        params
    }
}

#[derive(Debug, Deserialize)]
struct SourcesResponse {
    #[serde(default)]
    sources: Vec<ApiSource>,
}

#[derive(Debug, Deserialize)]
struct ApiSource {
    id: Option<String>,
    name: String,
    url: Option<String>,
    category: Option<String>,
    language: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    articles: Vec<ApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiArticle {
    source: ApiArticleSource,
    title: String,
    url: String,
    description: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiArticleSource {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

pub struct NewsApiClient {
    base_url: String,
    api_key: String,
    http_client: Client,
    timeout: Duration,
}

impl NewsApiClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, BackendError> {
        Self::with_base_url(NEWSAPI_BASE_URL.to_string(), api_key, timeout)
    }

    pub fn with_base_url(
        base_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        if api_key.trim().is_empty() {
            return Err(BackendError::ConfigurationError {
                message: "NewsAPI key must not be empty".to_string(),
            });
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("verifact/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::ConfigurationError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http_client,
            timeout,
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("NewsAPI request: {} {:?}", url, params);
        let start = Instant::now();

        let response = self
            .http_client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    error!("NewsAPI request timed out after {:?}", self.timeout);
                    BackendError::TimeoutError {
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    error!("NewsAPI request error: {}", e);
                    BackendError::NetworkError {
                        message: format!("Request failed: {}", e),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let parsed = response.json::<T>().await.map_err(|e| {
            error!("Failed to parse NewsAPI response: {}", e);
            BackendError::InvalidResponse {
                message: format!("JSON parse error: {}", e),
                raw_response: None,
            }
        })?;

        debug!(
            "NewsAPI {} answered in {:.2}s",
            endpoint,
            start.elapsed().as_secs_f64()
        );
        Ok(parsed)
    }

    async fn sources(&self) -> Result<Vec<ApiSource>, BackendError> {
        let response: SourcesResponse = self.request("/top-headlines/sources", &[]).await?;
        Ok(response.sources)
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, BackendError> {
        self.request("/everything", &query.params()).await
    }

    /// Total number of indexed articles matching `query`
    pub async fn count_articles(&self, query: &SearchQuery) -> Result<u64, BackendError> {
        Ok(self.search(query).await?.total_results)
    }
}

fn status_error(status: StatusCode, body: &str) -> BackendError {
    let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone())
        .unwrap_or_else(|| body.to_string());
    let code = parsed.and_then(|b| b.code).unwrap_or_else(|| "unknown".to_string());
    warn!("NewsAPI returned {} ({}): {}", status, code, message);

    match status {
        StatusCode::UNAUTHORIZED => BackendError::AuthenticationError { message },
        StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimitError { retry_after: None },
        _ => BackendError::ApiError {
            message: format!("NewsAPI error ({}): {}", code, message),
            status_code: Some(status.as_u16()),
        },
    }
}

#[async_trait]
impl SourceDirectory for NewsApiClient {
    fn name(&self) -> &str {
        "newsapi"
    }

    async fn verify_source(&self, domain: &str) -> Result<Option<SourceRecord>, BackendError> {
        let Some(domain) = normalize_domain(domain) else {
            return Ok(None);
        };

        for source in self.sources().await? {
            let source_domain = source.url.as_deref().and_then(normalize_domain);
            if source_domain.as_deref() == Some(domain.as_str()) {
                info!(domain = %domain, source = %source.name, "Domain is a listed news source");
                return Ok(Some(SourceRecord {
                    id: source.id,
                    name: source.name,
                    domain,
                    url: source.url,
                    category: source.category,
                    language: source.language,
                    country: source.country,
                    is_verified: true,
                    article_count: None,
                }));
            }
        }

        let activity = self
            .search(&SearchQuery {
                domains: vec![domain.clone()],
                page_size: 1,
                ..Default::default()
            })
            .await?;

        let Some(first) = activity.articles.into_iter().next() else {
            debug!(domain = %domain, "Domain unknown to NewsAPI");
            return Ok(None);
        };

        Ok(Some(SourceRecord {
            id: None,
            name: first.source.name.unwrap_or_else(|| domain.clone()),
            url: Some(format!("https://{}", domain)),
            domain,
            category: None,
            language: None,
            country: None,
            is_verified: false,
            article_count: Some(activity.total_results),
        }))
    }

    async fn find_related_articles(
        &self,
        title: &str,
        max_results: usize,
    ) -> Result<Vec<RelatedArticle>, BackendError> {
        let query = headline_query(title);
        if query.is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .search(&SearchQuery {
                query: Some(query),
                sort_by: Some("relevancy".to_string()),
                page_size: max_results.min(MAX_RELATED) as u32,
                ..Default::default()
            })
            .await?;

        Ok(response
            .articles
            .into_iter()
            .take(max_results)
            .map(|a| RelatedArticle {
                title: a.title,
                url: a.url,
                source: a.source.name.unwrap_or_else(|| "Unknown".to_string()),
                published_at: a.published_at,
                description: a.description,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves canned JSON bodies keyed by path prefix and records request lines
    async fn serve(routes: Vec<(&'static str, u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let line = request.lines().next().unwrap_or_default().to_string();
                assert!(request.to_ascii_lowercase().contains("x-api-key: test-key"));
                log.lock().unwrap().push(line.clone());

                let path = line.split_whitespace().nth(1).unwrap_or_default();
                let (status, body) = routes
                    .iter()
                    .find(|(prefix, _, _)| path.starts_with(prefix))
                    .map(|(_, status, body)| (*status, *body))
                    .unwrap_or((404, "{}"));
                let response = format!(
                    "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        (format!("http://{}", addr), seen)
    }

    fn client(base_url: String) -> NewsApiClient {
        NewsApiClient::with_base_url(base_url, "test-key".to_string(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_verify_source_matches_listed_domain() {
        let (base, seen) = serve(vec![(
            "/top-headlines/sources",
            200,
            r#"{"status":"ok","sources":[{"id":"bbc-news","name":"BBC News","url":"https://www.bbc.co.uk/news","category":"general","language":"en","country":"gb"}]}"#,
        )])
        .await;

        let record = client(base)
            .verify_source("https://www.BBC.co.uk/news/world-123")
            .await
            .unwrap()
            .unwrap();
        assert!(record.is_verified);
        assert_eq!(record.domain, "bbc.co.uk");
        assert_eq!(record.id.as_deref(), Some("bbc-news"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_verify_source_falls_back_to_article_index() {
        let (base, seen) = serve(vec![
            ("/top-headlines/sources", 200, r#"{"status":"ok","sources":[]}"#),
            (
                "/everything",
                200,
                r#"{"status":"ok","totalResults":42,"articles":[{"source":{"id":null,"name":"Local Gazette"},"title":"Council meets","url":"https://gazette.example/a","description":null,"publishedAt":"2024-05-01T10:00:00Z"}]}"#,
            ),
        ])
        .await;

        let record = client(base).verify_source("gazette.example").await.unwrap().unwrap();
        assert!(!record.is_verified);
        assert_eq!(record.name, "Local Gazette");
        assert_eq!(record.article_count, Some(42));

        let seen = seen.lock().unwrap();
        assert!(seen[1].contains("domains=gazette.example"));
        assert!(seen[1].contains("pageSize=1"));
    }

    #[tokio::test]
    async fn test_unauthorized_key_is_an_authentication_error() {
        let (base, _) = serve(vec![(
            "/everything",
            401,
            r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#,
        )])
        .await;

        let err = client(base)
            .find_related_articles("Central bank raises rates again today", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::AuthenticationError { .. }));
    }

    #[test]
    fn test_search_params() {
        let query = SearchQuery {
            query: Some("rates".to_string()),
            domains: vec!["bbc.com".to_string(), "reuters.com".to_string()],
            sort_by: Some("relevancy".to_string()),
            page_size: 500,
            ..Default::default()
        };
        let params = query.params();
        assert!(params.contains(&("pageSize", "100".to_string())));
        assert!(params.contains(&("domains", "bbc.com,reuters.com".to_string())));
        assert!(params.contains(&("q", "rates".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "language"));

        let empty = SearchQuery::default().params();
        assert_eq!(empty, vec![("pageSize", "1".to_string())]);
    }

    #[test]
    fn test_status_errors() {
        let auth = status_error(
            StatusCode::UNAUTHORIZED,
            r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#,
        );
        assert_eq!(
            auth,
            BackendError::AuthenticationError {
                message: "Your API key is invalid.".to_string()
            }
        );

        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, "").is_transient());

        match status_error(StatusCode::BAD_REQUEST, "not json") {
            BackendError::ApiError {
                message,
                status_code,
            } => {
                assert_eq!(status_code, Some(400));
                assert!(message.contains("(unknown): not json"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_rejects_empty_key() {
        assert!(matches!(
            NewsApiClient::new("  ".to_string(), Duration::from_secs(5)),
            Err(BackendError::ConfigurationError { .. })
        ));
    }
}
