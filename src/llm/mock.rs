use super::client::LLMClient;
use super::error::BackendError;
use super::types::{LLMRequest, LLMResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted client: answers from a queue and remembers every request it saw
pub struct MockLLMClient {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<LLMRequest>>,
    delay: Option<Duration>,
    name: String,
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub content: String,
    pub error: Option<BackendError>,
}

impl MockResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            error: None,
        }
    }

    /// Serializes `value` as the response body
    pub fn json(value: serde_json::Value) -> Self {
        Self::text(value.to_string())
    }

    pub fn error(error: BackendError) -> Self {
        Self {
            content: String::new(),
            error: Some(error),
        }
    }
}

impl MockLLMClient {
    pub fn new() -> Self {
        Self::with_name("MockLLM")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
            name: name.into(),
        }
    }

    /// Sleeps before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn add_response(&self, response: MockResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        let mut queue = self.responses.lock().unwrap();
        for response in responses {
            queue.push_back(response);
        }
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockLLMClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        self.requests.lock().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response =
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| BackendError::Other {
                    message: "MockLLMClient: No more responses in queue".to_string(),
                })?;

        if let Some(error) = response.error {
            return Err(error);
        }

        Ok(LLMResponse::text(response.content, Duration::from_millis(10)))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model_info(&self) -> Option<String> {
        Some("mock-model".to_string())
    }
}

impl std::fmt::Debug for MockLLMClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLLMClient")
            .field("name", &self.name)
            .field("remaining_responses", &self.remaining_responses())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    #[tokio::test]
    async fn test_mock_client_basic() {
        let client = MockLLMClient::new();
        client.add_response(MockResponse::text("Hello!"));

        let response = client.chat(LLMRequest::new(vec![])).await.unwrap();

        assert_eq!(response.content, "Hello!");
    }

    #[tokio::test]
    async fn test_mock_client_records_requests() {
        let client = MockLLMClient::new();
        client.add_response(MockResponse::json(serde_json::json!({ "bias_score": 0.5 })));

        client
            .chat(LLMRequest::new(vec![ChatMessage::user("article text")]))
            .await
            .unwrap();

        let seen = client.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].last_user_message(), Some("article text"));
    }

    #[tokio::test]
    async fn test_mock_client_error() {
        let client = MockLLMClient::new();
        client.add_response(MockResponse::error(BackendError::TimeoutError {
            seconds: 30,
        }));

        let result = client.chat(LLMRequest::new(vec![])).await;

        assert_eq!(result.unwrap_err(), BackendError::TimeoutError { seconds: 30 });
    }

    #[tokio::test]
    async fn test_mock_client_no_responses() {
        let client = MockLLMClient::new();

        let result = client.chat(LLMRequest::new(vec![])).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_client_multiple_responses() {
        let client = MockLLMClient::new();
        client.add_responses(vec![
            MockResponse::text("First"),
            MockResponse::text("Second"),
            MockResponse::text("Third"),
        ]);

        assert_eq!(client.remaining_responses(), 3);

        let r1 = client.chat(LLMRequest::new(vec![])).await.unwrap();
        assert_eq!(r1.content, "First");

        let r2 = client.chat(LLMRequest::new(vec![])).await.unwrap();
        assert_eq!(r2.content, "Second");

        assert_eq!(client.remaining_responses(), 1);
    }

    #[test]
    fn test_custom_name() {
        let client = MockLLMClient::with_name("TestClient");
        assert_eq!(client.name(), "TestClient");
    }
}
