//! GenAI-based LLM client implementation
//!
//! Talks to any provider supported by the `genai` crate (Gemini, OpenAI, Claude,
//! Ollama, ...). Analysis prompts are plain chat completions, no tool calling.

use super::client::LLMClient;
use super::error::BackendError;
use super::types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{ChatMessage as GenAIChatMessage, ChatOptions, ChatRequest as GenAIChatRequest};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use std::time::Duration;
use tracing::{debug, error};

/// Overrides the provider endpoint, e.g. for a proxy or a local gateway
pub const API_BASE_URL_ENV: &str = "VERIFACT_API_BASE_URL";

pub struct GenAIClient {
    client: Client,
    /// Model name, without provider prefix
    model: String,
    provider: AdapterKind,
    /// Request timeout
    timeout: Duration,
}

impl GenAIClient {
    pub async fn new(
        provider: AdapterKind,
        model: String,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        if model.trim().is_empty() {
            return Err(BackendError::ConfigurationError {
                message: "model name must not be empty".to_string(),
            });
        }

        let custom_endpoint = std::env::var(API_BASE_URL_ENV).ok();

        let client = if let Some(endpoint_url) = custom_endpoint {
            debug!(
                "Using custom endpoint for {}: {}",
                provider.as_str(),
                endpoint_url
            );

            let model_clone = model.clone();

            let resolver = ServiceTargetResolver::from_resolver_fn(
                move |_service_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error>
                {
                    let endpoint = Endpoint::from_owned(endpoint_url.clone());

                    let auth = match provider.default_key_env_name() {
                        Some(api_key_var) => AuthData::from_env(api_key_var),
                        None => AuthData::from_single(""),
                    };

                    Ok(ServiceTarget {
                        endpoint,
                        auth,
                        model: ModelIden::new(provider, &model_clone),
                    })
                },
            );

            Client::builder()
                .with_service_target_resolver(resolver)
                .build()
        } else {
            Client::default()
        };

        debug!(
            "Creating GenAI client: provider={}, model={}",
            provider.as_str(),
            model,
        );

        Ok(Self {
            client,
            model,
            provider,
            timeout,
        })
    }

    fn convert_message(msg: &ChatMessage) -> GenAIChatMessage {
        match msg.role {
            MessageRole::System => GenAIChatMessage::system(&msg.content),
            MessageRole::User => GenAIChatMessage::user(&msg.content),
            MessageRole::Assistant => GenAIChatMessage::assistant(&msg.content),
        }
    }
}

#[async_trait]
impl LLMClient for GenAIClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let start = std::time::Instant::now();

        let messages: Vec<GenAIChatMessage> =
            request.messages.iter().map(Self::convert_message).collect();
        let genai_request = GenAIChatRequest::new(messages);

        let mut options = ChatOptions::default();
        if let Some(temp) = request.temperature {
            options = options.with_temperature(temp as f64);
        }
        if let Some(max_tokens) = request.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }
        if let Some(ref sequences) = request.stop_sequences {
            options = options.with_stop_sequences(sequences.clone());
        }

        let response = match tokio::time::timeout(
            self.timeout,
            self.client
                .exec_chat(&self.model, genai_request, Some(&options)),
        )
        .await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                error!("{} API error: {}", self.provider.as_str(), e);
                return Err(BackendError::ApiError {
                    message: format!("{} request failed: {}", self.provider.as_str(), e),
                    status_code: None,
                });
            }
            Err(_) => {
                error!(
                    "{} request timed out after {}s",
                    self.provider.as_str(),
                    self.timeout.as_secs()
                );
                return Err(BackendError::TimeoutError {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let content = response.first_text().unwrap_or_default().to_string();
        if content.trim().is_empty() {
            return Err(BackendError::invalid_response(
                "empty completion",
                String::new(),
            ));
        }

        Ok(LLMResponse::text(content, start.elapsed()))
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn model_info(&self) -> Option<String> {
        Some(self.model.clone())
    }
}

impl std::fmt::Debug for GenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAIClient")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
