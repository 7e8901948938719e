//! Configuration for verifact
//!
//! Settings are read from environment variables with defaults and checked by
//! [`VerifactConfig::validate`].
//!
//! # Environment Variables
//!
//! - `VERIFACT_PROVIDER`: model provider (gemini|openai|anthropic|ollama|groq|xai|deepseek) - default: "gemini"
//! - `VERIFACT_MODEL`: model name - default: "gemini-1.5-pro"
//! - `VERIFACT_REQUEST_TIMEOUT`: model request timeout in seconds - default: "30"
//! - `VERIFACT_MAX_CONCURRENT_STEPS`: steps run at once - default: "4"
//! - `VERIFACT_NEWS_API_KEY`: NewsAPI key for the source directory - default: unset (directory disabled)
//! - `VERIFACT_DATA_DIR`: state directory - default: platform data dir + "verifact"
//! - `VERIFACT_LOG_LEVEL`: logging level - default: "info"
//!
//! Provider credentials are read by genai itself (`GEMINI_API_KEY`,
//! `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, ...).
//!
//! Credibility is always decided against the fixed
//! [`CREDIBILITY_THRESHOLD`](crate::pipeline::CREDIBILITY_THRESHOLD); it is not configurable.

use crate::llm::{BackendError, GenAIClient};
use crate::news::NewsApiClient;
use crate::pipeline::ExecutorConfig;
use genai::adapter::AdapterKind;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MODEL: &str = "gemini-1.5-pro";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENT_STEPS: usize = 4;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;
const MAX_CONCURRENT_STEPS_LIMIT: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid provider: {0}. Valid options: gemini, openai, anthropic, ollama, groq, xai, deepseek")]
    InvalidProvider(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Backend initialization failed: {0}")]
    BackendInitError(#[from] BackendError),
}

/// Maps a provider name to its genai adapter
pub fn parse_provider(name: &str) -> Result<AdapterKind, ConfigError> {
    match name.trim().to_lowercase().as_str() {
        "gemini" | "google" => Ok(AdapterKind::Gemini),
        "openai" => Ok(AdapterKind::OpenAI),
        "anthropic" | "claude" => Ok(AdapterKind::Anthropic),
        "ollama" => Ok(AdapterKind::Ollama),
        "groq" => Ok(AdapterKind::Groq),
        "xai" | "grok" => Ok(AdapterKind::Xai),
        "deepseek" => Ok(AdapterKind::DeepSeek),
        other => Err(ConfigError::InvalidProvider(other.to_string())),
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("verifact")
}

#[derive(Debug, Clone)]
pub struct VerifactConfig {
    pub provider: AdapterKind,
    pub model: String,
    pub request_timeout_secs: u64,
    pub max_concurrent_steps: usize,
    /// Enables the NewsAPI source directory when set
    pub news_api_key: Option<String>,
    /// Where articles and validation records are kept
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl Default for VerifactConfig {
    /// Loads from `VERIFACT_*` variables. Unparseable values fall back to defaults;
    /// an unknown provider falls back to Gemini.
    fn default() -> Self {
        let provider = env::var("VERIFACT_PROVIDER")
            .ok()
            .and_then(|s| parse_provider(&s).ok())
            .unwrap_or(AdapterKind::Gemini);

        let model = env::var("VERIFACT_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let request_timeout_secs = env::var("VERIFACT_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let max_concurrent_steps = env::var("VERIFACT_MAX_CONCURRENT_STEPS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_CONCURRENT_STEPS);

        let news_api_key = env::var("VERIFACT_NEWS_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let data_dir = env::var("VERIFACT_DATA_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let log_level = env::var("VERIFACT_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            provider,
            model,
            request_timeout_secs,
            max_concurrent_steps,
            news_api_key,
            data_dir,
            log_level,
        }
    }
}

impl VerifactConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Model name must not be empty".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if !(1..=MAX_CONCURRENT_STEPS_LIMIT).contains(&self.max_concurrent_steps) {
            return Err(ConfigError::ValidationFailed(format!(
                "Max concurrent steps must be between 1 and {}, got {}",
                MAX_CONCURRENT_STEPS_LIMIT, self.max_concurrent_steps
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            max_concurrent_steps: self.max_concurrent_steps,
        }
    }

    /// Builds the model client for the configured provider.
    ///
    /// Credentials are resolved by genai from the provider's usual environment
    /// variable when the first request is made.
    pub async fn create_client(&self) -> Result<Arc<GenAIClient>, ConfigError> {
        let client =
            GenAIClient::new(self.provider, self.model.clone(), self.request_timeout()).await?;
        Ok(Arc::new(client))
    }

    /// NewsAPI client when a key is configured, sharing the model request timeout
    pub fn create_source_directory(&self) -> Result<Option<Arc<NewsApiClient>>, ConfigError> {
        match &self.news_api_key {
            Some(key) => {
                let client = NewsApiClient::new(key.clone(), self.request_timeout())?;
                Ok(Some(Arc::new(client)))
            }
            None => Ok(None),
        }
    }

    fn news_api_status(&self) -> &'static str {
        if self.news_api_key.is_some() {
            "configured"
        } else {
            "disabled"
        }
    }

    pub fn to_display_map(&self) -> std::collections::BTreeMap<String, String> {
        let mut map = std::collections::BTreeMap::new();
        map.insert("provider".to_string(), self.provider.as_str().to_string());
        map.insert("model".to_string(), self.model.clone());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert(
            "max_concurrent_steps".to_string(),
            self.max_concurrent_steps.to_string(),
        );
        map.insert(
            "news_api".to_string(),
            self.news_api_status().to_string(),
        );
        map.insert("data_dir".to_string(), self.data_dir.display().to_string());
        map.insert("log_level".to_string(), self.log_level.clone());
        map
    }
}

impl fmt::Display for VerifactConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Verifact Configuration:")?;
        writeln!(f, "  Provider: {}", self.provider.as_str())?;
        writeln!(f, "  Model: {}", self.model)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Max Concurrent Steps: {}", self.max_concurrent_steps)?;
        writeln!(f, "  NewsAPI: {}", self.news_api_status())?;
        writeln!(f, "  Data Dir: {}", self.data_dir.display())?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
