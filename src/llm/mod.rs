//! LLM client abstraction layer
//!
//! The AI-backed step handlers talk to a model through [`LLMClient`], so the
//! real provider ([`GenAIClient`]) and the scripted [`MockLLMClient`] are
//! interchangeable.

mod client;
mod error;
mod genai;
mod mock;
mod types;

pub use client::LLMClient;
pub use error::BackendError;
pub use genai::{GenAIClient, API_BASE_URL_ENV};
pub use mock::{MockLLMClient, MockResponse};
pub use types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
