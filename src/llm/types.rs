//! LLM communication types
//!
//! Provider-independent request and response shapes used by the analysis handlers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions
    System,
    User,
    /// Model response
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request to send to the LLM
#[derive(Debug, Clone, PartialEq)]
pub struct LLMRequest {
    pub messages: Vec<ChatMessage>,
    /// Temperature for response generation (0.0 - 1.0)
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
}

impl LLMRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
            stop_sequences: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop_sequences(mut self, sequences: Vec<String>) -> Self {
        self.stop_sequences = Some(sequences);
        self
    }

    /// Text of the last user message, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }
}

/// Response from the LLM
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    /// Time taken for the request
    pub response_time: Duration,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>, response_time: Duration) -> Self {
        Self {
            content: content.into(),
            response_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_creation() {
        let system = ChatMessage::system("You are a fact-checking assistant");
        assert_eq!(system.role, MessageRole::System);

        let user = ChatMessage::user("Check this");
        assert_eq!(user.role, MessageRole::User);
        assert_eq!(user.content, "Check this");
    }

    #[test]
    fn test_llm_request_builder() {
        let request = LLMRequest::new(vec![
            ChatMessage::system("rules"),
            ChatMessage::user("first"),
            ChatMessage::assistant("ok"),
            ChatMessage::user("second"),
        ])
        .with_temperature(0.2)
        .with_max_tokens(2048);

        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(2048));
        assert!(request.stop_sequences.is_none());
        assert_eq!(request.last_user_message(), Some("second"));
    }
}
