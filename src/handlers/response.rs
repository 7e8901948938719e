//! Querying the model and decoding its JSON answers

use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::{debug, warn};

use crate::llm::{BackendError, ChatMessage, LLMClient, LLMRequest};
use crate::pipeline::StepError;

const SYSTEM_PROMPT: &str = "You are a meticulous news analyst. Answer with a single JSON \
object and nothing else: no prose, no markdown.";

/// Returns the JSON document inside a model answer, unwrapping markdown fences
pub fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();

    if let Some(start_idx) = trimmed.find("```json") {
        let after_fence = &trimmed[start_idx + 7..];
        if let Some(end_idx) = after_fence.find("```") {
            return after_fence[..end_idx].trim();
        }
    }

    if let Some(start_idx) = trimmed.find("```") {
        let after_fence = &trimmed[start_idx + 3..];
        if let Some(end_idx) = after_fence.find("```") {
            return after_fence[..end_idx].trim();
        }
    }

    if !trimmed.starts_with('{') {
        if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
            if start < end {
                return &trimmed[start..=end];
            }
        }
    }

    trimmed
}

pub fn parse_response<T: DeserializeOwned>(content: &str) -> Result<T, BackendError> {
    let json = extract_json(content);
    serde_json::from_str(json).map_err(|e| {
        warn!("JSON parse error: {}", e);
        BackendError::invalid_response(
            format!("{}: {}", e, json.chars().take(100).collect::<String>()),
            content,
        )
    })
}

/// Sends `prompt` and decodes the answer as `T`
pub async fn query_json<T: DeserializeOwned>(
    client: &dyn LLMClient,
    prompt: String,
    max_tokens: u32,
    phase: &str,
) -> Result<T, StepError> {
    let start = Instant::now();

    let request = LLMRequest::new(vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(prompt),
    ])
    .with_temperature(0.1)
    .with_max_tokens(max_tokens);

    let response = client.chat(request).await?;
    debug!(
        phase = phase,
        backend = client.name(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Model answered"
    );

    Ok(parse_response(&response.content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Probe {
        score: f64,
    }

    #[test]
    fn test_extract_plain_json() {
        assert_eq!(extract_json("  {\"score\": 1}  "), "{\"score\": 1}");
    }

    #[test]
    fn test_extract_fenced_json() {
        let content = "Here you go:\n```json\n{\"score\": 0.4}\n```\nThanks";
        assert_eq!(extract_json(content), "{\"score\": 0.4}");

        let bare_fence = "```\n{\"score\": 0.4}\n```";
        assert_eq!(extract_json(bare_fence), "{\"score\": 0.4}");
    }

    #[test]
    fn test_extract_embedded_object() {
        let content = "Analysis: {\"score\": 0.2} -- end";
        assert_eq!(extract_json(content), "{\"score\": 0.2}");
    }

    #[test]
    fn test_parse_response_error_keeps_raw_text() {
        let err = parse_response::<Probe>("not json at all").unwrap_err();
        match err {
            BackendError::InvalidResponse { raw_response, .. } => {
                assert_eq!(raw_response.as_deref(), Some("not json at all"))
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(
            parse_response::<Probe>("```json\n{\"score\": 0.5}\n```").unwrap(),
            Probe { score: 0.5 }
        );
    }
}
