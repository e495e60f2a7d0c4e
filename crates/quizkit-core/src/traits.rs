//! The text-generation seam.
//!
//! `LlmProvider` is implemented by `quizkit-providers`. The core only sends
//! prompts and receives raw text; prompt wording, JSON decoding and
//! validation happen in [`crate::supply`] and [`crate::feedback`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trait for remote backends that turn a prompt into text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Generate text for a prompt.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;
}

/// Request to generate text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The prompt.
    pub prompt: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub top_k: Option<u32>,
    /// Ask the backend for a JSON-only response when it supports that.
    #[serde(default)]
    pub json_output: bool,
}

/// Text returned by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw response content.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Strip markdown fences from a model response, leaving the JSON payload.
///
/// Handles ```` ```json ```` and bare ```` ``` ```` fences, prose around a
/// fenced block, and responses that are already plain JSON. When there is
/// no fence but the text has leading prose, the outermost `{...}` or
/// `[...]` span is returned.
pub fn extract_json_payload(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        // Skip the info string ("json", "JSON", ...) up to the end of the line.
        let body = match after_fence.find('\n') {
            Some(nl) if after_fence[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
                &after_fence[nl + 1..]
            }
            _ => after_fence,
        };
        let body = match body.find("```") {
            Some(end) => &body[..end],
            // Truncated (unclosed) block
            None => body,
        };
        return body.trim();
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }

    let open = trimmed.find(['{', '[']);
    let close = trimmed.rfind(['}', ']']);
    match (open, close) {
        (Some(o), Some(c)) if c > o => &trimmed[o..=c],
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_is_untouched() {
        assert_eq!(extract_json_payload("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn json_fence_is_stripped() {
        let input = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_payload(input), "{\"a\": 1}");
    }

    #[test]
    fn bare_fence_with_prose() {
        let input = "Here you go:\n\n```\n[1, 2]\n```\nEnjoy!";
        assert_eq!(extract_json_payload(input), "[1, 2]");
    }

    #[test]
    fn truncated_fence() {
        let input = "```json\n{\"question\": \"Q\"}";
        assert_eq!(extract_json_payload(input), "{\"question\": \"Q\"}");
    }

    #[test]
    fn prose_without_fence() {
        let input = "Sure! {\"a\": {\"b\": 2}} Hope that helps.";
        assert_eq!(extract_json_payload(input), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn no_json_returns_trimmed_text() {
        assert_eq!(extract_json_payload("  nothing here "), "nothing here");
    }
}
