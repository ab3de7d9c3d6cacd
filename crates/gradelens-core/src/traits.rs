//! Core trait definitions.
//!
//! `InferenceClient` is implemented by the `gradelens-providers` crate. The
//! three analysis capabilities (`TopicExtractor`, `QaSegmenter`,
//! `UnderstandingScorer`) each have a heuristic implementation and a
//! remote-backed one that falls back to it.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;
use crate::model::{QaPair, Topic, UnderstandingRecord};

// ---------------------------------------------------------------------------
// Remote inference
// ---------------------------------------------------------------------------

/// A language-model backend that answers one prompt with one completion.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Human-readable backend name (e.g. "openai").
    fn name(&self) -> &str;

    /// Send a single request. Implementations must not retry.
    async fn complete(&self, request: &InferenceRequest) -> Result<InferenceResponse, InferenceError>;
}

/// One completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// Model identifier (e.g. "gpt-3.5-turbo").
    pub model: String,
    /// System instruction.
    pub system_prompt: String,
    /// User prompt.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

/// The raw completion text returned by a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub content: String,
    /// Model that actually produced the completion.
    pub model: String,
    pub latency_ms: u64,
}

// ---------------------------------------------------------------------------
// Analysis capabilities
// ---------------------------------------------------------------------------

/// Turns syllabus text into an ordered list of unique topics (at most 15).
#[async_trait]
pub trait TopicExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Vec<Topic>;
}

/// Turns answer-sheet text into an ordered list of pairs (at most 20).
#[async_trait]
pub trait QaSegmenter: Send + Sync {
    async fn segment(&self, text: &str) -> Vec<QaPair>;
}

/// Produces exactly one record per topic, in topic order.
#[async_trait]
pub trait UnderstandingScorer: Send + Sync {
    async fn score(&self, topics: &[Topic], pairs: &[QaPair]) -> Vec<UnderstandingRecord>;
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Strip surrounding markdown code fences (with or without a language tag).
pub fn strip_code_fences(response: &str) -> &str {
    let mut body = response.trim();

    if let Some(rest) = body.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...) up to the first newline.
        body = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim()
}

/// Parse a completion as JSON of the expected shape.
pub fn parse_json_payload<T: DeserializeOwned>(response: &str) -> Result<T, InferenceError> {
    serde_json::from_str(strip_code_fences(response))
        .map_err(|e| InferenceError::MalformedPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let input = "```json\n[\"Algebra\", \"Geometry\"]\n```";
        assert_eq!(strip_code_fences(input), "[\"Algebra\", \"Geometry\"]");
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        let input = "  \n```\n[1, 2]\n```  \n";
        assert_eq!(strip_code_fences(input), "[1, 2]");
    }

    #[test]
    fn single_line_fence() {
        assert_eq!(strip_code_fences("```json[\"a\"]```"), "[\"a\"]");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fences("  [\"a\"] "), "[\"a\"]");
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        let ok: Vec<String> = parse_json_payload("```json\n[\"a\", \"b\"]\n```").unwrap();
        assert_eq!(ok, vec!["a", "b"]);

        let err = parse_json_payload::<Vec<String>>("{\"topics\": []}").unwrap_err();
        assert!(err.is_payload_error());

        let err = parse_json_payload::<Vec<String>>("Sure! Here are the topics").unwrap_err();
        assert!(err.is_payload_error());
    }
}
