//! Mock inference client for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use gradelens_core::error::InferenceError;
use gradelens_core::traits::{InferenceClient, InferenceRequest, InferenceResponse};

/// A mock client for exercising the remote strategies without a network.
///
/// Replies are chosen by prompt substring; unmatched prompts get the default
/// reply, or a network error when the mock was built with [`failing`].
///
/// [`failing`]: MockInferenceClient::failing
pub struct MockInferenceClient {
    /// (prompt substring, completion) pairs, checked in order.
    responses: Vec<(String, String)>,
    default_response: Option<String>,
    call_count: AtomicU32,
    last_request: Mutex<Option<InferenceRequest>>,
}

impl MockInferenceClient {
    /// Create a mock with the given prompt→completion mappings.
    pub fn new<K: Into<String>, V: Into<String>>(responses: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            responses: responses.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            default_response: Some("[]".to_string()),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same completion.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            responses: Vec::new(),
            default_response: Some(response.to_string()),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock whose every call fails.
    pub fn failing() -> Self {
        Self {
            responses: Vec::new(),
            default_response: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Get the number of calls made to this client.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this client.
    pub fn last_request(&self) -> Option<InferenceRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(request.clone());

        let content = self
            .responses
            .iter()
            .find(|(key, _)| request.prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .or_else(|| self.default_response.clone())
            .ok_or_else(|| InferenceError::NetworkError("mock client is offline".into()))?;

        Ok(InferenceResponse {
            content,
            model: request.model.clone(),
            latency_ms: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> InferenceRequest {
        InferenceRequest {
            model: "mock".into(),
            system_prompt: String::new(),
            prompt: prompt.into(),
            temperature: 0.0,
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn fixed_response() {
        let client = MockInferenceClient::with_fixed_response("[\"Algebra\"]");
        let response = client.complete(&request("anything")).await.unwrap();
        assert_eq!(response.content, "[\"Algebra\"]");
        assert_eq!(client.call_count(), 1);
        assert_eq!(client.last_request().unwrap().prompt, "anything");
    }

    #[tokio::test]
    async fn prompt_matching() {
        let client = MockInferenceClient::new([
            ("syllabus text", "[\"Optics\"]"),
            ("answer sheet text", "[{\"question\": \"q\", \"answer\": \"a\"}]"),
        ]);

        let resp = client.complete(&request("... syllabus text: ...")).await.unwrap();
        assert!(resp.content.contains("Optics"));

        let resp = client.complete(&request("... answer sheet text: ...")).await.unwrap();
        assert!(resp.content.contains("question"));

        let resp = client.complete(&request("something else")).await.unwrap();
        assert_eq!(resp.content, "[]");
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn failing_client_errors() {
        let client = MockInferenceClient::failing();
        let err = client.complete(&request("x")).await.unwrap_err();
        assert!(matches!(err, InferenceError::NetworkError(_)));
        assert_eq!(client.call_count(), 1);
    }
}
