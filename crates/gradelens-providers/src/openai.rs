//! OpenAI-compatible chat-completions client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gradelens_core::error::InferenceError;
use gradelens_core::traits::{InferenceClient, InferenceRequest, InferenceResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Client for `POST {base_url}/v1/chat/completions`.
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");

        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl InferenceClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: &InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let start = Instant::now();

        let body = ChatRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout(self.timeout.as_secs())
                } else {
                    InferenceError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(InferenceError::RateLimited {
                retry_after_ms: retry_after,
            });
        }
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::AuthenticationFailed(body));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::ApiError {
                status,
                message: body,
            });
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::MalformedPayload(format!("failed to parse response: {e}")))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| InferenceError::MalformedPayload("response has no message content".into()))?;

        Ok(InferenceResponse {
            content,
            model: api_response.model.unwrap_or_else(|| request.model.clone()),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> InferenceRequest {
        InferenceRequest {
            model: "gpt-3.5-turbo".into(),
            system_prompt: "Always return valid JSON arrays.".into(),
            prompt: "Extract topics".into(),
            temperature: 0.3,
            max_tokens: 500,
        }
    }

    fn client(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new("test-key", Some(server.uri()), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn successful_completion() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "choices": [{"message": {"content": "[\"Algebra\"]", "role": "assistant"}, "index": 0}],
            "model": "gpt-3.5-turbo-0125",
            "usage": {"prompt_tokens": 40, "completion_tokens": 5, "total_tokens": 45}
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 500,
                "messages": [
                    {"role": "system", "content": "Always return valid JSON arrays."},
                    {"role": "user", "content": "Extract topics"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server).complete(&request()).await.unwrap();
        assert_eq!(response.content, "[\"Algebra\"]");
        assert_eq!(response.model, "gpt-3.5-turbo-0125");
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "[]"}}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new("k", Some(format!("{}/", server.uri())), Duration::from_secs(5));
        let response = client.complete(&request()).await.unwrap();
        assert_eq!(response.content, "[]");
        assert_eq!(response.model, "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let client = client(&server);
        assert!(matches!(
            client.complete(&request()).await.unwrap_err(),
            InferenceError::AuthenticationFailed(body) if body == "bad key"
        ));
        assert!(matches!(
            client.complete(&request()).await.unwrap_err(),
            InferenceError::RateLimited { retry_after_ms: 2000 }
        ));
        assert!(matches!(
            client.complete(&request()).await.unwrap_err(),
            InferenceError::ApiError { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn empty_choices_is_a_payload_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(&server).complete(&request()).await.unwrap_err();
        assert!(err.is_payload_error());
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": [{"message": {"content": "[]"}}]}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = OpenAiClient::new("k", Some(server.uri()), Duration::from_millis(200));
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let client = OpenAiClient::new("k", Some("http://127.0.0.1:1".into()), Duration::from_secs(2));
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::NetworkError(_) | InferenceError::Timeout(_)));
    }
}
