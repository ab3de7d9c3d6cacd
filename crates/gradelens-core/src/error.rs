//! Error types.
//!
//! `InferenceError` covers every way a remote language-model call can fail.
//! It is defined here so the fallback strategies can log and classify
//! failures without depending on a concrete client crate. None of these
//! errors reach the caller of the analysis pipeline.

use thiserror::Error;

/// Errors that can occur when calling a remote inference service.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The service returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The service returned a non-success response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request did not complete within the configured bound.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response arrived but did not have the expected shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl InferenceError {
    /// Returns `true` for failures caused by the response body rather than transport.
    pub fn is_payload_error(&self) -> bool {
        matches!(self, InferenceError::MalformedPayload(_))
    }
}

/// Errors raised by gradebook lookups and dashboard projections for unknown identities.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("teacher not found: {0}")]
    TeacherNotFound(u64),

    #[error("student not found: {0}")]
    StudentNotFound(u64),

    #[error("answer sheet not found: {0}")]
    AnswerSheetNotFound(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_errors_are_classified() {
        assert!(InferenceError::MalformedPayload("not a list".into()).is_payload_error());
        assert!(!InferenceError::Timeout(30).is_payload_error());
    }

    #[test]
    fn messages_are_stable() {
        assert_eq!(
            InferenceError::ApiError {
                status: 503,
                message: "overloaded".into()
            }
            .to_string(),
            "API error (HTTP 503): overloaded"
        );
        assert_eq!(StatsError::StudentNotFound(7).to_string(), "student not found: 7");
    }
}
