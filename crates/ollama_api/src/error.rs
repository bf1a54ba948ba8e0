use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum OllamaApiError {
    MissingModel,
    EmptyPrompt,
    Request(reqwest::Error),
    Status(StatusCode, String),
    Serde(JsonError),
    IncompleteResponse { done_reason: Option<String> },
    EmptyResponse,
    RetryExhausted {
        status: Option<StatusCode>,
        last_error: Option<String>,
    },
    Runtime(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub error: Option<String>,
}

impl fmt::Display for OllamaApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingModel => write!(f, "model name is required"),
            Self::EmptyPrompt => write!(f, "prompt must not be empty"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::IncompleteResponse { done_reason } => match done_reason {
                Some(reason) if !reason.trim().is_empty() => {
                    write!(f, "response ended before completion ({reason})")
                }
                _ => write!(f, "response ended before completion"),
            },
            Self::EmptyResponse => write!(f, "model returned an empty response"),
            Self::RetryExhausted { status, last_error } => {
                let status = status
                    .map(|status| status.as_u16().to_string())
                    .unwrap_or_else(|| "n/a".to_owned());
                write!(f, "retry exhausted after max attempts (status: {status}, last_error: {last_error:?})")
            }
            Self::Runtime(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for OllamaApiError {}

impl From<reqwest::Error> for OllamaApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for OllamaApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Extracts a human-readable message from an Ollama error body.
///
/// Ollama reports failures as `{"error": "..."}`; anything else is returned
/// verbatim, and an empty body falls back to the status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorPayload { error: Some(message) }) = serde_json::from_str::<ErrorPayload>(body) {
        let trimmed = message.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
