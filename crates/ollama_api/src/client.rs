use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

use crate::config::OllamaApiConfig;
use crate::error::{parse_error_message, OllamaApiError};
use crate::payload::{GenerateRequest, GenerateResponse};
use crate::retry::{is_retryable_http_error, retry_delay};
use crate::url::normalize_generate_url;

const DEFAULT_USER_AGENT: &str = concat!("error_lens/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub struct OllamaClient {
    http: Client,
    config: OllamaApiConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaApiConfig) -> Result<Self, OllamaApiError> {
        let mut builder = Client::builder().user_agent(DEFAULT_USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(OllamaApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OllamaApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_generate_url(&self.config.base_url)
    }

    pub fn build_request(
        &self,
        request: &GenerateRequest,
    ) -> Result<reqwest::RequestBuilder, OllamaApiError> {
        validate_request(request)?;

        let payload = self.request_with_transport_defaults(request);
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .json(&payload))
    }

    fn request_with_transport_defaults(&self, request: &GenerateRequest) -> GenerateRequest {
        let mut payload = request.clone();
        payload.stream = false;
        if payload.keep_alive.is_none() {
            payload.keep_alive = self.config.keep_alive.clone();
        }
        payload
    }

    pub async fn send_with_retry(
        &self,
        request: &GenerateRequest,
    ) -> Result<Response, OllamaApiError> {
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;
        let max_retries = self.config.max_retries;

        for attempt in 0..=max_retries {
            match self.build_request(request)?.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    last_status = Some(status);
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_owned);
                    let body = response.text().await.unwrap_or_else(|_| {
                        status
                            .canonical_reason()
                            .unwrap_or("request failed")
                            .to_string()
                    });
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if attempt < max_retries && is_retryable_http_error(status.as_u16(), &body) {
                        warn!(attempt, status = status.as_u16(), error = %message, "retrying ollama request");
                        tokio::time::sleep(retry_delay(attempt, retry_after.as_deref())).await;
                        continue;
                    }

                    return Err(OllamaApiError::Status(status, message));
                }
                Err(error) => {
                    let message = error.to_string();
                    last_error = Some(message.clone());
                    if attempt < max_retries {
                        warn!(attempt, error = %message, "retrying ollama request after transport error");
                        tokio::time::sleep(retry_delay(attempt, None)).await;
                        continue;
                    }
                    return Err(OllamaApiError::RetryExhausted {
                        status: last_status,
                        last_error,
                    });
                }
            }
        }

        Err(OllamaApiError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    /// Sends a non-streaming generate request and returns the completed response.
    pub async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, OllamaApiError> {
        debug!(model = %request.model, endpoint = %self.normalized_endpoint(), "sending generate request");
        let response = self.send_with_retry(request).await?;
        let body = response.text().await?;
        parse_generate_response(&body)
    }
}

/// Parses a generate response body, rejecting unfinished or blank output.
pub fn parse_generate_response(body: &str) -> Result<GenerateResponse, OllamaApiError> {
    let parsed: GenerateResponse = serde_json::from_str(body)?;
    if !parsed.done {
        return Err(OllamaApiError::IncompleteResponse {
            done_reason: parsed.done_reason,
        });
    }
    if parsed.response.trim().is_empty() {
        return Err(OllamaApiError::EmptyResponse);
    }
    Ok(parsed)
}

fn validate_request(request: &GenerateRequest) -> Result<(), OllamaApiError> {
    if request.model.trim().is_empty() {
        return Err(OllamaApiError::MissingModel);
    }
    if request.prompt.trim().is_empty() {
        return Err(OllamaApiError::EmptyPrompt);
    }
    Ok(())
}
