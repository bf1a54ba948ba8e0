use std::time::Duration;

use crate::retry::MAX_RETRIES;
use crate::url::DEFAULT_OLLAMA_BASE_URL;

/// Transport configuration for Ollama API requests.
#[derive(Debug, Clone)]
pub struct OllamaApiConfig {
    /// Base URL of the Ollama daemon.
    pub base_url: String,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
    /// Retry attempts after the initial request.
    pub max_retries: u32,
    /// How long the daemon keeps the model loaded after a request (`"5m"`, `"0"`).
    pub keep_alive: Option<String>,
}

impl Default for OllamaApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            timeout: None,
            max_retries: MAX_RETRIES,
            keep_alive: None,
        }
    }
}

impl OllamaApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }
}
