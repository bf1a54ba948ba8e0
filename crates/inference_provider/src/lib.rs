//! Minimal provider-agnostic contract for generating one explanation.
//!
//! This crate intentionally defines only the request, options and failure types
//! shared by the session controller and concrete backends. It excludes transport
//! details, wire payloads, and any caching or feedback concerns.

use std::fmt;

/// Identifier for one generation run.
pub type RunId = u64;

/// Lowest-randomness sampling temperature. Reproducible explanations are the default.
pub const DETERMINISTIC_TEMPERATURE: f32 = 0.0;

/// Error returned while constructing/configuring a provider before any run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    /// Creates a new provider initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Failure reported by a provider for one generation run.
///
/// A failed run never produces text; callers must leave any previously
/// accepted output untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFailed {
    cause: String,
}

impl GenerationFailed {
    #[must_use]
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }

    #[must_use]
    pub fn cause(&self) -> &str {
        &self.cause
    }
}

impl fmt::Display for GenerationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "generation failed: {}", self.cause)
    }
}

impl std::error::Error for GenerationFailed {}

/// Sampling controls forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub seed: Option<u64>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::deterministic()
    }
}

impl GenerationOptions {
    /// Temperature zero, no fixed seed.
    #[must_use]
    pub fn deterministic() -> Self {
        Self {
            temperature: DETERMINISTIC_TEMPERATURE,
            seed: None,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Input required to start a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub run_id: RunId,
    pub model_id: String,
    pub system_instruction: String,
    pub user_prompt: String,
    pub options: GenerationOptions,
}

/// Immutable metadata describing an inference provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub model_ids: Vec<String>,
}

impl ProviderProfile {
    /// Returns true when `model_id` is one of the advertised models.
    #[must_use]
    pub fn supports_model(&self, model_id: &str) -> bool {
        self.model_ids.iter().any(|candidate| candidate == model_id)
    }
}

/// Provider interface for executing one generation request.
///
/// Implementations may block for an unbounded time and may fail; they are
/// called from a worker thread, never from the thread that owns session state.
pub trait InferenceProvider: Send + Sync + 'static {
    /// Returns provider identity and the models it can serve.
    fn profile(&self) -> ProviderProfile;

    /// Generates text for a request, or reports why it could not.
    fn generate(&self, request: GenerationRequest) -> Result<String, GenerationFailed>;
}

#[cfg(test)]
mod tests {
    use super::{
        GenerationFailed, GenerationOptions, GenerationRequest, InferenceProvider,
        ProviderInitError, ProviderProfile, DETERMINISTIC_TEMPERATURE,
    };

    struct EchoProvider;

    impl InferenceProvider for EchoProvider {
        fn profile(&self) -> ProviderProfile {
            ProviderProfile {
                provider_id: "echo".to_string(),
                model_ids: vec!["echo-model".to_string()],
            }
        }

        fn generate(&self, request: GenerationRequest) -> Result<String, GenerationFailed> {
            if request.user_prompt.is_empty() {
                return Err(GenerationFailed::new("empty prompt"));
            }
            Ok(format!("{}|{}", request.system_instruction, request.user_prompt))
        }
    }

    fn request(user_prompt: &str) -> GenerationRequest {
        GenerationRequest {
            run_id: 3,
            model_id: "echo-model".to_string(),
            system_instruction: "sys".to_string(),
            user_prompt: user_prompt.to_string(),
            options: GenerationOptions::default(),
        }
    }

    #[test]
    fn default_options_request_lowest_randomness() {
        let options = GenerationOptions::default();
        assert_eq!(options.temperature, DETERMINISTIC_TEMPERATURE);
        assert_eq!(options.seed, None);
        assert_eq!(GenerationOptions::deterministic().with_seed(9).seed, Some(9));
    }

    #[test]
    fn provider_init_error_preserves_message() {
        let error = ProviderInitError::new("missing base url");
        assert_eq!(error.message(), "missing base url");
        assert_eq!(error.to_string(), "missing base url");
        assert_eq!(ProviderInitError::from("x"), ProviderInitError::new("x"));
    }

    #[test]
    fn generation_failed_carries_cause() {
        let error = GenerationFailed::new("connection refused");
        assert_eq!(error.cause(), "connection refused");
        assert_eq!(error.to_string(), "generation failed: connection refused");
    }

    #[test]
    fn provider_returns_text_or_failure() {
        let provider = EchoProvider;
        assert_eq!(
            provider.generate(request("why?")).as_deref(),
            Ok("sys|why?")
        );
        assert_eq!(
            provider.generate(request("")),
            Err(GenerationFailed::new("empty prompt"))
        );
    }

    #[test]
    fn profile_reports_supported_models() {
        let profile = EchoProvider.profile();
        assert!(profile.supports_model("echo-model"));
        assert!(!profile.supports_model("other"));
    }
}
