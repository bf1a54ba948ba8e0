//! Ollama-backed implementation of the shared `inference_provider` contract.
//!
//! This adapter translates `ollama_api` transport results into the
//! text-or-failure outcome expected by `error_lens`.

use std::sync::Arc;
use std::time::Duration;

use inference_provider::{
    GenerationFailed, GenerationRequest, InferenceProvider, ProviderInitError, ProviderProfile,
};
use ollama_api::{
    GenerateOptions, GenerateRequest, GenerateResponse, OllamaApiConfig, OllamaApiError,
    OllamaClient,
};
use tracing::debug;

pub use ollama_api::DEFAULT_OLLAMA_BASE_URL;

/// Stable provider identifier used by `error_lens` startup selection.
pub const OLLAMA_PROVIDER_ID: &str = "ollama";

/// Runtime configuration for the Ollama provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaProviderConfig {
    pub model_ids: Vec<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub keep_alive: Option<String>,
}

impl OllamaProviderConfig {
    #[must_use]
    pub fn new(model_ids: Vec<String>) -> Self {
        Self {
            model_ids,
            base_url: None,
            timeout: None,
            keep_alive: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    fn into_api_config(self) -> OllamaApiConfig {
        let mut config = OllamaApiConfig::default();

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        if let Some(keep_alive) = self.keep_alive {
            config = config.with_keep_alive(keep_alive);
        }

        config
    }
}

trait GenerateClient: Send + Sync {
    fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, OllamaApiError>;
}

#[derive(Debug)]
struct BlockingGenerateClient {
    client: OllamaClient,
}

impl GenerateClient for BlockingGenerateClient {
    fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, OllamaApiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                OllamaApiError::Runtime(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(self.client.generate(request))
    }
}

/// `InferenceProvider` adapter backed by `ollama_api` transport primitives.
pub struct OllamaProvider {
    model_ids: Vec<String>,
    client: Arc<dyn GenerateClient>,
}

impl OllamaProvider {
    /// Creates a provider using real Ollama transport.
    pub fn new(config: OllamaProviderConfig) -> Result<Self, ProviderInitError> {
        let model_ids = sanitize_model_ids(config.model_ids.clone());
        if model_ids.is_empty() {
            return Err(ProviderInitError::new(
                "ollama provider requires at least one model id",
            ));
        }

        let client = Arc::new(BlockingGenerateClient {
            client: OllamaClient::new(config.into_api_config()).map_err(map_init_error)?,
        });

        Ok(Self { model_ids, client })
    }

    fn to_api_request(request: &GenerationRequest) -> GenerateRequest {
        let system = Some(request.system_instruction.clone()).filter(|value| !value.trim().is_empty());
        GenerateRequest::new(request.model_id.clone(), request.user_prompt.clone(), system)
            .with_options(GenerateOptions {
                temperature: request.options.temperature,
                seed: request.options.seed,
            })
    }

    #[cfg(test)]
    fn with_client_for_tests(model_ids: Vec<String>, client: Arc<dyn GenerateClient>) -> Self {
        Self {
            model_ids: sanitize_model_ids(model_ids),
            client,
        }
    }
}

impl InferenceProvider for OllamaProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: OLLAMA_PROVIDER_ID.to_string(),
            model_ids: self.model_ids.clone(),
        }
    }

    fn generate(&self, request: GenerationRequest) -> Result<String, GenerationFailed> {
        if !self.model_ids.iter().any(|model| model == &request.model_id) {
            return Err(GenerationFailed::new(format!(
                "model '{}' is not configured for the ollama provider",
                request.model_id
            )));
        }

        let api_request = Self::to_api_request(&request);
        debug!(run_id = request.run_id, model = %request.model_id, "dispatching ollama generation");

        self.client
            .generate(&api_request)
            .map(|response| response.response)
            .map_err(|error| GenerationFailed::new(error.to_string()))
    }
}

fn sanitize_model_ids(model_ids: Vec<String>) -> Vec<String> {
    model_ids
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn map_init_error(error: OllamaApiError) -> ProviderInitError {
    ProviderInitError::new(format!("failed to initialize ollama client: {error}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use inference_provider::GenerationOptions;

    use super::*;

    struct FakeClient {
        outcome: Mutex<Option<Result<GenerateResponse, OllamaApiError>>>,
        observed: Mutex<Option<GenerateRequest>>,
    }

    impl FakeClient {
        fn success(text: &str) -> Arc<Self> {
            Arc::new(Self {
                outcome: Mutex::new(Some(Ok(GenerateResponse {
                    model: "llama3.2:latest".to_string(),
                    response: text.to_string(),
                    done: true,
                    done_reason: Some("stop".to_string()),
                }))),
                observed: Mutex::new(None),
            })
        }

        fn failure(error: OllamaApiError) -> Arc<Self> {
            Arc::new(Self {
                outcome: Mutex::new(Some(Err(error))),
                observed: Mutex::new(None),
            })
        }

        fn observed(&self) -> Option<GenerateRequest> {
            self.observed.lock().expect("observed lock").clone()
        }
    }

    impl GenerateClient for FakeClient {
        fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, OllamaApiError> {
            *self.observed.lock().expect("observed lock") = Some(request.clone());
            self.outcome
                .lock()
                .expect("outcome lock")
                .take()
                .unwrap_or(Err(OllamaApiError::EmptyResponse))
        }
    }

    fn request(model_id: &str) -> GenerationRequest {
        GenerationRequest {
            run_id: 5,
            model_id: model_id.to_string(),
            system_instruction: "You explain Python errors.".to_string(),
            user_prompt: "IndexError: list index out of range".to_string(),
            options: GenerationOptions::deterministic().with_seed(11),
        }
    }

    #[test]
    fn profile_reports_ollama_provider_id_and_models() {
        let provider = OllamaProvider::with_client_for_tests(
            vec!["llama3.2:latest".to_string(), " ".to_string()],
            FakeClient::success("ok"),
        );

        let profile = provider.profile();
        assert_eq!(profile.provider_id, OLLAMA_PROVIDER_ID);
        assert_eq!(profile.model_ids, vec!["llama3.2:latest"]);
    }

    #[test]
    fn generate_forwards_system_prompt_and_deterministic_options() {
        let client = FakeClient::success("## Better");
        let provider = OllamaProvider::with_client_for_tests(
            vec!["llama3.2:latest".to_string()],
            client.clone(),
        );

        let text = provider
            .generate(request("llama3.2:latest"))
            .expect("generation succeeds");
        assert_eq!(text, "## Better");

        let observed = client.observed().expect("request observed");
        assert_eq!(observed.model, "llama3.2:latest");
        assert_eq!(observed.system.as_deref(), Some("You explain Python errors."));
        assert!(!observed.stream);
        assert_eq!(observed.options.temperature, 0.0);
        assert_eq!(observed.options.seed, Some(11));
    }

    #[test]
    fn transport_error_maps_to_generation_failed() {
        let provider = OllamaProvider::with_client_for_tests(
            vec!["llama3.2:latest".to_string()],
            FakeClient::failure(OllamaApiError::EmptyResponse),
        );

        let error = provider
            .generate(request("llama3.2:latest"))
            .expect_err("transport failure surfaces");
        assert_eq!(error.cause(), "model returned an empty response");
    }

    #[test]
    fn unknown_model_fails_without_calling_transport() {
        let client = FakeClient::success("unused");
        let provider =
            OllamaProvider::with_client_for_tests(vec!["phi3:latest".to_string()], client.clone());

        let error = provider
            .generate(request("mistral:latest"))
            .expect_err("unknown model is rejected");
        assert!(error.cause().contains("mistral:latest"));
        assert!(client.observed().is_none());
    }

    #[test]
    fn new_rejects_empty_model_list() {
        let error = match OllamaProvider::new(OllamaProviderConfig::new(vec![String::new()])) {
            Ok(_) => panic!("empty model list should fail"),
            Err(error) => error,
        };
        assert!(error.message().contains("at least one model"));
    }
}
