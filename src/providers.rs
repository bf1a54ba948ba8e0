use std::sync::Arc;

use inference_provider::{InferenceProvider, ProviderInitError};
use inference_provider_mock::{MockProvider, MOCK_PROVIDER_ID};
use inference_provider_ollama::{OllamaProvider, OllamaProviderConfig, OLLAMA_PROVIDER_ID};

use crate::catalog::ModelCatalog;
use crate::config::LensConfig;

pub const DEFAULT_PROVIDER_ID: &str = MOCK_PROVIDER_ID;

/// Resolves the provider named by `config.provider_id`, serving every model in `models`.
pub fn provider_for_config(
    config: &LensConfig,
    models: &ModelCatalog,
) -> Result<Arc<dyn InferenceProvider>, ProviderInitError> {
    let model_ids: Vec<String> = models
        .list()
        .iter()
        .map(|model| model.as_str().to_string())
        .collect();

    match config.provider_id.as_str() {
        MOCK_PROVIDER_ID => Ok(Arc::new(MockProvider::new(model_ids))),
        OLLAMA_PROVIDER_ID => {
            let mut provider_config =
                OllamaProviderConfig::new(model_ids).with_base_url(config.ollama_url.clone());
            if let Some(timeout) = config.timeout {
                provider_config = provider_config.with_timeout(timeout);
            }
            Ok(Arc::new(OllamaProvider::new(provider_config)?))
        }
        unknown => Err(ProviderInitError::new(format!(
            "Unsupported provider '{unknown}'. Available providers: {MOCK_PROVIDER_ID}, {OLLAMA_PROVIDER_ID}"
        ))),
    }
}
