//! Environment configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use inference_provider_mock::MOCK_PROVIDER_ID;
use inference_provider_ollama::DEFAULT_OLLAMA_BASE_URL;

use crate::cache::LockPolicy;
use crate::error::ConfigError;

pub const PROVIDER_ENV_VAR: &str = "ERROR_LENS_PROVIDER";
pub const OLLAMA_URL_ENV_VAR: &str = "ERROR_LENS_OLLAMA_URL";
pub const TIMEOUT_ENV_VAR: &str = "ERROR_LENS_TIMEOUT_SEC";
pub const DATA_DIR_ENV_VAR: &str = "ERROR_LENS_DATA_DIR";
pub const LOCK_POLICY_ENV_VAR: &str = "ERROR_LENS_LOCK_POLICY";
pub const SEED_ENV_VAR: &str = "ERROR_LENS_SEED";

pub const DEFAULT_DATA_DIR: &str = ".error_lens";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LensConfig {
    pub provider_id: String,
    pub ollama_url: String,
    pub timeout: Option<Duration>,
    pub data_dir: PathBuf,
    pub lock_policy: LockPolicy,
    pub seed: Option<u64>,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            ollama_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            timeout: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            lock_policy: LockPolicy::default(),
            seed: None,
        }
    }
}

impl LensConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let lock_policy = match env_string_opt(LOCK_POLICY_ENV_VAR) {
            Some(value) => LockPolicy::parse(&value).ok_or_else(|| {
                ConfigError::invalid(
                    LOCK_POLICY_ENV_VAR,
                    value.as_str(),
                    "expected feedback-unlocks or feedback-locks",
                )
            })?,
            None => defaults.lock_policy,
        };

        let timeout = env_string_opt(TIMEOUT_ENV_VAR)
            .map(|value| match value.trim().parse::<u64>() {
                Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
                _ => Err(ConfigError::invalid(
                    TIMEOUT_ENV_VAR,
                    value.as_str(),
                    "expected a positive number of seconds",
                )),
            })
            .transpose()?;

        let seed = env_string_opt(SEED_ENV_VAR)
            .map(|value| {
                value.trim().parse::<u64>().map_err(|error| {
                    ConfigError::invalid(SEED_ENV_VAR, value.as_str(), error.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            provider_id: env_string_opt(PROVIDER_ENV_VAR)
                .map(|value| value.trim().to_string())
                .unwrap_or(defaults.provider_id),
            ollama_url: env_string_opt(OLLAMA_URL_ENV_VAR).unwrap_or(defaults.ollama_url),
            timeout,
            data_dir: env_string_opt(DATA_DIR_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            lock_policy,
            seed,
        })
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
