use feedback_store::FeedbackStoreError;
use thiserror::Error;

use crate::cache::GenerationRejected;
use crate::catalog::{ExplanationStyle, Identity, ModelId, SnippetId};

/// Missing prompt configuration. Raised by startup validation, never recovered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("no prompt template registered for style '{style}'")]
    MissingTemplate { style: ExplanationStyle },

    #[error("no system prompt registered for model '{model}'")]
    MissingSystemPrompt { model: ModelId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    #[must_use]
    pub fn invalid(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("session configuration is invalid: {0}")]
    Configuration(String),

    #[error("unknown snippet '{0}'")]
    UnknownSnippet(SnippetId),

    #[error("unknown model '{0}'")]
    UnknownModel(ModelId),

    #[error("generation not started: {0}")]
    GenerationRejected(#[from] GenerationRejected),

    #[error("generation host unavailable: {0}")]
    HostUnavailable(String),

    #[error("feedback is not available for {0}")]
    FeedbackUnavailable(Identity),

    #[error("no feedback form is open")]
    NoFeedbackForm,

    #[error("unknown feedback question '{0}'")]
    UnknownQuestion(String),

    #[error("feedback is incomplete; unanswered: {}", .missing.join(", "))]
    IncompleteFeedback { missing: Vec<&'static str> },

    #[error(transparent)]
    Store(#[from] FeedbackStoreError),
}
