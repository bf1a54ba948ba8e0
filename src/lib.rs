//! Session controller for studying model-generated explanations of runtime errors.
//!
//! A user picks a snippet, an explanation style and a model. Together they form
//! an [`Identity`]. The [`Session`] decides whether an explanation may be
//! generated for that identity, caches at most one explanation per identity,
//! gates regeneration behind feedback according to a [`LockPolicy`], and
//! appends feedback to a durable, exportable log.
//!
//! ## Wiring
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//!
//! use error_lens::{provider_for_config, GenerationRuntime, LensConfig, Session};
//!
//! let config = LensConfig::from_env()?;
//! let session = Session::from_config(&config)?;
//! let provider = provider_for_config(&config, session.models())?;
//! let session = Arc::new(Mutex::new(session));
//! let mut runtime = GenerationRuntime::new(Arc::clone(&session), provider);
//!
//! session.lock().unwrap().request_generation(&mut runtime)?;
//! // later, from the host's event loop:
//! runtime.flush_pending_events();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Environment
//!
//! - `ERROR_LENS_PROVIDER`: `mock` (default) or `ollama`
//! - `ERROR_LENS_OLLAMA_URL`: Ollama base URL, default `http://localhost:11434`
//! - `ERROR_LENS_TIMEOUT_SEC`: request timeout for the Ollama provider
//! - `ERROR_LENS_DATA_DIR`: directory holding `feedback.json`, default `.error_lens`
//! - `ERROR_LENS_LOCK_POLICY`: `feedback-unlocks` (default) or `feedback-locks`
//! - `ERROR_LENS_SEED`: fixed sampling seed

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod feedback;
pub mod logging;
pub mod prompt;
pub mod providers;
pub mod runtime;
pub mod session;
pub mod view;

pub use cache::{EntryState, Explanation, ExplanationCache, GenerationRejected, LockPolicy};
pub use catalog::{
    EditorDocument, ExplanationStyle, Identity, ModelCatalog, ModelId, Snippet, SnippetCatalog,
    SnippetId,
};
pub use config::LensConfig;
pub use error::{ConfigError, PromptError, SessionError};
pub use feedback::{FeedbackForm, FeedbackQuestion, FEEDBACK_QUESTIONS};
pub use prompt::{FormattedPrompt, PromptFormatter};
pub use providers::provider_for_config;
pub use runtime::{GenerationEvent, GenerationRuntime};
pub use session::{
    FeedbackSubmitted, GenerationHost, GenerationJob, Notice, NoticeLevel, Session, StatusFlags,
    MAX_NOTICES,
};
pub use view::{ResultTab, SessionView};
