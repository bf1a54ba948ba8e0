//! Transport-only Ollama API client primitives.
//!
//! This crate owns request building, response parsing and retry behavior for
//! the non-streaming `/api/generate` endpoint only. It contains no prompt
//! construction and no session or caching logic.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod retry;
pub mod url;

pub use client::OllamaClient;
pub use config::OllamaApiConfig;
pub use error::OllamaApiError;
pub use payload::{GenerateOptions, GenerateRequest, GenerateResponse};
pub use url::{normalize_generate_url, DEFAULT_OLLAMA_BASE_URL};
