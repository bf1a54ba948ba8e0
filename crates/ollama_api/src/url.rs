/// Default base URL of a local Ollama daemon.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Normalize a base URL to the Ollama generate endpoint.
///
/// Normalization rules:
/// 1) keep `/api/generate` unchanged
/// 2) append `/generate` when path ends in `/api`
/// 3) append `/api/generate` otherwise
pub fn normalize_generate_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_OLLAMA_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/api/generate") {
        return trimmed.to_string();
    }
    if trimmed.ends_with("/api") {
        return format!("{trimmed}/generate");
    }
    format!("{trimmed}/api/generate")
}
