//! Retry rules for the Ollama daemon.
//!
//! The daemon answers `503 server busy` when its request queue is full and
//! reports a crashed or still-loading runner as a plain `500`. Both clear up on
//! their own. A `500` caused by the model itself (not enough memory, missing
//! capability) does not, and is surfaced immediately.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// Maximum retry attempts after an initial request attempt.
pub const MAX_RETRIES: u32 = 2;
/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 500;
/// Upper bound for any single wait, including a server-provided `Retry-After`.
pub const MAX_DELAY_MS: u64 = 10_000;

fn transient_error_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?i)server.?busy|loading model|llama runner|connection.?(refused|reset)")
            .expect("transient error regex must compile")
    })
}

fn permanent_error_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?i)requires more system memory|does not support|not found")
            .expect("permanent error regex must compile")
    })
}

/// Whether a failed generate call is worth repeating.
pub fn is_retryable_http_error(status: u16, error_text: &str) -> bool {
    if permanent_error_regex().is_match(error_text) {
        return false;
    }
    matches!(status, 429 | 500 | 502 | 503 | 504) || transient_error_regex().is_match(error_text)
}

/// Delay before retry number `attempt` (zero based).
///
/// A `Retry-After` value in whole seconds wins over exponential backoff. Either
/// way the wait never exceeds [`MAX_DELAY_MS`].
pub fn retry_delay(attempt: u32, retry_after: Option<&str>) -> Duration {
    let hinted = retry_after
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|seconds| seconds.saturating_mul(1000));
    let backoff = BASE_DELAY_MS.saturating_mul(2u64.saturating_pow(attempt.min(30)));
    Duration::from_millis(hinted.unwrap_or(backoff).min(MAX_DELAY_MS))
}
