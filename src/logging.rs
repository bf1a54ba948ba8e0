//! Tracing helpers.
//!
//! The library only emits events; installing a subscriber is up to the host.

use inference_provider::RunId;
use tracing::Span;

use crate::catalog::Identity;

pub const LOG_TARGET: &str = "error_lens";

/// Span covering one generation run on the worker thread.
pub fn generation_span(run_id: RunId, identity: &Identity) -> Span {
    tracing::info_span!(
        target: LOG_TARGET,
        "generation",
        run_id,
        snippet = %identity.snippet_id,
        style = %identity.style,
        model = %identity.model,
    )
}
