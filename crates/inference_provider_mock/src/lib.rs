//! Deterministic mock implementation of the shared `inference_provider` contract.
//!
//! This crate contains no transport logic and is intended for local
//! development and controller-level integration testing.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use inference_provider::{
    GenerationFailed, GenerationRequest, InferenceProvider, ProviderProfile,
};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// Scripted outcome for one generation call.
pub type ScriptedOutcome = Result<String, String>;

/// Blocks generation calls until released. Shared between a test and a provider.
#[derive(Debug, Clone, Default)]
pub struct MockGate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl MockGate {
    /// Lets every pending and future generation call proceed.
    pub fn release(&self) {
        let (open, signal) = &*self.inner;
        *lock_unpoisoned(open) = true;
        signal.notify_all();
    }

    fn wait(&self) {
        let (open, signal) = &*self.inner;
        let mut guard = lock_unpoisoned(open);
        while !*guard {
            guard = match signal.wait(guard) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

/// Deterministic mock provider used by `error_lens` tests and local runs.
#[derive(Debug)]
pub struct MockProvider {
    model_ids: Vec<String>,
    script: Mutex<VecDeque<ScriptedOutcome>>,
    observed: Mutex<Vec<GenerationRequest>>,
    gate: Option<MockGate>,
    delay: Duration,
}

impl MockProvider {
    /// Creates a mock that answers every request with a template explanation.
    #[must_use]
    pub fn new(model_ids: Vec<String>) -> Self {
        Self {
            model_ids: sanitize_model_ids(model_ids),
            script: Mutex::new(VecDeque::new()),
            observed: Mutex::new(Vec::new()),
            gate: None,
            delay: Duration::ZERO,
        }
    }

    /// Creates a mock that returns `outcomes` in order, then falls back to the template.
    #[must_use]
    pub fn scripted(model_ids: Vec<String>, outcomes: Vec<ScriptedOutcome>) -> Self {
        let provider = Self::new(model_ids);
        lock_unpoisoned(&provider.script).extend(outcomes);
        provider
    }

    /// Holds every generation call until `gate` is released.
    #[must_use]
    pub fn with_gate(mut self, gate: MockGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Simulates backend latency.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queues another outcome behind any already scripted ones.
    pub fn push_outcome(&self, outcome: ScriptedOutcome) {
        lock_unpoisoned(&self.script).push_back(outcome);
    }

    /// Returns every request received so far, in call order.
    #[must_use]
    pub fn observed_requests(&self) -> Vec<GenerationRequest> {
        lock_unpoisoned(&self.observed).clone()
    }

    fn template_response(request: &GenerationRequest) -> String {
        let error_line = request
            .user_prompt
            .lines()
            .rev()
            .find(|line| line.contains("Error"))
            .unwrap_or("the reported error")
            .trim();

        format!(
            "## Improved error message\n\n\
             **Error:** `{error_line}`\n\n\
             **What went wrong:** the program reached a state the operation cannot handle.\n\n\
             **How to fix it:** check the value flagged in the traceback before using it.\n\n\
             _Generated by `{}`._\n",
            request.model_id
        )
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(vec!["mock".to_string(), "mock-alt".to_string()])
    }
}

impl InferenceProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_ids: self.model_ids.clone(),
        }
    }

    fn generate(&self, request: GenerationRequest) -> Result<String, GenerationFailed> {
        lock_unpoisoned(&self.observed).push(request.clone());

        if let Some(gate) = &self.gate {
            gate.wait();
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let scripted = lock_unpoisoned(&self.script).pop_front();
        match scripted {
            Some(Ok(text)) => Ok(text),
            Some(Err(cause)) => Err(GenerationFailed::new(cause)),
            None => Ok(Self::template_response(&request)),
        }
    }
}

fn sanitize_model_ids(model_ids: Vec<String>) -> Vec<String> {
    let mut sanitized: Vec<String> = model_ids
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();

    if sanitized.is_empty() {
        sanitized.push("mock".to_string());
    }

    sanitized
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
