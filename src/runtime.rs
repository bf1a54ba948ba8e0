use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use inference_provider::{GenerationRequest, InferenceProvider, RunId};
use tracing::{debug, warn};

use crate::logging::generation_span;
use crate::session::{GenerationHost, GenerationJob, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    Finished { run_id: RunId, text: String },
    Failed { run_id: RunId, cause: String },
}

impl GenerationEvent {
    fn run_id(&self) -> RunId {
        match self {
            Self::Finished { run_id, .. } | Self::Failed { run_id, .. } => *run_id,
        }
    }
}

type Notifier = Box<dyn Fn() + Send + Sync>;

struct ActiveRun {
    run_id: RunId,
    join_handle: Option<JoinHandle<()>>,
}

/// Runs provider calls on worker threads and feeds their outcomes back into a [`Session`].
///
/// Outcomes are queued, not applied, on the worker. The host applies them by
/// calling [`GenerationRuntime::flush_pending_events`], typically from the
/// notifier installed with [`GenerationRuntime::with_notifier`] or its own
/// event loop. Never flush while holding the session lock on the same thread.
pub struct GenerationRuntime {
    session: Arc<Mutex<Session>>,
    provider: Arc<dyn InferenceProvider>,
    pending_events: Mutex<VecDeque<GenerationEvent>>,
    next_run_id: AtomicU64,
    active_run: Mutex<Option<ActiveRun>>,
    notifier: Option<Notifier>,
}

impl GenerationRuntime {
    pub fn new(session: Arc<Mutex<Session>>, provider: Arc<dyn InferenceProvider>) -> Arc<Self> {
        Arc::new(Self::build(session, provider, None))
    }

    /// Like [`GenerationRuntime::new`], calling `notifier` whenever the event
    /// queue goes from empty to non-empty.
    pub fn with_notifier(
        session: Arc<Mutex<Session>>,
        provider: Arc<dyn InferenceProvider>,
        notifier: impl Fn() + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self::build(session, provider, Some(Box::new(notifier))))
    }

    fn build(
        session: Arc<Mutex<Session>>,
        provider: Arc<dyn InferenceProvider>,
        notifier: Option<Notifier>,
    ) -> Self {
        Self {
            session,
            provider,
            pending_events: Mutex::new(VecDeque::new()),
            next_run_id: AtomicU64::new(1),
            active_run: Mutex::new(None),
            notifier,
        }
    }

    pub fn session(&self) -> &Arc<Mutex<Session>> {
        &self.session
    }

    pub fn has_active_run(&self) -> bool {
        self.lock_active_run().is_some()
    }

    pub fn pending_event_count(&self) -> usize {
        lock_unpoisoned(&self.pending_events).len()
    }

    fn start_generation_internal(self: &Arc<Self>, job: GenerationJob) -> Result<RunId, String> {
        let mut active_run = self.lock_active_run();
        if active_run.is_some() {
            return Err("Generation already active".to_string());
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        let join_handle = self.spawn_worker(run_id, job)?;
        *active_run = Some(ActiveRun {
            run_id,
            join_handle: Some(join_handle),
        });

        Ok(run_id)
    }

    fn spawn_worker(self: &Arc<Self>, run_id: RunId, job: GenerationJob) -> Result<JoinHandle<()>, String> {
        let runtime = Arc::clone(self);
        thread::Builder::new()
            .name(format!("error-lens-generation-{run_id}"))
            .spawn(move || runtime.run_worker(run_id, job))
            .map_err(|error| format!("Failed to spawn generation worker: {error}"))
    }

    fn run_worker(self: Arc<Self>, run_id: RunId, job: GenerationJob) {
        let span = generation_span(run_id, &job.identity);
        let _entered = span.enter();

        let mut outcome = OutcomeGuard {
            runtime: Arc::clone(&self),
            run_id,
            reported: false,
        };
        let request = GenerationRequest {
            run_id,
            model_id: job.identity.model.as_str().to_string(),
            system_instruction: job.system_instruction,
            user_prompt: job.user_prompt,
            options: job.options,
        };

        let provider = Arc::clone(&self.provider);
        match catch_unwind(AssertUnwindSafe(|| provider.generate(request))) {
            Ok(Ok(text)) => {
                debug!(chars = text.len(), "provider returned explanation");
                outcome.report(GenerationEvent::Finished { run_id, text });
            }
            Ok(Err(failure)) => outcome.report(GenerationEvent::Failed {
                run_id,
                cause: failure.cause().to_string(),
            }),
            Err(_) => {
                warn!("inference provider panicked");
                outcome.report(GenerationEvent::Failed {
                    run_id,
                    cause: "Inference provider panicked".to_string(),
                });
            }
        }
    }

    fn enqueue_event(&self, event: GenerationEvent) {
        let should_notify = {
            let mut queue = lock_unpoisoned(&self.pending_events);
            let should_notify = queue.is_empty();
            queue.push_back(event);
            should_notify
        };

        if should_notify {
            if let Some(notifier) = &self.notifier {
                notifier();
            }
        }
    }

    /// Applies every queued outcome to the session. Returns how many were applied.
    pub fn flush_pending_events(&self) -> usize {
        let mut drained = 0usize;

        loop {
            let event = {
                let mut pending_events = lock_unpoisoned(&self.pending_events);
                pending_events.pop_front()
            };

            match event {
                Some(event) => {
                    self.apply_event(event);
                    drained += 1;
                }
                None => break,
            }
        }

        drained
    }

    fn apply_event(&self, event: GenerationEvent) {
        let run_id = event.run_id();

        {
            let mut session = lock_unpoisoned(&self.session);
            match event {
                GenerationEvent::Finished { run_id, text } => {
                    session.on_generation_finished(run_id, text)
                }
                GenerationEvent::Failed { run_id, cause } => {
                    session.on_generation_failed(run_id, &cause)
                }
            }
        }

        self.clear_active_run_if_matching(run_id);
    }

    fn clear_active_run_if_matching(&self, run_id: RunId) {
        let mut active_run = self.lock_active_run();
        let matches = active_run.as_ref().map(|active| active.run_id) == Some(run_id);
        if !matches {
            return;
        }

        let mut completed = match active_run.take() {
            Some(completed) => completed,
            None => return,
        };

        if let Some(join_handle) = completed.join_handle.take() {
            let is_current_thread = join_handle.thread().id() == thread::current().id();
            if !is_current_thread && join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
    }

    fn lock_active_run(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        lock_unpoisoned(&self.active_run)
    }
}

/// Guarantees exactly one outcome per run, even if the worker unwinds past `report`.
struct OutcomeGuard {
    runtime: Arc<GenerationRuntime>,
    run_id: RunId,
    reported: bool,
}

impl OutcomeGuard {
    fn report(&mut self, event: GenerationEvent) {
        if self.reported {
            return;
        }
        self.reported = true;
        self.runtime.enqueue_event(event);
    }
}

impl Drop for OutcomeGuard {
    fn drop(&mut self) {
        if !self.reported {
            warn!(run_id = self.run_id, "generation worker exited without an outcome");
            let run_id = self.run_id;
            self.report(GenerationEvent::Failed {
                run_id,
                cause: "Generation worker exited without an outcome".to_string(),
            });
        }
    }
}

impl GenerationHost for Arc<GenerationRuntime> {
    fn start_generation(&mut self, job: GenerationJob) -> Result<RunId, String> {
        self.start_generation_internal(job)
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
