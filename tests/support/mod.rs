#![allow(dead_code)]

use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use error_lens::{
    GenerationHost, GenerationJob, LockPolicy, ModelCatalog, PromptFormatter, Session,
    SnippetCatalog, FEEDBACK_QUESTIONS,
};
use feedback_store::{FeedbackStore, MemoryBackend};
use inference_provider::RunId;

/// Records every job and hands out increasing run ids.
#[derive(Default)]
pub struct HostSpy {
    pub next_run_id: RunId,
    pub started_jobs: Vec<GenerationJob>,
    pub refuse_with: Option<String>,
}

impl HostSpy {
    pub fn with_next_run_id(run_id: RunId) -> Self {
        Self {
            next_run_id: run_id,
            ..Self::default()
        }
    }
}

impl GenerationHost for HostSpy {
    fn start_generation(&mut self, job: GenerationJob) -> Result<RunId, String> {
        if let Some(error) = &self.refuse_with {
            return Err(error.clone());
        }

        self.started_jobs.push(job);
        let run_id = self.next_run_id;
        self.next_run_id += 1;
        Ok(run_id)
    }
}

pub fn memory_session(policy: LockPolicy) -> (Session, MemoryBackend) {
    let backend = MemoryBackend::new();
    let store = FeedbackStore::open(backend.clone()).expect("memory store opens");
    let models = ModelCatalog::builtin();
    let formatter = PromptFormatter::builtin(models.list());
    let session = Session::new(SnippetCatalog::builtin(), models, formatter, store, policy)
        .expect("builtin configuration is valid");
    (session, backend)
}

/// Requests a generation and completes it with `text`.
pub fn generate(session: &mut Session, host: &mut HostSpy, text: &str) -> RunId {
    let run_id = session
        .request_generation(host)
        .expect("generation should start");
    session.on_generation_finished(run_id, text.to_string());
    run_id
}

pub fn answer_all(session: &mut Session, value: bool) {
    for question in FEEDBACK_QUESTIONS.iter() {
        session
            .set_feedback_answer(question.id, value)
            .expect("known question");
    }
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub fn wait_until(
    timeout: Duration,
    mut tick: impl FnMut(),
    mut predicate: impl FnMut() -> bool,
) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        tick();
        if predicate() {
            return true;
        }

        thread::sleep(Duration::from_millis(10));
    }

    tick();
    predicate()
}
