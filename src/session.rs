use std::path::{Path, PathBuf};

use feedback_store::{
    feedback_path, now_rfc3339, FeedbackExport, FeedbackRecord, FeedbackStore, FeedbackStoreError,
};
use inference_provider::{GenerationOptions, RunId};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::cache::{EntryState, Explanation, ExplanationCache, GenerationRejected, LockPolicy};
use crate::catalog::{
    EditorDocument, ExplanationStyle, Identity, ModelCatalog, ModelId, Snippet, SnippetCatalog,
    SnippetId,
};
use crate::config::LensConfig;
use crate::error::SessionError;
use crate::prompt::PromptFormatter;
use crate::view::{ResultTab, SessionView};

pub const MAX_NOTICES: usize = 32;

/// A formatted prompt ready to be sent to a model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub identity: Identity,
    pub system_instruction: String,
    pub user_prompt: String,
    pub options: GenerationOptions,
}

/// Runs generation jobs on behalf of the session.
///
/// The host reports the outcome later through [`Session::on_generation_finished`]
/// or [`Session::on_generation_failed`] with the returned run id.
pub trait GenerationHost {
    fn start_generation(&mut self, job: GenerationJob) -> Result<RunId, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient message for the presentation shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackSubmitted {
    Persisted,
    /// Kept in memory; storage rejected the write.
    PendingPersist { pending: usize },
}

/// Everything a presentation shell needs to draw the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags {
    pub is_generating: bool,
    pub can_generate: bool,
    pub can_open_feedback: bool,
    pub has_explanation: bool,
}

pub struct Session {
    snippets: SnippetCatalog,
    models: ModelCatalog,
    formatter: PromptFormatter,
    cache: ExplanationCache,
    store: FeedbackStore,
    view: SessionView,
    options: GenerationOptions,
    notices: Vec<Notice>,
}

impl Session {
    /// Builds a session and validates the prompt configuration up front.
    pub fn new(
        snippets: SnippetCatalog,
        models: ModelCatalog,
        formatter: PromptFormatter,
        store: FeedbackStore,
        policy: LockPolicy,
    ) -> Result<Self, SessionError> {
        formatter.validate(ExplanationStyle::ALL, models.list())?;

        let snippet_id = snippets
            .first()
            .map(|snippet| snippet.id.clone())
            .ok_or_else(|| SessionError::Configuration("snippet catalog is empty".to_string()))?;
        let model = models
            .first()
            .cloned()
            .ok_or_else(|| SessionError::Configuration("model catalog is empty".to_string()))?;

        info!(
            snippets = snippets.list().len(),
            models = models.list().len(),
            policy = %policy,
            stored_feedback = store.len(),
            "session ready"
        );

        Ok(Self {
            snippets,
            models,
            formatter,
            cache: ExplanationCache::new(policy),
            store,
            view: SessionView::new(snippet_id, ExplanationStyle::default(), model),
            options: GenerationOptions::deterministic(),
            notices: Vec::new(),
        })
    }

    /// Built-in catalogs and templates, feedback persisted under the configured data dir.
    pub fn from_config(config: &LensConfig) -> Result<Self, SessionError> {
        let models = ModelCatalog::builtin();
        let formatter = PromptFormatter::builtin(models.list());
        let store = FeedbackStore::open_json(&feedback_path(&config.data_dir))?;

        let session = Self::new(
            SnippetCatalog::builtin(),
            models,
            formatter,
            store,
            config.lock_policy,
        )?;
        Ok(match config.seed {
            Some(seed) => session.with_options(GenerationOptions::deterministic().with_seed(seed)),
            None => session,
        })
    }

    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn view(&self) -> &SessionView {
        &self.view
    }

    pub fn snippets(&self) -> &SnippetCatalog {
        &self.snippets
    }

    pub fn models(&self) -> &ModelCatalog {
        &self.models
    }

    pub fn cache(&self) -> &ExplanationCache {
        &self.cache
    }

    pub fn store(&self) -> &FeedbackStore {
        &self.store
    }

    /// Most recent notices, oldest first. At most [`MAX_NOTICES`] are kept until
    /// the host drains them with [`Session::dismiss_notices`].
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn identity(&self) -> Identity {
        self.view.identity()
    }

    pub fn current_snippet(&self) -> Option<&Snippet> {
        self.snippets.get(&self.view.snippet_id)
    }

    pub fn editor_document(&self) -> Option<EditorDocument> {
        self.current_snippet().map(Snippet::editor_document)
    }

    pub fn current_explanation(&self) -> Option<&Explanation> {
        self.cache.explanation(&self.identity())
    }

    /// Text for the result pane: the explanation on the improved tab, the
    /// standard error otherwise.
    pub fn displayed_result(&self) -> Option<&str> {
        match self.view.result_tab {
            ResultTab::Improved => self
                .current_explanation()
                .map(|explanation| explanation.content.as_str()),
            ResultTab::StandardError => self
                .current_snippet()
                .map(|snippet| snippet.standard_error_text.as_str()),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.cache.in_flight().is_some()
    }

    pub fn can_generate(&self) -> bool {
        self.cache.can_generate(&self.identity())
    }

    pub fn can_open_feedback(&self) -> bool {
        self.view.feedback_form.is_none() && self.cache.can_record_feedback(&self.identity())
    }

    pub fn status(&self) -> StatusFlags {
        StatusFlags {
            is_generating: self.is_generating(),
            can_generate: self.can_generate(),
            can_open_feedback: self.can_open_feedback(),
            has_explanation: self.current_explanation().is_some(),
        }
    }

    pub fn select_snippet(&mut self, snippet_id: &SnippetId) -> Result<(), SessionError> {
        if self.snippets.get(snippet_id).is_none() {
            warn!(snippet_id = %snippet_id, "rejecting unknown snippet");
            return Err(SessionError::UnknownSnippet(snippet_id.clone()));
        }

        let next = self.view.select_snippet(snippet_id.clone());
        self.apply_view(next);
        Ok(())
    }

    pub fn select_style(&mut self, style: ExplanationStyle) {
        let next = self.view.select_style(style);
        self.apply_view(next);
    }

    pub fn select_model(&mut self, model: &ModelId) -> Result<(), SessionError> {
        if !self.models.contains(model) {
            warn!(model = %model, "rejecting unknown model");
            return Err(SessionError::UnknownModel(model.clone()));
        }

        let next = self.view.select_model(model.clone());
        self.apply_view(next);
        Ok(())
    }

    pub fn toggle_error_panel(&mut self) {
        self.view = self.view.toggle_error_panel();
    }

    pub fn select_result_tab(&mut self, tab: ResultTab) {
        let next = self.view.select_result_tab(tab);
        self.apply_view(next);
    }

    /// Starts a generation for the selected identity.
    ///
    /// A locked identity or an occupied slot is rejected without touching any state.
    /// A feedback form open for the same identity is closed, since the
    /// explanation it rates is about to be replaced.
    pub fn request_generation(
        &mut self,
        host: &mut dyn GenerationHost,
    ) -> Result<RunId, SessionError> {
        let identity = self.identity();
        if let Some((run_id, _)) = self.cache.in_flight() {
            debug!(identity = %identity, run_id, "generation rejected: slot busy");
            return Err(GenerationRejected::InFlight { run_id }.into());
        }
        if self.cache.state(&identity) == EntryState::PresentLocked {
            debug!(identity = %identity, "generation rejected: locked");
            return Err(GenerationRejected::Locked.into());
        }

        let snippet = self
            .snippets
            .get(&identity.snippet_id)
            .ok_or_else(|| SessionError::UnknownSnippet(identity.snippet_id.clone()))?;
        let prompt = self
            .formatter
            .format(identity.style, &identity.model, snippet)?;

        let job = GenerationJob {
            identity: identity.clone(),
            system_instruction: prompt.system_instruction,
            user_prompt: prompt.user_prompt,
            options: self.options,
        };
        let run_id = match host.start_generation(job) {
            Ok(run_id) => run_id,
            Err(error) => {
                warn!(identity = %identity, error = %error, "generation host refused job");
                self.push_notice(Notice::error(format!(
                    "Could not start generation: {error}"
                )));
                return Err(SessionError::HostUnavailable(error));
            }
        };

        self.cache.begin(identity.clone(), run_id)?;
        let rates_replaced_explanation = self
            .view
            .feedback_form
            .as_ref()
            .is_some_and(|form| form.identity() == &identity);
        if rates_replaced_explanation {
            debug!(identity = %identity, "closing feedback form for regenerated explanation");
            self.view = self.view.close_feedback_form();
        }
        info!(identity = %identity, run_id, "generation started");
        Ok(run_id)
    }

    pub fn on_generation_finished(&mut self, run_id: RunId, text: String) {
        let Some(identity) = self
            .cache
            .complete(run_id, text, OffsetDateTime::now_utc())
            .map(|explanation| explanation.identity.clone())
        else {
            return;
        };

        info!(identity = %identity, run_id, "explanation stored");
        if identity == self.identity() {
            self.view = self.view.select_result_tab(ResultTab::Improved);
        }
    }

    pub fn on_generation_failed(&mut self, run_id: RunId, cause: &str) {
        let Some(identity) = self.cache.fail(run_id) else {
            return;
        };

        warn!(identity = %identity, run_id, cause, "generation failed");
        self.push_notice(Notice::error(format!("Generation failed: {cause}")));
    }

    pub fn open_feedback_form(&mut self) -> Result<(), SessionError> {
        let identity = self.identity();
        if !self.can_open_feedback() {
            return Err(SessionError::FeedbackUnavailable(identity));
        }

        self.view = self.view.open_feedback_form(identity);
        Ok(())
    }

    pub fn set_feedback_answer(&mut self, question_id: &str, value: bool) -> Result<(), SessionError> {
        let form = self
            .view
            .feedback_form
            .clone()
            .ok_or(SessionError::NoFeedbackForm)?;
        let form = form
            .with_answer(question_id, value)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;

        self.view = self.view.with_feedback_form(form);
        Ok(())
    }

    pub fn cancel_feedback_form(&mut self) {
        self.view = self.view.close_feedback_form();
    }

    /// Stores the open form as a feedback record for the identity it was opened for.
    ///
    /// A storage failure still counts as submitted: the record stays pending in
    /// memory and can be retried with [`Session::retry_feedback_persist`].
    pub fn submit_feedback(&mut self) -> Result<FeedbackSubmitted, SessionError> {
        let form = self
            .view
            .feedback_form
            .clone()
            .ok_or(SessionError::NoFeedbackForm)?;
        if !form.is_complete() {
            return Err(SessionError::IncompleteFeedback {
                missing: form.unanswered(),
            });
        }

        let identity = form.identity().clone();
        if !self.cache.can_record_feedback(&identity) {
            return Err(SessionError::FeedbackUnavailable(identity));
        }
        let snippet_name = self
            .snippets
            .get(&identity.snippet_id)
            .map(|snippet| snippet.display_name.clone())
            .ok_or_else(|| SessionError::UnknownSnippet(identity.snippet_id.clone()))?;

        let record = FeedbackRecord::new(
            identity.snippet_id.as_str(),
            snippet_name,
            identity.style.as_str(),
            identity.model.as_str(),
            form.answers(),
            now_rfc3339()?,
        );

        let submitted = match self.store.append(record) {
            Ok(()) => {
                self.push_notice(Notice::info("Feedback saved"));
                FeedbackSubmitted::Persisted
            }
            Err(FeedbackStoreError::PersistFailed { pending, source }) => {
                warn!(identity = %identity, pending, error = %source, "feedback kept in memory");
                self.push_notice(Notice::error(format!(
                    "Feedback could not be saved ({source}); it is kept and can be retried"
                )));
                FeedbackSubmitted::PendingPersist { pending }
            }
            Err(error) => return Err(error.into()),
        };

        self.cache.record_feedback(&identity);
        self.view = self.view.close_feedback_form();
        info!(identity = %identity, "feedback recorded");
        Ok(submitted)
    }

    /// Retries writing feedback kept in memory after a storage failure.
    pub fn retry_feedback_persist(&mut self) -> Result<usize, SessionError> {
        match self.store.persist_pending() {
            Ok(persisted) => {
                if persisted > 0 {
                    self.push_notice(Notice::info(format!(
                        "Saved {persisted} pending feedback record(s)"
                    )));
                }
                Ok(persisted)
            }
            Err(error) => {
                self.push_notice(Notice::error(format!("Feedback still not saved: {error}")));
                Err(error.into())
            }
        }
    }

    /// Drops feedback that never reached storage.
    pub fn discard_pending_feedback(&mut self) -> usize {
        let discarded = self.store.discard_pending().len();
        if discarded > 0 {
            warn!(discarded, "discarded unsaved feedback");
        }
        discarded
    }

    pub fn export_feedback(&self) -> FeedbackExport {
        self.store.export_all()
    }

    /// Writes the export into `dir`. `None` when there is no feedback yet.
    pub fn export_feedback_to_dir(&mut self, dir: &Path) -> Result<Option<PathBuf>, SessionError> {
        let created_at = now_rfc3339()?;
        match self.store.export_to_dir(dir, &created_at) {
            Ok(Some(path)) => {
                info!(path = %path.display(), records = self.store.len(), "feedback exported");
                Ok(Some(path))
            }
            Ok(None) => {
                self.push_notice(Notice::info("No feedback to export"));
                Ok(None)
            }
            Err(error) => {
                self.push_notice(Notice::error(format!("Export failed: {error}")));
                Err(error.into())
            }
        }
    }

    pub fn dismiss_notices(&mut self) {
        self.notices.clear();
    }

    fn push_notice(&mut self, notice: Notice) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.remove(0);
        }
        self.notices.push(notice);
    }

    fn apply_view(&mut self, next: SessionView) {
        let has_explanation = self.cache.explanation(&next.identity()).is_some();
        self.view = next.reconcile(has_explanation);
    }
}
