//! Selection and panel state as an immutable value.
//!
//! Every reducer takes the current view and returns the next one. Anything
//! that needs the explanation cache is passed in as a plain flag, so the
//! transitions can be exercised without a session.

use crate::catalog::{ExplanationStyle, Identity, ModelId, SnippetId};
use crate::feedback::FeedbackForm;

/// Which text the result pane shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultTab {
    #[default]
    StandardError,
    Improved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub snippet_id: SnippetId,
    pub style: ExplanationStyle,
    pub model: ModelId,
    pub error_panel_visible: bool,
    pub result_tab: ResultTab,
    pub feedback_form: Option<FeedbackForm>,
}

impl SessionView {
    #[must_use]
    pub fn new(snippet_id: SnippetId, style: ExplanationStyle, model: ModelId) -> Self {
        Self {
            snippet_id,
            style,
            model,
            error_panel_visible: false,
            result_tab: ResultTab::StandardError,
            feedback_form: None,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(self.snippet_id.clone(), self.style, self.model.clone())
    }

    #[must_use]
    pub fn select_snippet(&self, snippet_id: SnippetId) -> Self {
        Self {
            snippet_id,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn select_style(&self, style: ExplanationStyle) -> Self {
        Self {
            style,
            ..self.clone()
        }
    }

    /// Switching model always returns to the standard error and drops an open form.
    #[must_use]
    pub fn select_model(&self, model: ModelId) -> Self {
        Self {
            model,
            result_tab: ResultTab::StandardError,
            feedback_form: None,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn toggle_error_panel(&self) -> Self {
        Self {
            error_panel_visible: !self.error_panel_visible,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn select_result_tab(&self, result_tab: ResultTab) -> Self {
        Self {
            result_tab,
            ..self.clone()
        }
    }

    /// Falls back to the standard error when the selected identity has nothing to show.
    #[must_use]
    pub fn reconcile(self, has_explanation: bool) -> Self {
        if self.result_tab == ResultTab::Improved && !has_explanation {
            return Self {
                result_tab: ResultTab::StandardError,
                ..self
            };
        }
        self
    }

    /// Opens the questionnaire for `identity` and shows the standard error beside it.
    #[must_use]
    pub fn open_feedback_form(&self, identity: Identity) -> Self {
        Self {
            error_panel_visible: true,
            feedback_form: Some(FeedbackForm::new(identity)),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_feedback_form(&self, form: FeedbackForm) -> Self {
        Self {
            feedback_form: Some(form),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn close_feedback_form(&self) -> Self {
        Self {
            feedback_form: None,
            ..self.clone()
        }
    }
}
