//! The yes/no questionnaire shown after an explanation is generated.

use std::collections::BTreeMap;

use crate::catalog::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackQuestion {
    pub id: &'static str,
    pub text: &'static str,
}

pub static FEEDBACK_QUESTIONS: [FeedbackQuestion; 5] = [
    FeedbackQuestion {
        id: "comprehensible",
        text: "Is the error message comprehensible?",
    },
    FeedbackQuestion {
        id: "correct",
        text: "Is the error message correct in its explanation?",
    },
    FeedbackQuestion {
        id: "improvement",
        text: "Is the error message an improvement over the standard one?",
    },
    FeedbackQuestion {
        id: "hasHint",
        text: "Does the error message contain a hint for a possible fix?",
    },
    FeedbackQuestion {
        id: "hintCorrect",
        text: "Is the error message hint actually correct?",
    },
];

#[must_use]
pub fn question(id: &str) -> Option<&'static FeedbackQuestion> {
    FEEDBACK_QUESTIONS.iter().find(|question| question.id == id)
}

/// Answers being collected for one identity.
///
/// The form stays bound to the identity it was opened for, whatever the
/// selection does afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackForm {
    identity: Identity,
    answers: BTreeMap<&'static str, bool>,
}

impl FeedbackForm {
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            answers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Records an answer. `None` for a question that is not in the questionnaire.
    #[must_use]
    pub fn with_answer(mut self, question_id: &str, value: bool) -> Option<Self> {
        let question = question(question_id)?;
        self.answers.insert(question.id, value);
        Some(self)
    }

    #[must_use]
    pub fn answer(&self, question_id: &str) -> Option<bool> {
        self.answers.get(question_id).copied()
    }

    #[must_use]
    pub fn unanswered(&self) -> Vec<&'static str> {
        FEEDBACK_QUESTIONS
            .iter()
            .map(|question| question.id)
            .filter(|id| !self.answers.contains_key(id))
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unanswered().is_empty()
    }

    #[must_use]
    pub fn answers(&self) -> BTreeMap<String, bool> {
        self.answers
            .iter()
            .map(|(id, value)| ((*id).to_string(), *value))
            .collect()
    }
}
