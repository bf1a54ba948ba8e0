use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::FeedbackStoreError;
use crate::paths::FEEDBACK_COLLECTION;

pub const FEEDBACK_SCHEMA_VERSION: u32 = 1;

/// One feedback submission about one generated explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackRecord {
    pub record_id: String,
    pub snippet_id: String,
    pub snippet_name: String,
    pub style: String,
    pub model: String,
    pub answers: BTreeMap<String, bool>,
    pub submitted_at: String,
}

impl FeedbackRecord {
    /// Builds a record with a fresh random id.
    #[must_use]
    pub fn new(
        snippet_id: impl Into<String>,
        snippet_name: impl Into<String>,
        style: impl Into<String>,
        model: impl Into<String>,
        answers: BTreeMap<String, bool>,
        submitted_at: impl Into<String>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4().to_string(),
            snippet_id: snippet_id.into(),
            snippet_name: snippet_name.into(),
            style: style.into(),
            model: model.into(),
            answers,
            submitted_at: submitted_at.into(),
        }
    }

    /// True when this record belongs to the given (snippet, style, model) key.
    #[must_use]
    pub fn matches(&self, snippet_id: &str, style: &str, model: &str) -> bool {
        self.snippet_id == snippet_id && self.style == style && self.model == model
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FeedbackCollection {
    pub version: u32,
    pub collection: String,
    pub records: Vec<FeedbackRecord>,
}

impl FeedbackCollection {
    pub(crate) fn v1(records: Vec<FeedbackRecord>) -> Self {
        Self {
            version: FEEDBACK_SCHEMA_VERSION,
            collection: FEEDBACK_COLLECTION.to_string(),
            records,
        }
    }
}

pub fn now_rfc3339() -> Result<String, FeedbackStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(FeedbackStoreError::ClockFormat)
}

pub(crate) fn validate_rfc3339(index: usize, value: &str) -> Result<(), FeedbackStoreError> {
    if OffsetDateTime::parse(value, &Rfc3339).is_err() {
        return Err(FeedbackStoreError::InvalidTimestamp {
            index,
            value: value.to_string(),
        });
    }

    Ok(())
}
