//! Per-identity explanation cache with a single global in-flight slot.
//!
//! An identity is `Absent`, `PresentUnlocked`, `PresentLocked` or `Generating`.
//! A generation only ever writes the cache on success. On failure the slot is
//! released and whatever entry existed before is still there, untouched.

use std::collections::HashMap;
use std::fmt;

use inference_provider::RunId;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::catalog::Identity;

/// How recorded feedback interacts with regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockPolicy {
    /// A fresh explanation is locked until feedback is recorded for it.
    #[default]
    FeedbackUnlocks,
    /// A fresh explanation may be regenerated freely until feedback locks it.
    FeedbackLocks,
}

impl LockPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FeedbackUnlocks => "feedback-unlocks",
            Self::FeedbackLocks => "feedback-locks",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "feedback-unlocks" => Some(Self::FeedbackUnlocks),
            "feedback-locks" => Some(Self::FeedbackLocks),
            _ => None,
        }
    }

    fn is_locked(self, feedback_recorded: bool) -> bool {
        match self {
            Self::FeedbackUnlocks => !feedback_recorded,
            Self::FeedbackLocks => feedback_recorded,
        }
    }
}

impl fmt::Display for LockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub identity: Identity,
    pub content: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Absent,
    PresentUnlocked,
    PresentLocked,
    Generating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GenerationRejected {
    #[error("run {run_id} is already generating")]
    InFlight { run_id: RunId },
    #[error("regeneration is locked pending feedback")]
    Locked,
}

#[derive(Debug, Clone)]
struct Entry {
    explanation: Explanation,
    feedback_recorded: bool,
}

#[derive(Debug, Clone)]
struct InFlight {
    run_id: RunId,
    identity: Identity,
}

#[derive(Debug, Clone)]
pub struct ExplanationCache {
    policy: LockPolicy,
    entries: HashMap<Identity, Entry>,
    in_flight: Option<InFlight>,
}

impl ExplanationCache {
    #[must_use]
    pub fn new(policy: LockPolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
            in_flight: None,
        }
    }

    #[must_use]
    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    #[must_use]
    pub fn state(&self, identity: &Identity) -> EntryState {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| &in_flight.identity == identity)
        {
            return EntryState::Generating;
        }

        match self.entries.get(identity) {
            None => EntryState::Absent,
            Some(entry) if self.policy.is_locked(entry.feedback_recorded) => {
                EntryState::PresentLocked
            }
            Some(_) => EntryState::PresentUnlocked,
        }
    }

    #[must_use]
    pub fn can_generate(&self, identity: &Identity) -> bool {
        self.in_flight.is_none() && self.state(identity) != EntryState::PresentLocked
    }

    /// Claims the in-flight slot for `identity`. Nothing changes when rejected.
    pub fn begin(&mut self, identity: Identity, run_id: RunId) -> Result<(), GenerationRejected> {
        if let Some(in_flight) = &self.in_flight {
            return Err(GenerationRejected::InFlight {
                run_id: in_flight.run_id,
            });
        }
        if self.state(&identity) == EntryState::PresentLocked {
            return Err(GenerationRejected::Locked);
        }

        debug!(run_id, identity = %identity, "generation slot claimed");
        self.in_flight = Some(InFlight { run_id, identity });
        Ok(())
    }

    /// Stores a successful result, replacing any prior explanation for the identity.
    ///
    /// Returns `None` for a run that does not hold the slot.
    pub fn complete(
        &mut self,
        run_id: RunId,
        content: String,
        created_at: OffsetDateTime,
    ) -> Option<&Explanation> {
        let identity = self.release(run_id)?;
        let entry = Entry {
            explanation: Explanation {
                identity: identity.clone(),
                content,
                created_at,
            },
            feedback_recorded: false,
        };

        self.entries.insert(identity.clone(), entry);
        self.explanation(&identity)
    }

    /// Releases the slot after a failed run. Returns the identity it was generating.
    pub fn fail(&mut self, run_id: RunId) -> Option<Identity> {
        self.release(run_id)
    }

    #[must_use]
    pub fn can_record_feedback(&self, identity: &Identity) -> bool {
        !matches!(self.state(identity), EntryState::Absent | EntryState::Generating)
            && self
                .entries
                .get(identity)
                .is_some_and(|entry| !entry.feedback_recorded)
    }

    /// Marks the current explanation for `identity` as reviewed.
    ///
    /// Returns false when there is nothing to review.
    pub fn record_feedback(&mut self, identity: &Identity) -> bool {
        if !self.can_record_feedback(identity) {
            return false;
        }

        match self.entries.get_mut(identity) {
            Some(entry) => {
                entry.feedback_recorded = true;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn explanation(&self, identity: &Identity) -> Option<&Explanation> {
        self.entries.get(identity).map(|entry| &entry.explanation)
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<(RunId, &Identity)> {
        self.in_flight
            .as_ref()
            .map(|in_flight| (in_flight.run_id, &in_flight.identity))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn release(&mut self, run_id: RunId) -> Option<Identity> {
        match self.in_flight.as_ref().map(|in_flight| in_flight.run_id) {
            Some(active_run_id) if active_run_id == run_id => {
                self.in_flight.take().map(|in_flight| in_flight.identity)
            }
            Some(active_run_id) => {
                warn!(run_id, active_run_id, "ignoring stale generation outcome");
                None
            }
            None => {
                warn!(run_id, "ignoring generation outcome with no active run");
                None
            }
        }
    }
}

impl Default for ExplanationCache {
    fn default() -> Self {
        Self::new(LockPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ExplanationStyle, ModelId, SnippetId};

    fn identity(snippet: &str, style: ExplanationStyle) -> Identity {
        Identity::new(SnippetId::from(snippet), style, ModelId::from("phi3:latest"))
    }

    fn now() -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH
    }

    #[test]
    fn absent_identity_moves_through_generating_to_present() {
        let mut cache = ExplanationCache::new(LockPolicy::FeedbackLocks);
        let id = identity("snippet-1", ExplanationStyle::Pragmatic);

        assert_eq!(cache.state(&id), EntryState::Absent);
        cache.begin(id.clone(), 1).expect("slot is free");
        assert_eq!(cache.state(&id), EntryState::Generating);
        assert!(!cache.can_generate(&id));

        let stored = cache.complete(1, "better".to_string(), now()).cloned();
        assert_eq!(stored.map(|e| e.content), Some("better".to_string()));
        assert_eq!(cache.state(&id), EntryState::PresentUnlocked);
        assert!(cache.in_flight().is_none());
    }

    #[test]
    fn success_replaces_prior_explanation_without_duplicating() {
        let mut cache = ExplanationCache::new(LockPolicy::FeedbackLocks);
        let id = identity("snippet-1", ExplanationStyle::Pragmatic);

        cache.begin(id.clone(), 1).expect("begin");
        cache.complete(1, "first".to_string(), now());
        cache.begin(id.clone(), 2).expect("unlocked entry regenerates");
        cache.complete(2, "second".to_string(), now());

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.explanation(&id).map(|e| e.content.as_str()),
            Some("second")
        );
    }

    #[test]
    fn failure_restores_prior_state_including_lock() {
        let mut cache = ExplanationCache::new(LockPolicy::FeedbackUnlocks);
        let id = identity("snippet-2", ExplanationStyle::Contingent);

        cache.begin(id.clone(), 1).expect("begin");
        cache.complete(1, "kept".to_string(), now());
        assert!(cache.record_feedback(&id));
        assert_eq!(cache.state(&id), EntryState::PresentUnlocked);

        cache.begin(id.clone(), 2).expect("feedback unlocked regeneration");
        assert_eq!(cache.fail(2), Some(id.clone()));

        assert_eq!(cache.state(&id), EntryState::PresentUnlocked);
        assert_eq!(cache.explanation(&id).map(|e| e.content.as_str()), Some("kept"));
    }

    #[test]
    fn locked_identity_rejects_begin_without_changes() {
        let mut cache = ExplanationCache::new(LockPolicy::FeedbackUnlocks);
        let id = identity("snippet-1", ExplanationStyle::Pragmatic);

        cache.begin(id.clone(), 1).expect("begin");
        cache.complete(1, "fresh".to_string(), now());
        assert_eq!(cache.state(&id), EntryState::PresentLocked);

        assert_eq!(cache.begin(id.clone(), 2), Err(GenerationRejected::Locked));
        assert!(cache.in_flight().is_none());
        assert_eq!(cache.state(&id), EntryState::PresentLocked);
    }

    #[test]
    fn single_slot_rejects_other_identities_while_generating() {
        let mut cache = ExplanationCache::default();
        let first = identity("snippet-1", ExplanationStyle::Pragmatic);
        let second = identity("snippet-3", ExplanationStyle::Pragmatic);

        cache.begin(first.clone(), 7).expect("begin");
        assert!(!cache.can_generate(&second));
        assert_eq!(
            cache.begin(second.clone(), 8),
            Err(GenerationRejected::InFlight { run_id: 7 })
        );
        assert_eq!(cache.in_flight(), Some((7, &first)));
    }

    #[test]
    fn stale_outcomes_are_ignored() {
        let mut cache = ExplanationCache::default();
        let id = identity("snippet-1", ExplanationStyle::Pragmatic);

        assert!(cache.complete(3, "nobody asked".to_string(), now()).is_none());
        cache.begin(id.clone(), 4).expect("begin");
        assert!(cache.complete(3, "stale".to_string(), now()).is_none());
        assert_eq!(cache.fail(3), None);

        assert_eq!(cache.state(&id), EntryState::Generating);
        assert!(cache.is_empty());
    }

    #[test]
    fn feedback_can_be_recorded_once_per_generation() {
        let mut cache = ExplanationCache::new(LockPolicy::FeedbackLocks);
        let id = identity("snippet-4", ExplanationStyle::Pragmatic);

        assert!(!cache.record_feedback(&id));
        cache.begin(id.clone(), 1).expect("begin");
        cache.complete(1, "text".to_string(), now());

        assert!(cache.can_record_feedback(&id));
        assert!(cache.record_feedback(&id));
        assert!(!cache.record_feedback(&id));
        assert_eq!(cache.state(&id), EntryState::PresentLocked);
        assert!(!cache.can_generate(&id));
    }

    #[test]
    fn lock_policy_parses_its_own_names() {
        for policy in [LockPolicy::FeedbackUnlocks, LockPolicy::FeedbackLocks] {
            assert_eq!(LockPolicy::parse(policy.as_str()), Some(policy));
        }
        assert_eq!(LockPolicy::parse("always"), None);
    }
}
