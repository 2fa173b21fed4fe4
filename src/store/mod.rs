// Durable keyed storage for submission records.
//
// The store owns the monotonic id sequence and performs every status
// check-and-set itself, so callers never race on either. Two
// implementations share one trait: the JSON snapshot store used in
// production and an in-memory store for tests.

pub mod json_file;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::submission::{
    Category, Decision, DropId, MessageRef, NewSubmission, Submission, SubmissionStatus, TeamId,
    UserId,
};

pub use json_file::JsonFileStore;
pub use memory::InMemoryStore;

/// Version tag written into the persisted state and checked on load.
pub(crate) const STATE_VERSION: &str = "1";

/// Errors surfaced by store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("submission {id} not found")]
    NotFound { id: DropId },

    #[error("submission {id} already decided by {decided_by}")]
    AlreadyDecided { id: DropId, decided_by: UserId },

    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Unavailable {
            reason: format!("io error: {e}"),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Unavailable {
            reason: format!("serialization error: {e}"),
        }
    }
}

/// Criteria for `query`; unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub team_id: Option<TeamId>,
    pub category: Option<Category>,
    pub status: Option<SubmissionStatus>,
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        if let Some(team_id) = &self.team_id {
            if &submission.team_id != team_id {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if submission.category.as_ref() != Some(category) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if submission.status != status {
                return false;
            }
        }
        true
    }
}

/// The persisted shape: `{ version, counter, records, progress }`.
///
/// Records are keyed by id in a BTreeMap so iteration is stable and
/// ascending. Progress annotations are aggregate metadata keyed by
/// team + category, independent of any record's status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoreState {
    pub version: String,
    /// Next id to assign. Only a full wipe resets this to 1.
    pub counter: u64,
    pub records: BTreeMap<u64, Submission>,
    pub progress: BTreeMap<String, String>,
}

impl StoreState {
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            counter: 1,
            records: BTreeMap::new(),
            progress: BTreeMap::new(),
        }
    }

    pub fn progress_key(team_id: &TeamId, category: &Category) -> String {
        format!("{team_id}/{category}")
    }

    /// Allocates the next id and inserts a pending record.
    pub fn allocate(&mut self, new: NewSubmission, now: DateTime<Utc>) -> Submission {
        let id = DropId(self.counter);
        self.counter += 1;

        let submission = Submission {
            id,
            submitter_id: new.submitter_id,
            team_id: new.team_id,
            category: new.category,
            evidence_ref: new.evidence_ref,
            status: SubmissionStatus::Pending,
            decided_by: None,
            decision_reason: None,
            source_message_ref: None,
            created_at: now,
        };
        self.records.insert(id.0, submission.clone());
        submission
    }

    /// Conditional status update: fails unless the record is still pending.
    pub fn apply_decision(
        &mut self,
        id: DropId,
        decision: Decision,
        decided_by: UserId,
        reason: Option<String>,
    ) -> Result<Submission, StoreError> {
        let record = self
            .records
            .get_mut(&id.0)
            .ok_or(StoreError::NotFound { id })?;

        if record.status != SubmissionStatus::Pending {
            return Err(StoreError::AlreadyDecided {
                id,
                decided_by: record
                    .decided_by
                    .clone()
                    .unwrap_or_else(|| UserId("unknown".to_string())),
            });
        }

        record.status = decision.resulting_status();
        record.decided_by = Some(decided_by);
        record.decision_reason = reason;
        Ok(record.clone())
    }

    pub fn attach(&mut self, id: DropId, message_ref: MessageRef) -> Result<(), StoreError> {
        let record = self
            .records
            .get_mut(&id.0)
            .ok_or(StoreError::NotFound { id })?;
        record.source_message_ref = Some(message_ref);
        Ok(())
    }

    pub fn select(&self, filter: &SubmissionFilter) -> Vec<Submission> {
        self.records
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect()
    }
}

/// Storage contract for submission records.
///
/// Every mutating call is durably persisted before it returns success,
/// and the persisted representation is the sole source of truth on
/// restart. Implementations serialize mutation internally, which makes
/// id allocation atomic, makes `update_status` a check-and-set, and
/// keeps `reset_all` mutually exclusive with in-flight writes.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Allocate the next id and persist a new pending record.
    async fn create(&self, new: NewSubmission) -> Result<Submission, StoreError>;

    async fn get(&self, id: DropId) -> Result<Submission, StoreError>;

    /// Transition a pending record to its decided status. Returns
    /// `AlreadyDecided` (with the prior decider) when the record has
    /// already left `Pending`.
    async fn update_status(
        &self,
        id: DropId,
        decision: Decision,
        decided_by: UserId,
        reason: Option<String>,
    ) -> Result<Submission, StoreError>;

    /// Associate the review-channel announcement with a record.
    /// Best-effort from the workflow's point of view: failure here never
    /// rolls back the creation.
    async fn attach_message_ref(&self, id: DropId, message_ref: MessageRef)
        -> Result<(), StoreError>;

    /// Records matching the filter, in ascending id order.
    async fn query(&self, filter: SubmissionFilter) -> Result<Vec<Submission>, StoreError>;

    /// Set the free-text progress annotation for a team + category pair.
    async fn set_progress(
        &self,
        team_id: &TeamId,
        category: &Category,
        value: &str,
    ) -> Result<(), StoreError>;

    /// Last progress annotation for a team + category pair, if any.
    async fn progress(
        &self,
        team_id: &TeamId,
        category: &Category,
    ) -> Result<Option<String>, StoreError>;

    /// Wipe all records and annotations and reset the counter to 1.
    async fn reset_all(&self) -> Result<(), StoreError>;
}
