// Core domain types for tracked drop submissions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a tracked submission, rendered as `DROP-NNN`.
///
/// Ids are allocated by the store, start at 1, and are never reused,
/// not even after an administrative reset wipes the ledger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DropId(pub u64);

impl fmt::Display for DropId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Zero-pad to width 3; ids beyond 999 render at natural width.
        write!(f, "DROP-{:03}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a drop id: {input}")]
pub struct ParseDropIdError {
    pub input: String,
}

impl FromStr for DropId {
    type Err = ParseDropIdError;

    /// Accepts caller input in any case, with or without the `DROP-` prefix:
    /// `DROP-007`, `drop-7`, and `7` all parse to the same id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let digits = normalized.strip_prefix("drop-").unwrap_or(&normalized);
        digits
            .parse::<u64>()
            .map(DropId)
            .map_err(|_| ParseDropIdError {
                input: s.to_string(),
            })
    }
}

/// Opaque external user identifier from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId(value.to_string())
    }
}

/// Team slug from the configured roster, e.g. `"the-noobs"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub String);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TeamId {
    fn from(value: &str) -> Self {
        TeamId(value.to_string())
    }
}

/// Classification tag for a submission, validated against the configured
/// category list at submit time. Stored as its string form so records
/// created under an older category list remain readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(pub String);

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Category(value.to_string())
    }
}

/// Review status of a submission. Transitions are monotonic: only
/// `Pending -> Confirmed` and `Pending -> Rejected` are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Confirmed => "confirmed",
            SubmissionStatus::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a submission status: {input}")]
pub struct ParseStatusError {
    pub input: String,
}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(SubmissionStatus::Pending),
            "confirmed" => Ok(SubmissionStatus::Confirmed),
            "rejected" => Ok(SubmissionStatus::Rejected),
            _ => Err(ParseStatusError {
                input: s.to_string(),
            }),
        }
    }
}

/// A staff member's verdict on a pending submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Reject,
}

impl Decision {
    pub fn resulting_status(self) -> SubmissionStatus {
        match self {
            Decision::Confirm => SubmissionStatus::Confirmed,
            Decision::Reject => SubmissionStatus::Rejected,
        }
    }
}

/// Channel + message handle of the review-channel post announcing a
/// submission, kept so a decision marker can be attached to it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_name: String,
    pub message_id: String,
}

/// A tracked drop submission. Everything except `status`, `decided_by`,
/// `decision_reason`, and `source_message_ref` is immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: DropId,
    pub submitter_id: UserId,
    pub team_id: TeamId,
    pub category: Option<Category>,
    pub evidence_ref: String,
    pub status: SubmissionStatus,
    pub decided_by: Option<UserId>,
    pub decision_reason: Option<String>,
    pub source_message_ref: Option<MessageRef>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }
}

/// Fields the workflow hands to the store when creating a record; the
/// store fills in the id, status, and timestamp.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub submitter_id: UserId,
    pub team_id: TeamId,
    pub category: Option<Category>,
    pub evidence_ref: String,
}
