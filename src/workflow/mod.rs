// Submission workflow: the state machine and business rules.
//
// The workflow validates preconditions, asks the store for the actual
// state change, and computes notification intents. It performs no chat
// I/O itself; plans go back to the gateway for best-effort delivery.

pub mod confirm;
pub mod evidence;

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DropWardenConfig;
use crate::notify::{
    ChannelMessage, DecisionMarker, EphemeralAck, NotificationPlan, StatusMarker,
};
use crate::store::{StoreError, SubmissionFilter, SubmissionStore};
use crate::submission::{
    Category, Decision, DropId, MessageRef, NewSubmission, Submission, SubmissionStatus, TeamId,
    UserId,
};
use crate::teams::{RoleMatch, Team, TeamRegistry};

pub use confirm::{ConfirmOutcome, ResetConfirmations, ResetToken};
pub use evidence::Attachment;

/// Precondition failures resolved entirely inside the workflow; none of
/// these reach the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("submissions must be posted in #{intake}")]
    WrongChannel { intake: String },

    #[error("no recognized team role on the caller")]
    NoTeamRole,

    #[error("caller holds multiple team roles: {}", .roles.join(", "))]
    AmbiguousTeamRole { roles: Vec<String> },

    #[error("attach an image or pass an image link")]
    MissingEvidence,

    #[error("supply either a link or an attachment, not both")]
    ConflictingEvidence,

    #[error("only one attachment per submission")]
    TooManyAttachments,

    #[error("link does not point at an image: {url}")]
    NotAnImageUrl { url: String },

    #[error("attachment is not an image ({content_type})")]
    NotAnImageAttachment { content_type: String },

    #[error("unknown category: {name}")]
    UnknownCategory { name: String },

    #[error("not a drop id: {input}")]
    BadDropId { input: String },
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("caller lacks the required privilege")]
    Forbidden,

    #[error("submission {id} already decided by {decided_by}")]
    AlreadyDecided { id: DropId, decided_by: UserId },

    /// The store could not persist the change. Nothing was committed;
    /// the caller may retry. The workflow itself never retries.
    #[error("store unavailable, try again")]
    StoreUnavailable,
}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { id } => WorkflowError::NotFound {
                what: format!("submission {id}"),
            },
            StoreError::AlreadyDecided { id, decided_by } => {
                WorkflowError::AlreadyDecided { id, decided_by }
            }
            StoreError::Unavailable { reason } => {
                warn!(reason = %reason, "Store operation failed");
                WorkflowError::StoreUnavailable
            }
        }
    }
}

/// Inbound submit event, as translated by the command layer.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub submitter_id: UserId,
    /// The caller's full role set from the gateway.
    pub roles: Vec<String>,
    /// Channel the command originated from.
    pub channel_name: String,
    pub category: Option<String>,
    pub evidence_url: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Inbound decision event.
#[derive(Debug, Clone)]
pub struct DecideRequest {
    /// Raw caller input; normalized here (`drop-7`, `DROP-007`, `7`).
    pub drop_id: String,
    pub roles: Vec<String>,
    pub decided_by: UserId,
    pub decision: Decision,
    pub comment: Option<String>,
}

/// A committed state change plus the notifications it wants delivered.
#[derive(Debug)]
pub struct WorkflowOutcome {
    pub submission: Submission,
    pub plan: NotificationPlan,
}

/// Aggregate view for a team + category pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSummary {
    pub pending: usize,
    pub confirmed: usize,
    pub rejected: usize,
    pub last_annotation: Option<String>,
}

/// Outcome of the second step of the reset flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The ledger was wiped and the counter restarted.
    Wiped,
    Expired,
    TokenMismatch,
    NoPendingReset,
}

pub struct SubmissionWorkflow<S> {
    store: Arc<S>,
    registry: TeamRegistry,
    intake_channel: String,
    review_channel: String,
    staff_role: String,
    owners: Vec<UserId>,
    mention_staff_on_submit: bool,
    broadcast_submissions_to_team: bool,
    confirmations: ResetConfirmations,
}

impl<S: SubmissionStore> SubmissionWorkflow<S> {
    pub fn new(store: Arc<S>, config: &DropWardenConfig) -> Self {
        Self {
            store,
            registry: config.registry(),
            intake_channel: config.channels.intake.clone(),
            review_channel: config.channels.review.clone(),
            staff_role: config.staff.role_name.clone(),
            owners: config.owners.iter().map(|o| UserId(o.clone())).collect(),
            mention_staff_on_submit: config.notify.mention_staff_on_submit,
            broadcast_submissions_to_team: config.notify.broadcast_submissions_to_team,
            confirmations: ResetConfirmations::new(config.reset.confirmation_window_seconds),
        }
    }

    fn has_staff_role(&self, roles: &[String]) -> bool {
        roles
            .iter()
            .any(|role| role.eq_ignore_ascii_case(&self.staff_role))
    }

    fn is_owner(&self, caller: &UserId) -> bool {
        self.owners.contains(caller)
    }

    /// Record a new submission. Preconditions run in order and
    /// short-circuit: intake channel, exactly one team role, exactly one
    /// image evidence source. Failures cause no store mutation.
    pub async fn submit(&self, request: SubmitRequest) -> Result<WorkflowOutcome, WorkflowError> {
        if !request
            .channel_name
            .eq_ignore_ascii_case(&self.intake_channel)
        {
            return Err(ValidationError::WrongChannel {
                intake: self.intake_channel.clone(),
            }
            .into());
        }

        let team = match self.registry.resolve_team_role(&request.roles) {
            RoleMatch::One(team) => team.clone(),
            RoleMatch::None => return Err(ValidationError::NoTeamRole.into()),
            RoleMatch::Ambiguous(roles) => {
                return Err(ValidationError::AmbiguousTeamRole { roles }.into())
            }
        };

        let category = match &request.category {
            Some(name) => Some(self.registry.category(name).ok_or_else(|| {
                ValidationError::UnknownCategory { name: name.clone() }
            })?),
            None => None,
        };

        let evidence_ref =
            evidence::resolve_evidence(request.evidence_url.as_deref(), &request.attachments)?;

        let submission = self
            .store
            .create(NewSubmission {
                submitter_id: request.submitter_id.clone(),
                team_id: team.id.clone(),
                category,
                evidence_ref,
            })
            .await?;

        info!(
            id = %submission.id,
            submitter = %submission.submitter_id,
            team = %submission.team_id,
            "Submission recorded"
        );

        let plan = self.submit_plan(&submission, &team);
        Ok(WorkflowOutcome { submission, plan })
    }

    fn submit_plan(&self, submission: &Submission, team: &Team) -> NotificationPlan {
        let category_label = submission
            .category
            .as_ref()
            .map(|c| format!(" [{c}]"))
            .unwrap_or_default();

        let review_announcement = ChannelMessage {
            channel_name: self.review_channel.clone(),
            text: format!(
                "{id}{category_label} | {submitter} ({team}) submitted: {evidence}",
                id = submission.id,
                submitter = submission.submitter_id,
                team = team.display_name,
                evidence = submission.evidence_ref,
            ),
        };

        let team_broadcast = self.broadcast_submissions_to_team.then(|| ChannelMessage {
            channel_name: team.channel_name.clone(),
            text: format!(
                "{} sent in {} for review",
                submission.submitter_id, submission.id
            ),
        });

        NotificationPlan {
            review_announcement: Some(review_announcement),
            team_broadcast,
            submitter_ack: Some(EphemeralAck {
                user_id: submission.submitter_id.clone(),
                text: format!("{} received and queued for review", submission.id),
            }),
            staff_mention: self
                .mention_staff_on_submit
                .then(|| self.staff_role.clone()),
            ..NotificationPlan::default()
        }
    }

    /// Confirm or reject a pending submission. The staff check runs
    /// before the lookup so a forbidden caller learns nothing about
    /// whether the id exists.
    pub async fn decide(&self, request: DecideRequest) -> Result<WorkflowOutcome, WorkflowError> {
        if !self.has_staff_role(&request.roles) {
            return Err(WorkflowError::Forbidden);
        }

        let id: DropId = request.drop_id.parse().map_err(|_| {
            ValidationError::BadDropId {
                input: request.drop_id.clone(),
            }
        })?;

        let submission = self
            .store
            .update_status(
                id,
                request.decision,
                request.decided_by.clone(),
                request.comment.clone(),
            )
            .await?;

        info!(
            id = %submission.id,
            status = %submission.status,
            decided_by = %request.decided_by,
            "Submission decided"
        );

        let plan = self.decide_plan(&submission);
        Ok(WorkflowOutcome { submission, plan })
    }

    fn decide_plan(&self, submission: &Submission) -> NotificationPlan {
        let verdict = match submission.status {
            SubmissionStatus::Confirmed => "confirmed",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::Pending => "pending",
        };

        let reason_suffix = submission
            .decision_reason
            .as_ref()
            .map(|r| format!(": {r}"))
            .unwrap_or_default();

        let team_broadcast = self.registry.team(&submission.team_id).map(|team| {
            ChannelMessage {
                channel_name: team.channel_name.clone(),
                text: format!(
                    "@{submitter}: {id} was {verdict}{reason_suffix}",
                    submitter = submission.submitter_id,
                    id = submission.id,
                ),
            }
        });

        // Marker on the original announcement is best-effort: absent
        // when the announcement never posted.
        let status_marker = submission.source_message_ref.clone().map(|message_ref| {
            StatusMarker {
                message_ref,
                marker: match submission.status {
                    SubmissionStatus::Rejected => DecisionMarker::Rejected,
                    _ => DecisionMarker::Confirmed,
                },
            }
        });

        NotificationPlan {
            team_broadcast,
            staff_ack: submission.decided_by.clone().map(|decider| EphemeralAck {
                user_id: decider,
                text: format!("{} {verdict}", submission.id),
            }),
            status_marker,
            ..NotificationPlan::default()
        }
    }

    /// Remember the review-channel announcement for a record so a
    /// decision marker can be attached later. Best-effort: a failure is
    /// logged, never propagated, and never rolls back the creation.
    pub async fn record_announcement(&self, id: DropId, message_ref: MessageRef) {
        if let Err(e) = self.store.attach_message_ref(id, message_ref).await {
            warn!(id = %id, error = %e, "Could not record announcement reference");
        }
    }

    /// Staff-only free-text progress annotation for a team + category
    /// pair. Requires at least one existing submission for the pair;
    /// touches no submission's status.
    pub async fn update_progress(
        &self,
        team_name: &str,
        category_name: &str,
        value: &str,
        roles: &[String],
    ) -> Result<(), WorkflowError> {
        if !self.has_staff_role(roles) {
            return Err(WorkflowError::Forbidden);
        }

        let (team_id, category) = self.resolve_pair(team_name, category_name)?;

        let existing = self
            .store
            .query(SubmissionFilter {
                team_id: Some(team_id.clone()),
                category: Some(category.clone()),
                status: None,
            })
            .await?;
        if existing.is_empty() {
            return Err(WorkflowError::NotFound {
                what: format!("submissions for {team_id}/{category}"),
            });
        }

        self.store.set_progress(&team_id, &category, value).await?;
        info!(team = %team_id, category = %category, "Progress annotation updated");
        Ok(())
    }

    /// Counts by status plus the last progress annotation for a
    /// team + category pair.
    pub async fn query_progress(
        &self,
        team_name: &str,
        category_name: &str,
    ) -> Result<ProgressSummary, WorkflowError> {
        let (team_id, category) = self.resolve_pair(team_name, category_name)?;

        let submissions = self
            .store
            .query(SubmissionFilter {
                team_id: Some(team_id.clone()),
                category: Some(category.clone()),
                status: None,
            })
            .await?;

        let count = |status: SubmissionStatus| {
            submissions.iter().filter(|s| s.status == status).count()
        };

        Ok(ProgressSummary {
            pending: count(SubmissionStatus::Pending),
            confirmed: count(SubmissionStatus::Confirmed),
            rejected: count(SubmissionStatus::Rejected),
            last_annotation: self.store.progress(&team_id, &category).await?,
        })
    }

    fn resolve_pair(
        &self,
        team_name: &str,
        category_name: &str,
    ) -> Result<(TeamId, Category), WorkflowError> {
        let team = self
            .registry
            .find_team(team_name)
            .ok_or_else(|| WorkflowError::NotFound {
                what: format!("team {team_name}"),
            })?;
        let category = self.registry.category(category_name).ok_or_else(|| {
            ValidationError::UnknownCategory {
                name: category_name.to_string(),
            }
        })?;
        Ok((team.id.clone(), category))
    }

    /// First step of the wipe: owners only; issues a confirmation token
    /// that must be echoed back within the configured window. A repeat
    /// call replaces the outstanding token.
    pub async fn begin_reset(
        &self,
        caller: &UserId,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<ResetToken, WorkflowError> {
        if !self.is_owner(caller) {
            return Err(WorkflowError::Forbidden);
        }
        let token = self.confirmations.begin(caller, now).await;
        info!(caller = %caller, expires_at = %token.expires_at, "Reset confirmation issued");
        Ok(token)
    }

    /// Second step of the wipe. A non-owner touching the confirmation is
    /// rejected without consuming the window. A store failure during the
    /// wipe surfaces as `StoreUnavailable`, distinct from `Expired`.
    pub async fn confirm_reset(
        &self,
        caller: &UserId,
        token: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<ResetOutcome, WorkflowError> {
        if !self.is_owner(caller) {
            return Err(WorkflowError::Forbidden);
        }

        match self.confirmations.take(caller, token, now).await {
            ConfirmOutcome::Confirmed => {
                self.store.reset_all().await?;
                info!(caller = %caller, "Ledger wiped by owner");
                Ok(ResetOutcome::Wiped)
            }
            ConfirmOutcome::Expired => {
                info!(caller = %caller, "Reset confirmation expired, wipe cancelled");
                Ok(ResetOutcome::Expired)
            }
            ConfirmOutcome::TokenMismatch => Ok(ResetOutcome::TokenMismatch),
            ConfirmOutcome::NoPendingReset => Ok(ResetOutcome::NoPendingReset),
        }
    }

    /// Unfiltered dump of the ledger for the export surface.
    pub async fn dump(&self) -> Result<Vec<Submission>, WorkflowError> {
        Ok(self.store.query(SubmissionFilter::default()).await?)
    }
}
