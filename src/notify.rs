// Outbound notification intents and best-effort delivery.
//
// The workflow computes a NotificationPlan; actually posting it is the
// chat gateway's job, behind the Notifier trait. Delivery never blocks
// or rolls back a committed state transition: failures are collected
// into a DeliveryReport and surfaced as a degraded-delivery warning.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::submission::{MessageRef, UserId};

/// A message targeted at a named channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub channel_name: String,
    pub text: String,
}

/// An acknowledgment visible only to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemeralAck {
    pub user_id: UserId,
    pub text: String,
}

/// Visual marker attached to the original review announcement after a
/// decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionMarker {
    Confirmed,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMarker {
    pub message_ref: MessageRef,
    pub marker: DecisionMarker,
}

/// Everything a successful workflow operation wants delivered.
/// Unset slots simply mean the operation produced no such intent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPlan {
    /// Announcement posted to the review channel (submit).
    pub review_announcement: Option<ChannelMessage>,
    /// Broadcast to the submitter's team channel.
    pub team_broadcast: Option<ChannelMessage>,
    /// Acknowledgment back to the submitter.
    pub submitter_ack: Option<EphemeralAck>,
    /// Acknowledgment back to the deciding staff member.
    pub staff_ack: Option<EphemeralAck>,
    /// Staff role to mention in the review announcement.
    pub staff_mention: Option<String>,
    /// Best-effort marker for the original announcement (decide).
    pub status_marker: Option<StatusMarker>,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("channel #{channel} unavailable")]
    ChannelUnavailable { channel: String },

    #[error("delivery failed: {reason}")]
    Failed { reason: String },
}

/// Outbound side of the chat gateway.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post a channel message, returning a handle usable for later
    /// marker attachment.
    async fn post_channel_message(
        &self,
        message: &ChannelMessage,
    ) -> Result<MessageRef, DeliveryError>;

    async fn send_ephemeral(&self, ack: &EphemeralAck) -> Result<(), DeliveryError>;

    async fn add_status_marker(&self, marker: &StatusMarker) -> Result<(), DeliveryError>;
}

/// What came of delivering a plan. `failures` being non-empty is the
/// degraded-delivery warning; the underlying state change already
/// committed either way.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Handle of the posted review announcement, when one was delivered.
    pub review_message_ref: Option<MessageRef>,
    pub failures: Vec<String>,
}

impl DeliveryReport {
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Deliver every intent in the plan, best-effort.
pub async fn deliver_plan(notifier: &dyn Notifier, plan: &NotificationPlan) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    if let Some(announcement) = &plan.review_announcement {
        // The staff mention rides on the announcement itself rather
        // than going out as a separate message.
        let message = match &plan.staff_mention {
            Some(role) => ChannelMessage {
                channel_name: announcement.channel_name.clone(),
                text: format!("@{role} {}", announcement.text),
            },
            None => announcement.clone(),
        };
        match notifier.post_channel_message(&message).await {
            Ok(message_ref) => report.review_message_ref = Some(message_ref),
            Err(e) => report
                .failures
                .push(format!("review announcement: {e}")),
        }
    }

    if let Some(broadcast) = &plan.team_broadcast {
        if let Err(e) = notifier.post_channel_message(broadcast).await {
            report.failures.push(format!("team broadcast: {e}"));
        }
    }

    if let Some(ack) = &plan.submitter_ack {
        if let Err(e) = notifier.send_ephemeral(ack).await {
            report.failures.push(format!("submitter ack: {e}"));
        }
    }

    if let Some(ack) = &plan.staff_ack {
        if let Err(e) = notifier.send_ephemeral(ack).await {
            report.failures.push(format!("staff ack: {e}"));
        }
    }

    if let Some(marker) = &plan.status_marker {
        if let Err(e) = notifier.add_status_marker(marker).await {
            report.failures.push(format!("status marker: {e}"));
        }
    }

    if report.is_degraded() {
        warn!(failures = ?report.failures, "Notification delivery degraded");
    }

    report
}
