// Timed two-step confirmation for the administrative wipe.
//
// The earlier bot revisions waited on a raw follow-up message inside
// the handler; here the pending confirmation is explicit state keyed by
// caller, checked against an injected clock so nothing sleeps.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::submission::UserId;

/// Token handed back from `begin`; the caller must echo it within the
/// window for the wipe to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Token matched within the window; the pending entry is consumed.
    Confirmed,
    /// The window elapsed; the pending entry is discarded.
    Expired,
    /// Wrong token; the pending entry stays live.
    TokenMismatch,
    /// Nothing pending for this caller.
    NoPendingReset,
}

struct PendingReset {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Registry of outstanding reset confirmations, at most one per caller.
pub struct ResetConfirmations {
    window: Duration,
    pending: Mutex<HashMap<UserId, PendingReset>>,
}

impl ResetConfirmations {
    pub fn new(window_seconds: u64) -> Self {
        Self {
            window: Duration::seconds(window_seconds as i64),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh token for the caller, replacing any outstanding one.
    pub async fn begin(&self, caller: &UserId, now: DateTime<Utc>) -> ResetToken {
        let token = ResetToken {
            token: Uuid::new_v4().to_string(),
            expires_at: now + self.window,
        };
        let mut pending = self.pending.lock().await;
        pending.insert(
            caller.clone(),
            PendingReset {
                token: token.token.clone(),
                expires_at: token.expires_at,
            },
        );
        token
    }

    /// Check a follow-up against the caller's pending confirmation.
    pub async fn take(&self, caller: &UserId, token: &str, now: DateTime<Utc>) -> ConfirmOutcome {
        let mut pending = self.pending.lock().await;
        let Some(entry) = pending.get(caller) else {
            return ConfirmOutcome::NoPendingReset;
        };

        if now > entry.expires_at {
            pending.remove(caller);
            return ConfirmOutcome::Expired;
        }

        if entry.token != token {
            return ConfirmOutcome::TokenMismatch;
        }

        pending.remove(caller);
        ConfirmOutcome::Confirmed
    }
}
