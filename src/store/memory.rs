use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{StoreError, StoreState, SubmissionFilter, SubmissionStore};
use crate::submission::{
    Category, Decision, DropId, MessageRef, NewSubmission, Submission, TeamId, UserId,
};

/// Volatile store with the same contract as the durable one, minus the
/// on-disk snapshot. This is the shape the earliest revisions of the bot
/// used (a dict and a counter); it survives here for tests and for
/// wiring the workflow without touching the filesystem.
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn create(&self, new: NewSubmission) -> Result<Submission, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.allocate(new, Utc::now()))
    }

    async fn get(&self, id: DropId) -> Result<Submission, StoreError> {
        let state = self.state.lock().await;
        state
            .records
            .get(&id.0)
            .cloned()
            .ok_or(StoreError::NotFound { id })
    }

    async fn update_status(
        &self,
        id: DropId,
        decision: Decision,
        decided_by: UserId,
        reason: Option<String>,
    ) -> Result<Submission, StoreError> {
        let mut state = self.state.lock().await;
        state.apply_decision(id, decision, decided_by, reason)
    }

    async fn attach_message_ref(
        &self,
        id: DropId,
        message_ref: MessageRef,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.attach(id, message_ref)
    }

    async fn query(&self, filter: SubmissionFilter) -> Result<Vec<Submission>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.select(&filter))
    }

    async fn set_progress(
        &self,
        team_id: &TeamId,
        category: &Category,
        value: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state
            .progress
            .insert(StoreState::progress_key(team_id, category), value.to_string());
        Ok(())
    }

    async fn progress(
        &self,
        team_id: &TeamId,
        category: &Category,
    ) -> Result<Option<String>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .progress
            .get(&StoreState::progress_key(team_id, category))
            .cloned())
    }

    async fn reset_all(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        *state = StoreState::new();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::SubmissionStatus;

    fn new_submission() -> NewSubmission {
        NewSubmission {
            submitter_id: UserId::from("U1"),
            team_id: TeamId::from("the-noobs"),
            category: None,
            evidence_ref: "http://x.com/a.png".to_string(),
        }
    }

    #[tokio::test]
    async fn default_store_starts_counting_at_one() {
        let store = InMemoryStore::default();
        let created = store.create(new_submission()).await.unwrap();
        assert_eq!(created.id, DropId(1));
    }

    #[tokio::test]
    async fn reset_restarts_the_counter() {
        let store = InMemoryStore::new();
        store.create(new_submission()).await.unwrap();
        store.create(new_submission()).await.unwrap();

        store.reset_all().await.unwrap();

        let created = store.create(new_submission()).await.unwrap();
        assert_eq!(created.id, DropId(1));
        let all = store.query(SubmissionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, SubmissionStatus::Pending);
    }
}
