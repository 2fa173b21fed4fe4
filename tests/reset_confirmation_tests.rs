// The owner-gated, timed two-step wipe.

use std::sync::Arc;

use chrono::{Duration, Utc};

use drop_warden::store::InMemoryStore;
use drop_warden::workflow::{ResetOutcome, SubmissionWorkflow, SubmitRequest};
use drop_warden::{DropWardenConfig, SubmissionStore, UserId, WorkflowError};

fn test_config() -> DropWardenConfig {
    let mut config = DropWardenConfig::default();
    config.owners = vec!["owner-1".to_string(), "owner-2".to_string()];
    config
}

fn workflow() -> (Arc<InMemoryStore>, SubmissionWorkflow<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let workflow = SubmissionWorkflow::new(store.clone(), &test_config());
    (store, workflow)
}

async fn seed(workflow: &SubmissionWorkflow<InMemoryStore>) {
    workflow
        .submit(SubmitRequest {
            submitter_id: UserId::from("U1"),
            roles: vec!["Team The Noobs".to_string()],
            channel_name: "drop-submissions".to_string(),
            category: None,
            evidence_url: Some("http://x.com/a.png".to_string()),
            attachments: vec![],
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn owner_confirms_within_window_and_the_ledger_is_wiped() {
    let (store, workflow) = workflow();
    seed(&workflow).await;

    let owner = UserId::from("owner-1");
    let now = Utc::now();
    let token = workflow.begin_reset(&owner, now).await.unwrap();
    assert_eq!(token.expires_at, now + Duration::seconds(30));

    let outcome = workflow
        .confirm_reset(&owner, &token.token, now + Duration::seconds(10))
        .await
        .unwrap();
    assert_eq!(outcome, ResetOutcome::Wiped);

    assert!(store
        .query(Default::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn late_confirmation_cancels_the_wipe() {
    let (store, workflow) = workflow();
    seed(&workflow).await;

    let owner = UserId::from("owner-1");
    let now = Utc::now();
    let token = workflow.begin_reset(&owner, now).await.unwrap();

    let outcome = workflow
        .confirm_reset(&owner, &token.token, now + Duration::seconds(31))
        .await
        .unwrap();
    assert_eq!(outcome, ResetOutcome::Expired);

    // Nothing was deleted.
    assert_eq!(store.query(Default::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn non_owner_cannot_start_or_finish_a_reset() {
    let (store, workflow) = workflow();
    seed(&workflow).await;

    let intruder = UserId::from("U1");
    let now = Utc::now();
    assert!(matches!(
        workflow.begin_reset(&intruder, now).await.unwrap_err(),
        WorkflowError::Forbidden
    ));

    // An owner's pending confirmation is not consumed by an intruder
    // poking at it.
    let owner = UserId::from("owner-1");
    let token = workflow.begin_reset(&owner, now).await.unwrap();
    assert!(matches!(
        workflow
            .confirm_reset(&intruder, &token.token, now + Duration::seconds(1))
            .await
            .unwrap_err(),
        WorkflowError::Forbidden
    ));

    let outcome = workflow
        .confirm_reset(&owner, &token.token, now + Duration::seconds(2))
        .await
        .unwrap();
    assert_eq!(outcome, ResetOutcome::Wiped);
    assert!(store.query(Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn confirmations_are_scoped_per_owner() {
    let (_store, workflow) = workflow();
    seed(&workflow).await;

    let now = Utc::now();
    let first = UserId::from("owner-1");
    let second = UserId::from("owner-2");
    let token = workflow.begin_reset(&first, now).await.unwrap();

    // The other owner has nothing pending, even with a valid token string.
    let outcome = workflow
        .confirm_reset(&second, &token.token, now + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(outcome, ResetOutcome::NoPendingReset);
}

#[tokio::test]
async fn confirming_without_a_pending_request_is_a_noop() {
    let (store, workflow) = workflow();
    seed(&workflow).await;

    let outcome = workflow
        .confirm_reset(&UserId::from("owner-1"), "whatever", Utc::now())
        .await
        .unwrap();
    assert_eq!(outcome, ResetOutcome::NoPendingReset);
    assert_eq!(store.query(Default::default()).await.unwrap().len(), 1);
}
