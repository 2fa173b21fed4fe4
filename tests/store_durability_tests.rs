// Durability and concurrency contract of the JSON snapshot store.

use std::collections::BTreeSet;
use std::sync::Arc;

use tempfile::TempDir;

use drop_warden::store::JsonFileStore;
use drop_warden::{
    Category, Decision, DropId, MessageRef, NewSubmission, StoreError, SubmissionFilter,
    SubmissionStatus, SubmissionStore, TeamId, UserId,
};

fn new_submission(submitter: &str) -> NewSubmission {
    NewSubmission {
        submitter_id: UserId::from(submitter),
        team_id: TeamId::from("the-noobs"),
        category: Some(Category::from("zulrah")),
        evidence_ref: "http://x.com/a.png".to_string(),
    }
}

#[tokio::test]
async fn created_record_survives_a_restart_identically() {
    let temp_dir = TempDir::new().unwrap();

    let original = {
        let store = JsonFileStore::open(temp_dir.path()).await.unwrap();
        let created = store.create(new_submission("U1")).await.unwrap();
        store
            .attach_message_ref(
                created.id,
                MessageRef {
                    channel_name: "drop-review".to_string(),
                    message_id: "m-42".to_string(),
                },
            )
            .await
            .unwrap();
        store.get(created.id).await.unwrap()
    };

    // Reopen from disk only.
    let store = JsonFileStore::open(temp_dir.path()).await.unwrap();
    let reloaded = store.get(original.id).await.unwrap();
    assert_eq!(reloaded, original);
}

#[tokio::test]
async fn decision_survives_a_restart() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = JsonFileStore::open(temp_dir.path()).await.unwrap();
        let created = store.create(new_submission("U1")).await.unwrap();
        store
            .update_status(
                created.id,
                Decision::Reject,
                UserId::from("U9"),
                Some("duplicate of DROP-002".to_string()),
            )
            .await
            .unwrap();
    }

    let store = JsonFileStore::open(temp_dir.path()).await.unwrap();
    let reloaded = store.get(DropId(1)).await.unwrap();
    assert_eq!(reloaded.status, SubmissionStatus::Rejected);
    assert_eq!(reloaded.decided_by, Some(UserId::from("U9")));
    assert_eq!(
        reloaded.decision_reason.as_deref(),
        Some("duplicate of DROP-002")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_allocate_a_dense_unique_id_range() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::open(temp_dir.path()).await.unwrap());

    // Seed the counter away from 1 so the range check is meaningful.
    let seed = store.create(new_submission("U0")).await.unwrap();
    let k = seed.id.0 + 1;

    let n = 20u64;
    let handles: Vec<_> = (0..n)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .create(new_submission(&format!("U{i}")))
                    .await
                    .unwrap()
                    .id
            })
        })
        .collect();

    let mut ids = BTreeSet::new();
    for result in futures::future::join_all(handles).await {
        assert!(ids.insert(result.unwrap().0), "duplicate id allocated");
    }

    let expected: BTreeSet<u64> = (k..k + n).collect();
    assert_eq!(ids, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_decisions_let_exactly_one_win() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::open(temp_dir.path()).await.unwrap());
    let created = store.create(new_submission("U1")).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            let id = created.id;
            tokio::spawn(async move {
                store
                    .update_status(
                        id,
                        if i % 2 == 0 {
                            Decision::Confirm
                        } else {
                            Decision::Reject
                        },
                        UserId::from(format!("staff-{i}").as_str()),
                        None,
                    )
                    .await
            })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(StoreError::AlreadyDecided { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(winners, 1);

    // The stored decider matches whoever won; later attempts changed nothing.
    let record = store.get(created.id).await.unwrap();
    assert_ne!(record.status, SubmissionStatus::Pending);
    assert!(record.decided_by.is_some());
}

#[tokio::test]
async fn reset_wipes_records_and_restarts_the_counter() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::open(temp_dir.path()).await.unwrap();

    for i in 0..3 {
        store
            .create(new_submission(&format!("U{i}")))
            .await
            .unwrap();
    }
    store.reset_all().await.unwrap();

    let created = store.create(new_submission("U7")).await.unwrap();
    assert_eq!(created.id, DropId(1));

    let all = store.query(SubmissionFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].submitter_id, UserId::from("U7"));
}

#[tokio::test]
async fn reset_counter_state_survives_a_restart() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = JsonFileStore::open(temp_dir.path()).await.unwrap();
        store.create(new_submission("U1")).await.unwrap();
        store.create(new_submission("U2")).await.unwrap();
        store.reset_all().await.unwrap();
    }

    let store = JsonFileStore::open(temp_dir.path()).await.unwrap();
    let created = store.create(new_submission("U3")).await.unwrap();
    assert_eq!(created.id, DropId(1));
}

#[tokio::test]
async fn query_returns_records_in_ascending_id_order() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::open(temp_dir.path()).await.unwrap();

    for i in 0..5 {
        store
            .create(new_submission(&format!("U{i}")))
            .await
            .unwrap();
    }

    let all = store.query(SubmissionFilter::default()).await.unwrap();
    let ids: Vec<u64> = all.iter().map(|s| s.id.0).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn attaching_to_a_missing_record_reports_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::open(temp_dir.path()).await.unwrap();

    let result = store
        .attach_message_ref(
            DropId(99),
            MessageRef {
                channel_name: "drop-review".to_string(),
                message_id: "m-1".to_string(),
            },
        )
        .await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}
