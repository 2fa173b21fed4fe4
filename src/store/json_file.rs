use chrono::Utc;
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{StoreError, StoreState, SubmissionFilter, SubmissionStore, STATE_VERSION};
use crate::submission::{
    Category, Decision, DropId, MessageRef, NewSubmission, Submission, TeamId, UserId,
};
use async_trait::async_trait;

const STATE_FILE: &str = "submissions.json";
const LOCK_FILE: &str = "store.lock";

/// Durable submission store backed by a single JSON snapshot file.
///
/// All mutation happens under one async mutex: the candidate state is
/// persisted (temp file + rename, so the on-disk snapshot is replaced
/// atomically) before the in-memory copy is committed. A failed persist
/// therefore leaves nothing behind for `get`/`query` to see. The mutex
/// also makes `update_status` an atomic check-and-set and keeps
/// `reset_all` exclusive with in-flight writes.
///
/// An fd-lock on the state directory guards against a second process
/// opening the same ledger.
pub struct JsonFileStore {
    state_file: PathBuf,
    state: Mutex<StoreState>,
    _lock_guard: RwLockWriteGuard<'static, File>,
}

impl JsonFileStore {
    /// Open (or initialize) the store under `state_dir`.
    pub async fn open(state_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = state_dir.as_ref();
        fs::create_dir_all(dir).await?;

        // Singleton protection: only one process may own the ledger.
        let lock_file = File::create(dir.join(LOCK_FILE))?;
        let lock = Box::leak(Box::new(RwLock::new(lock_file)));
        let guard = lock.try_write().map_err(|_| StoreError::Unavailable {
            reason: "another drop-warden process owns the store".to_string(),
        })?;

        let state_file = dir.join(STATE_FILE);
        let state = match fs::try_exists(&state_file).await? {
            true => {
                let contents = fs::read_to_string(&state_file).await?;
                let state: StoreState = serde_json::from_str(&contents)?;
                if state.version != STATE_VERSION {
                    return Err(StoreError::Unavailable {
                        reason: format!(
                            "unsupported state version {} (expected {})",
                            state.version, STATE_VERSION
                        ),
                    });
                }
                info!(
                    file = ?state_file,
                    records = state.records.len(),
                    next_id = state.counter,
                    "Loaded submission ledger"
                );
                state
            }
            false => {
                info!(file = ?state_file, "No existing ledger found, starting fresh");
                StoreState::new()
            }
        };

        Ok(Self {
            state_file,
            state: Mutex::new(state),
            _lock_guard: guard,
        })
    }

    /// Write the candidate state to a temporary file, sync it, then
    /// rename over the snapshot (atomic replace).
    async fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let serialized = serde_json::to_string_pretty(state)?;
        let temp_file = self.state_file.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_file).await?;
        file.write_all(serialized.as_bytes()).await?;
        // Flush to stable storage before the rename makes it visible.
        file.sync_all().await?;
        fs::rename(&temp_file, &self.state_file).await?;
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for JsonFileStore {
    async fn create(&self, new: NewSubmission) -> Result<Submission, StoreError> {
        let mut state = self.state.lock().await;
        let mut candidate = state.clone();
        let submission = candidate.allocate(new, Utc::now());
        self.persist(&candidate).await?;
        *state = candidate;
        debug!(id = %submission.id, team = %submission.team_id, "Created submission");
        Ok(submission)
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
        let mut candidate = state.clone();
        let submission = candidate.apply_decision(id, decision, decided_by, reason)?;
        self.persist(&candidate).await?;
        *state = candidate;
        debug!(id = %submission.id, status = %submission.status, "Updated submission status");
        Ok(submission)
    }

    async fn attach_message_ref(
        &self,
        id: DropId,
        message_ref: MessageRef,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let mut candidate = state.clone();
        candidate.attach(id, message_ref)?;
        if let Err(e) = self.persist(&candidate).await {
            // Best-effort association; the record itself is already durable.
            warn!(id = %id, error = %e, "Failed to persist announcement reference");
            return Err(e);
        }
        *state = candidate;
        Ok(())
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
        let mut candidate = state.clone();
        candidate
            .progress
            .insert(StoreState::progress_key(team_id, category), value.to_string());
        self.persist(&candidate).await?;
        *state = candidate;
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
        let wiped = state.records.len();
        let candidate = StoreState::new();
        self.persist(&candidate).await?;
        *state = candidate;
        info!(wiped_records = wiped, "Ledger wiped, counter reset to 1");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_submission() -> NewSubmission {
        NewSubmission {
            submitter_id: UserId::from("U1"),
            team_id: TeamId::from("the-noobs"),
            category: Some(Category::from("zulrah")),
            evidence_ref: "http://x.com/a.png".to_string(),
        }
    }

    #[tokio::test]
    async fn create_persists_before_returning() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp_dir.path()).await.unwrap();

        let created = store.create(new_submission()).await.unwrap();
        assert_eq!(created.id, DropId(1));

        let contents =
            std::fs::read_to_string(temp_dir.path().join(STATE_FILE)).unwrap();
        let on_disk: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(on_disk["counter"], 2);
        assert_eq!(on_disk["records"]["1"]["status"], "Pending");
    }

    #[tokio::test]
    async fn second_process_cannot_open_the_same_store() {
        let temp_dir = TempDir::new().unwrap();
        let _store = JsonFileStore::open(temp_dir.path()).await.unwrap();

        let second = JsonFileStore::open(temp_dir.path()).await;
        assert!(matches!(second, Err(StoreError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn store_reopens_after_previous_handle_dropped() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = JsonFileStore::open(temp_dir.path()).await.unwrap();
            store.create(new_submission()).await.unwrap();
        }
        let store = JsonFileStore::open(temp_dir.path()).await.unwrap();
        let record = store.get(DropId(1)).await.unwrap();
        assert_eq!(record.submitter_id, UserId::from("U1"));
    }

    #[tokio::test]
    async fn version_mismatch_is_rejected_on_open() {
        let temp_dir = TempDir::new().unwrap();
        let bogus = r#"{"version":"99","counter":1,"records":{},"progress":{}}"#;
        std::fs::write(temp_dir.path().join(STATE_FILE), bogus).unwrap();

        let result = JsonFileStore::open(temp_dir.path()).await;
        match result {
            Err(StoreError::Unavailable { reason }) => {
                assert!(reason.contains("unsupported state version"))
            }
            other => panic!("expected version error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn progress_annotations_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let team = TeamId::from("the-noobs");
        let category = Category::from("zulrah");
        {
            let store = JsonFileStore::open(temp_dir.path()).await.unwrap();
            store.set_progress(&team, &category, "3/5").await.unwrap();
        }
        let store = JsonFileStore::open(temp_dir.path()).await.unwrap();
        assert_eq!(
            store.progress(&team, &category).await.unwrap(),
            Some("3/5".to_string())
        );
    }
}
