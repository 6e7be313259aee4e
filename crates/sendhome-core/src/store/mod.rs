//! Session Store: authoritative per-session state.
//!
//! | Backend | Concurrency |
//! |---------|-------------|
//! | [`SledSessionStore`] | sled transactions (serializable, retried on conflict) |
//! | [`MemorySessionStore`] | DashMap shard lock held for the whole read-modify-write |
//!
//! Every mutator is expressed through [`SessionStore::update_progress`]: read the
//! progress record, validate the mutator's precondition, apply, write back. A failed
//! precondition leaves the record untouched.

mod memory;
mod sled_store;

pub use memory::MemorySessionStore;
pub use sled_store::SledSessionStore;

use std::sync::Arc;

use thiserror::Error;

use crate::model::{Session, SessionProgress};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session already exists: {0}")]
    AlreadyExists(String),

    #[error("no secondary checks remaining")]
    QuotaExhausted,

    #[error("session complete")]
    SessionComplete,

    #[error("case number {given} is not the current case (expected {expected})")]
    NotCurrentCase { expected: usize, given: usize },

    #[error("storage: {0}")]
    Storage(#[from] sled::Error),

    #[error("codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("corrupt session record: {0}")]
    Corrupt(String),

    #[error("store task failed: {0}")]
    Task(String),
}

/// Run a store operation on tokio's blocking pool. sled reads, transactions and
/// flushes must stay off the async worker threads.
pub async fn run_blocking<T, F>(store: &Arc<dyn SessionStore>, op: F) -> StoreResult<T>
where
    F: FnOnce(&dyn SessionStore) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}

/// Everything the decision engine commits for one resolution, applied in a
/// single transaction so `correct + incorrect == cursor` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRecord {
    pub case_id: String,
    /// Position of the resolved case in the case list.
    pub case_index: usize,
    pub score_delta: i64,
    pub correct: bool,
    /// Reject unless `case_index` is the cursor.
    pub require_current: bool,
}

/// Transactional session storage.
pub trait SessionStore: Send + Sync {
    /// Commit a finished session. Fails with `AlreadyExists` if the id is taken.
    /// Readers never observe a case file without its progress record.
    fn create(&self, session: &Session) -> StoreResult<()>;

    /// Full session (case file + progress).
    fn get(&self, session_id: &str) -> StoreResult<Session>;

    /// Progress record only.
    fn progress(&self, session_id: &str) -> StoreResult<SessionProgress>;

    /// Read-validate-mutate-write on the progress record. `apply` may run more
    /// than once when the backend retries a conflicting transaction, so it must
    /// be a pure function of its input.
    fn update_progress(
        &self,
        session_id: &str,
        apply: &(dyn Fn(&mut SessionProgress) -> StoreResult<()> + Sync),
    ) -> StoreResult<SessionProgress>;

    fn advance_cursor(&self, session_id: &str) -> StoreResult<SessionProgress> {
        self.update_progress(session_id, &|p| {
            if p.is_complete() {
                return Err(StoreError::SessionComplete);
            }
            p.cursor += 1;
            Ok(())
        })
    }

    fn apply_score_delta(
        &self,
        session_id: &str,
        delta: i64,
        correct: bool,
    ) -> StoreResult<SessionProgress> {
        self.update_progress(session_id, &|p| {
            apply_score(p, delta, correct);
            Ok(())
        })
    }

    fn consume_secondary_check(&self, session_id: &str) -> StoreResult<SessionProgress> {
        self.update_progress(session_id, &|p| {
            if p.remaining_secondary_checks == 0 {
                return Err(StoreError::QuotaExhausted);
            }
            p.remaining_secondary_checks -= 1;
            Ok(())
        })
    }

    /// Score delta, decision counter, completed-case log and cursor advance as one unit.
    fn record_resolution(
        &self,
        session_id: &str,
        record: &ResolutionRecord,
    ) -> StoreResult<SessionProgress> {
        self.update_progress(session_id, &|p| {
            if p.is_complete() {
                return Err(StoreError::SessionComplete);
            }
            if record.require_current && record.case_index != p.cursor {
                return Err(StoreError::NotCurrentCase {
                    expected: p.cursor + 1,
                    given: record.case_index + 1,
                });
            }
            apply_score(p, record.score_delta, record.correct);
            p.completed_cases.push(record.case_id.clone());
            p.cursor += 1;
            Ok(())
        })
    }
}

fn apply_score(p: &mut SessionProgress, delta: i64, correct: bool) {
    p.score += delta;
    if correct {
        p.correct_decisions += 1;
    } else {
        p.incorrect_decisions += 1;
    }
}
