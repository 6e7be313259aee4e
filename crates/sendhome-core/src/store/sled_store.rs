//! Sled-backed session store. Two trees share the session id as key:
//! `case_files` (written once) and `progress` (rewritten by mutators).

use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;

use super::{SessionStore, StoreError, StoreResult};
use crate::model::{CaseFile, Session, SessionProgress};

const CASE_FILES_TREE: &str = "case_files";
const PROGRESS_TREE: &str = "progress";

pub struct SledSessionStore {
    db: sled::Db,
    case_files: sled::Tree,
    progress: sled::Tree,
}

impl SledSessionStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path.as_ref())?;
        Self::from_db(db)
    }

    /// In-memory sled instance removed on drop. Used by tests and the offline demo.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> StoreResult<Self> {
        let case_files = db.open_tree(CASE_FILES_TREE)?;
        let progress = db.open_tree(PROGRESS_TREE)?;
        tracing::debug!("session store opened ({} sessions)", progress.len());
        Ok(Self {
            db,
            case_files,
            progress,
        })
    }

    /// Number of committed sessions.
    pub fn len(&self) -> usize {
        self.progress.len()
    }

    pub fn is_empty(&self) -> bool {
        self.progress.is_empty()
    }

    fn read_progress(&self, session_id: &str) -> StoreResult<SessionProgress> {
        let raw = self
            .progress
            .get(session_id.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

impl From<TransactionError<StoreError>> for StoreError {
    fn from(err: TransactionError<StoreError>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => StoreError::Storage(e),
        }
    }
}

fn abort<E: Into<StoreError>>(err: E) -> ConflictableTransactionError<StoreError> {
    ConflictableTransactionError::Abort(err.into())
}

impl SessionStore for SledSessionStore {
    fn create(&self, session: &Session) -> StoreResult<()> {
        let id = session.id();
        let key = id.as_bytes();
        let file_bytes = serde_json::to_vec(&session.file)?;
        let progress_bytes = serde_json::to_vec(&session.progress)?;

        (&self.case_files, &self.progress)
            .transaction(|(files, progress)| {
                if files.get(key)?.is_some() || progress.get(key)?.is_some() {
                    return Err(abort(StoreError::AlreadyExists(id.to_string())));
                }
                files.insert(key, file_bytes.as_slice())?;
                progress.insert(key, progress_bytes.as_slice())?;
                Ok(())
            })
            .map_err(StoreError::from)?;

        self.db.flush()?;
        tracing::info!("session {} committed ({} cases)", id, session.progress.total_cases);
        Ok(())
    }

    fn get(&self, session_id: &str) -> StoreResult<Session> {
        let progress = self.read_progress(session_id)?;
        let raw = self
            .case_files
            .get(session_id.as_bytes())?
            .ok_or_else(|| StoreError::Corrupt(format!("{} has progress but no case file", session_id)))?;
        let file: CaseFile = serde_json::from_slice(&raw)?;
        Ok(Session { file, progress })
    }

    fn progress(&self, session_id: &str) -> StoreResult<SessionProgress> {
        self.read_progress(session_id)
    }

    fn update_progress(
        &self,
        session_id: &str,
        apply: &(dyn Fn(&mut SessionProgress) -> StoreResult<()> + Sync),
    ) -> StoreResult<SessionProgress> {
        let key = session_id.as_bytes();
        // sled re-runs this closure when another writer touched the key first.
        let updated = self
            .progress
            .transaction(|tx| {
                let raw = tx
                    .get(key)?
                    .ok_or_else(|| abort(StoreError::NotFound(session_id.to_string())))?;
                let mut progress: SessionProgress = serde_json::from_slice(&raw).map_err(abort)?;
                apply(&mut progress).map_err(abort)?;
                let bytes = serde_json::to_vec(&progress).map_err(abort)?;
                tx.insert(key, bytes)?;
                Ok(progress)
            })
            .map_err(StoreError::from)?;

        self.progress.flush()?;
        Ok(updated)
    }
}
