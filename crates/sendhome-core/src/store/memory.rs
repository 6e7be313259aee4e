//! In-process session store. Each key's shard lock is held across the whole
//! read-modify-write, so mutators on one session serialize while different
//! sessions proceed independently.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{SessionStore, StoreError, StoreResult};
use crate::model::{CaseFile, Session, SessionProgress};

struct Slot {
    file: Arc<CaseFile>,
    progress: SessionProgress,
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Slot>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, session: &Session) -> StoreResult<()> {
        match self.sessions.entry(session.id().to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(session.id().to_string())),
            Entry::Vacant(v) => {
                v.insert(Slot {
                    file: Arc::new(session.file.clone()),
                    progress: session.progress.clone(),
                });
                Ok(())
            }
        }
    }

    fn get(&self, session_id: &str) -> StoreResult<Session> {
        let slot = self
            .sessions
            .get(session_id)
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;
        Ok(Session {
            file: CaseFile::clone(&slot.file),
            progress: slot.progress.clone(),
        })
    }

    fn progress(&self, session_id: &str) -> StoreResult<SessionProgress> {
        self.sessions
            .get(session_id)
            .map(|slot| slot.progress.clone())
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))
    }

    fn update_progress(
        &self,
        session_id: &str,
        apply: &(dyn Fn(&mut SessionProgress) -> StoreResult<()> + Sync),
    ) -> StoreResult<SessionProgress> {
        let mut slot = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;
        let mut next = slot.progress.clone();
        apply(&mut next)?;
        slot.progress = next.clone();
        Ok(next)
    }
}
