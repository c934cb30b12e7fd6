//! In-memory session store.
//!
//! Holds each live session with its history under its own async mutex, so
//! two turns for one participant never interleave while different
//! participants proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use situ_core::{Condition, Reply, Session, Turn};

use crate::controller::{SessionController, SessionError};

pub type SessionId = Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Session(e) if e.is_retryable())
    }
}

#[derive(Debug)]
struct Entry {
    session: Session,
    history: Vec<Turn>,
}

/// Sessions keyed by id, each serialized by its own lock.
pub struct SessionStore {
    controller: Arc<SessionController>,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Entry>>>>,
}

impl SessionStore {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self {
            controller,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Start a session and return its id with the first introduction.
    pub fn create(&self, condition: Condition) -> Result<(SessionId, Reply), StoreError> {
        let mut session = self.controller.new_session(condition);
        let reply = self.controller.open(&mut session)?;

        let id = Uuid::new_v4();
        let entry = Entry {
            session,
            history: vec![Turn::assistant(reply.text.clone())],
        };
        self.sessions.write().insert(id, Arc::new(Mutex::new(entry)));

        tracing::info!(session = %id, condition = %condition, "Session created");
        Ok((id, reply))
    }

    /// Process one participant utterance.
    pub async fn submit(&self, id: SessionId, text: &str) -> Result<Reply, StoreError> {
        self.submit_with_cancel(id, text, CancellationToken::new())
            .await
    }

    /// Process one participant utterance, abandoning it if `cancel` fires.
    /// Session and history are only written once the turn has succeeded, so
    /// a failed, cancelled, or dropped call leaves both untouched.
    pub async fn submit_with_cancel(
        &self,
        id: SessionId,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<Reply, StoreError> {
        let slot = self.slot(id)?;
        let mut entry = slot.lock().await;
        let Entry { session, history } = &mut *entry;

        let mut turns = Vec::with_capacity(history.len() + 2);
        turns.extend_from_slice(history.as_slice());
        turns.push(Turn::participant(text));

        match self
            .controller
            .process_turn_with_cancel(session, &turns, cancel)
            .await
        {
            Ok(reply) => {
                turns.push(Turn::assistant(reply.text.clone()));
                *history = turns;
                tracing::debug!(
                    session = %id,
                    puzzle = session.active_puzzle_id,
                    phase = %session.phase,
                    "Turn stored"
                );
                Ok(reply)
            }
            Err(e) => {
                tracing::warn!(session = %id, error = %e, "Turn failed");
                Err(e.into())
            }
        }
    }

    /// Copy of the current session state.
    pub async fn snapshot(&self, id: SessionId) -> Result<Session, StoreError> {
        let slot = self.slot(id)?;
        let entry = slot.lock().await;
        Ok(entry.session.clone())
    }

    pub async fn history(&self, id: SessionId) -> Result<Vec<Turn>, StoreError> {
        let slot = self.slot(id)?;
        let entry = slot.lock().await;
        Ok(entry.history.clone())
    }

    /// Drop a session. Returns whether it existed.
    pub fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().remove(&id).is_some();
        if removed {
            tracing::info!(session = %id, "Session removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    fn slot(&self, id: SessionId) -> Result<Arc<Mutex<Entry>>, StoreError> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }
}
