//! Session store: per-session conversation history with no implicit
//! eviction.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::types::{ChatTurn, Session};

/// In-process session store. Topology changes (capability add/remove)
/// never touch any `Session`; history is append-only within a session.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the per-session turn lock, creating it on first use. Held by
    /// the Turn Executor for the duration of one turn so that the N-th
    /// message's turn fully completes before the N+1-th is admitted.
    pub async fn lock_turn(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.turn_locks.lock().await;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Return the session, creating it with empty history on first access.
    pub async fn get_or_create(&self, session_id: &str) -> Session {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(session_id) {
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session {
                session_id: session_id.to_string(),
                history: Vec::new(),
                created_at: Utc::now(),
                last_touched_at: Utc::now(),
                metadata: Default::default(),
            })
            .clone()
    }

    /// Append one turn to a session's history, creating the session first
    /// if necessary.
    pub async fn append(&self, session_id: &str, turn: ChatTurn) {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session {
                session_id: session_id.to_string(),
                history: Vec::new(),
                created_at: Utc::now(),
                last_touched_at: Utc::now(),
                metadata: Default::default(),
            });
        session.history.push(turn);
        session.last_touched_at = Utc::now();
    }

    /// Ordered snapshot of a session's history. Empty (not missing) for a
    /// session id never seen before.
    pub async fn snapshot(&self, session_id: &str) -> Vec<ChatTurn> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
