use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::config::StreamingConfig;
use super::session::{Session, SessionWiring};

/// Process-wide table of live sessions, keyed by session identifier.
///
/// This is the only state shared across tasks; everything else a session
/// owns stays inside that session. At most one live session exists per
/// identifier, and identifiers are never reused after removal.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Allocate a fresh identifier and store the new session atomically.
    ///
    /// Identifiers are 128-bit random UUIDs, so concurrent creates do not
    /// collide. Returns the session together with the channel ends meant
    /// for its bridge.
    pub async fn create(
        &self,
        config: StreamingConfig,
        audio_depth: usize,
        result_depth: usize,
    ) -> (Arc<Session>, SessionWiring) {
        let id = Uuid::new_v4().to_string();
        let (session, wiring) = Session::new(id, config, audio_depth, result_depth);
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), Arc::clone(&session));
        (session, wiring)
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Remove a session. Idempotent: removing an unknown identifier just
    /// returns false.
    pub async fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
