//! Registry of live chat sessions

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::chat::WsOutgoing;

/// Identifies one chat connection
pub type SessionId = Uuid;

/// Outbound queue of a single session
pub type SessionSender = mpsc::Sender<WsOutgoing>;

/// Set of currently connected sessions, keyed by [`SessionId`]
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionSender>>,
}

impl SessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session on connect
    pub async fn register(&self, id: SessionId, sender: SessionSender) {
        self.sessions.write().await.insert(id, sender);
        tracing::debug!(session_id = %id, "session registered");
    }

    /// Remove a session on disconnect; returns whether it was present
    pub async fn unregister(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "session unregistered");
        }
        removed
    }

    /// Whether the session is still registered
    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is connected
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Copy of the current membership, taken under a short read lock
    pub async fn senders(&self) -> Vec<(SessionId, SessionSender)> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_unregister() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let id = Uuid::new_v4();

        registry.register(id, tx).await;
        assert!(registry.contains(id).await);
        assert_eq!(registry.len().await, 1);

        assert!(registry.unregister(id).await);
        assert!(!registry.unregister(id).await);
        assert!(registry.is_empty().await);
    }
}
