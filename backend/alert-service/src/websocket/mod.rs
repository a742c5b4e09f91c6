/// Real-time delivery subsystem
///
/// The registry maps each user id to the set of live sessions for that user.
/// It holds routing metadata only: senders into per-session channels, never
/// alert data. Process-scoped, reset on restart.
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{
    mpsc::{self, error::SendError, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use tracing::debug;
use uuid::Uuid;

pub mod broadcast;
pub mod messages;
pub mod session;

pub use broadcast::AlertBroadcaster;
pub use messages::{ClientMessage, ServerMessage};

/// Unique identifier for one live session
///
/// A user may hold many concurrent sessions (devices, tabs); the id lets
/// disconnect and broadcast-triggered pruning remove exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Routing handle for one session: the outbound channel plus identity.
#[derive(Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub user_id: String,
    sender: UnboundedSender<ServerMessage>,
}

impl SessionHandle {
    /// Queue an envelope for delivery. Fails once the transport side of the
    /// channel is gone, which callers treat as an implicit disconnect.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError<ServerMessage>> {
        self.sender.send(msg)
    }
}

/// Connection registry for live alert sessions
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    // user_id -> live sessions; one registry-wide lock since user-set
    // membership itself is the contended resource
    inner: Arc<RwLock<HashMap<String, Vec<SessionHandle>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session for a user. Returns the handle stored in the
    /// registry and the receiving end the transport drains to the client.
    pub async fn connect(&self, user_id: &str) -> (SessionHandle, UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SessionHandle {
            id: SessionId::new(),
            user_id: user_id.to_string(),
            sender: tx,
        };

        let mut guard = self.inner.write().await;
        let sessions = guard.entry(user_id.to_string()).or_default();
        sessions.push(handle.clone());
        debug!(
            user_id,
            session_id = ?handle.id,
            sessions = sessions.len(),
            "session connected"
        );

        (handle, rx)
    }

    /// Remove one session. Idempotent; the user entry goes away with its
    /// last session so no empty sets linger.
    pub async fn disconnect(&self, user_id: &str, session_id: SessionId) {
        let mut guard = self.inner.write().await;
        if let Some(sessions) = guard.get_mut(user_id) {
            let before = sessions.len();
            sessions.retain(|s| s.id != session_id);
            if sessions.len() != before {
                debug!(
                    user_id,
                    session_id = ?session_id,
                    remaining = sessions.len(),
                    "session disconnected"
                );
            }
            if sessions.is_empty() {
                guard.remove(user_id);
            }
        }
    }

    /// Snapshot of a user's live sessions, safe to iterate while connects
    /// and disconnects continue elsewhere.
    pub async fn sessions_for(&self, user_id: &str) -> Vec<SessionHandle> {
        let guard = self.inner.read().await;
        guard.get(user_id).cloned().unwrap_or_default()
    }

    pub async fn session_count(&self, user_id: &str) -> usize {
        let guard = self.inner.read().await;
        guard.get(user_id).map(|v| v.len()).unwrap_or(0)
    }

    pub async fn connected_users(&self) -> usize {
        let guard = self.inner.read().await;
        guard.len()
    }

    pub async fn total_sessions(&self) -> usize {
        let guard = self.inner.read().await;
        guard.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registry_starts_empty() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.total_sessions().await, 0);
        assert_eq!(registry.connected_users().await, 0);
    }

    #[tokio::test]
    async fn test_multiple_sessions_per_user() {
        let registry = ConnectionRegistry::new();

        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (_, rx) = registry.connect("u1").await;
            receivers.push(rx);
        }

        assert_eq!(registry.session_count("u1").await, 3);
        assert_eq!(registry.connected_users().await, 1);
        assert_eq!(registry.total_sessions().await, 3);
    }

    #[tokio::test]
    async fn test_disconnect_removes_only_that_session() {
        let registry = ConnectionRegistry::new();
        let (first, _rx1) = registry.connect("u1").await;
        let (_second, _rx2) = registry.connect("u1").await;

        registry.disconnect("u1", first.id).await;
        assert_eq!(registry.session_count("u1").await, 1);

        let remaining = registry.sessions_for("u1").await;
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].id, first.id);
    }

    #[tokio::test]
    async fn test_last_disconnect_removes_user_entry() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = registry.connect("u1").await;

        registry.disconnect("u1", handle.id).await;
        assert_eq!(registry.session_count("u1").await, 0);
        assert_eq!(registry.connected_users().await, 0);

        // repeating the disconnect is a no-op
        registry.disconnect("u1", handle.id).await;
    }

    #[tokio::test]
    async fn test_sessions_for_is_a_snapshot() {
        let registry = ConnectionRegistry::new();
        let (handle, mut rx) = registry.connect("u1").await;

        let snapshot = registry.sessions_for("u1").await;
        registry.disconnect("u1", handle.id).await;

        // the snapshot still delivers into the session channel
        snapshot[0].send(ServerMessage::UnreadCount { count: 1 }).unwrap();
        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::UnreadCount { count: 1 })
        );
    }

    #[tokio::test]
    async fn test_send_fails_after_receiver_dropped() {
        let registry = ConnectionRegistry::new();
        let (handle, rx) = registry.connect("u1").await;
        drop(rx);

        assert!(handle.send(ServerMessage::heartbeat()).is_err());
    }
}
