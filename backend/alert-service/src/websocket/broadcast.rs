/// Alert fan-out
///
/// Bridges the store and the registry: a newly created alert is wrapped in
/// an `alert` envelope and pushed to every live session of its owner. A
/// failed send marks that session dead; dead sessions are disconnected after
/// the delivery pass, so broadcasts double as the pruning mechanism for
/// transports that vanished without an explicit close.
use tracing::{debug, warn};

use super::{ConnectionRegistry, ServerMessage, SessionId};
use crate::models::Alert;

#[derive(Clone)]
pub struct AlertBroadcaster {
    registry: ConnectionRegistry,
}

impl AlertBroadcaster {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Deliver `alert` to every live session of its owner. Per-session send
    /// failures never propagate to the producer.
    pub async fn broadcast(&self, alert: &Alert) {
        let sessions = self.registry.sessions_for(&alert.user_id).await;
        if sessions.is_empty() {
            return;
        }

        let envelope = ServerMessage::Alert {
            data: alert.clone(),
        };

        let mut dead: Vec<SessionId> = Vec::new();
        for session in &sessions {
            if session.send(envelope.clone()).is_err() {
                dead.push(session.id);
            }
        }

        debug!(
            user_id = %alert.user_id,
            alert_id = %alert.alert_id,
            delivered = sessions.len() - dead.len(),
            "broadcast alert"
        );

        for session_id in dead {
            warn!(
                user_id = %alert.user_id,
                session_id = ?session_id,
                "pruning dead session after failed send"
            );
            self.registry.disconnect(&alert.user_id, session_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Alert, AlertType, Severity};

    fn sample_alert(user_id: &str) -> Alert {
        Alert::custom(
            user_id,
            AlertType::SubscriptionReminder,
            Severity::Info,
            "Renewal soon",
            "Your plan renews tomorrow",
        )
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_sessions_of_owner_only() {
        let registry = ConnectionRegistry::new();
        let broadcaster = AlertBroadcaster::new(registry.clone());

        let (_h1, mut rx1) = registry.connect("u1").await;
        let (_h2, mut rx2) = registry.connect("u1").await;
        let (_h3, mut rx3) = registry.connect("u2").await;

        let alert = sample_alert("u1");
        broadcaster.broadcast(&alert).await;

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await {
                Some(ServerMessage::Alert { data }) => assert_eq!(data.alert_id, alert.alert_id),
                other => panic!("expected alert envelope, got {:?}", other),
            }
        }
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_prunes_dead_sessions() {
        let registry = ConnectionRegistry::new();
        let broadcaster = AlertBroadcaster::new(registry.clone());

        let (_live, mut live_rx) = registry.connect("u1").await;
        let (_dead, dead_rx) = registry.connect("u1").await;
        drop(dead_rx);

        broadcaster.broadcast(&sample_alert("u1")).await;

        // live session still got the envelope, dead one is gone
        assert!(matches!(
            live_rx.recv().await,
            Some(ServerMessage::Alert { .. })
        ));
        assert_eq!(registry.session_count("u1").await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_with_no_sessions_is_a_no_op() {
        let registry = ConnectionRegistry::new();
        let broadcaster = AlertBroadcaster::new(registry.clone());
        broadcaster.broadcast(&sample_alert("nobody")).await;
        assert_eq!(registry.connected_users().await, 0);
    }
}
