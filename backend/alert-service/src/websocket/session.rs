/// Per-session protocol loop
///
/// One task per live session, independent of the WebSocket transport: the
/// transport feeds parsed client envelopes into `inbound` and drains the
/// registry receiver out to the socket. The loop races each receive against
/// the heartbeat interval, so an idle session emits a `heartbeat` envelope
/// instead of requiring client-initiated pings.
///
/// Lifecycle: Connecting (caller has already registered the session) ->
/// Active (this loop) -> Closed. Closing always runs the registry
/// disconnect, which is idempotent with broadcast-triggered pruning.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;
use tracing::{debug, error, info};

use super::{ClientMessage, ConnectionRegistry, ServerMessage, SessionHandle};
use crate::store::AlertStore;

pub async fn run_session(
    store: Arc<dyn AlertStore>,
    registry: ConnectionRegistry,
    handle: SessionHandle,
    mut inbound: UnboundedReceiver<ClientMessage>,
    heartbeat_interval: Duration,
) {
    info!(user_id = %handle.user_id, session_id = ?handle.id, "session active");

    if send_snapshot(&store, &handle).await.is_err() {
        close(&registry, &handle).await;
        return;
    }

    loop {
        match timeout(heartbeat_interval, inbound.recv()).await {
            Ok(Some(msg)) => {
                if dispatch(&store, &handle, msg).await.is_err() {
                    break;
                }
            }
            // transport hung up
            Ok(None) => break,
            // idle for a full interval
            Err(_) => {
                if handle.send(ServerMessage::heartbeat()).is_err() {
                    break;
                }
            }
        }
    }

    close(&registry, &handle).await;
}

/// Initial `connected` + `unread_count` envelopes. Err means the outbound
/// channel is already gone.
async fn send_snapshot(store: &Arc<dyn AlertStore>, handle: &SessionHandle) -> Result<(), ()> {
    handle
        .send(ServerMessage::connected(&handle.user_id))
        .map_err(drop)?;

    let count = match store.unread_count(&handle.user_id).await {
        Ok(count) => count,
        Err(e) => {
            error!(user_id = %handle.user_id, error = %e, "failed to load unread count");
            0
        }
    };
    handle
        .send(ServerMessage::UnreadCount { count })
        .map_err(drop)
}

/// Handle one inbound envelope. Err means a reply could not be sent and the
/// session should close; store failures are logged and the loop continues.
async fn dispatch(
    store: &Arc<dyn AlertStore>,
    handle: &SessionHandle,
    msg: ClientMessage,
) -> Result<(), ()> {
    match msg {
        ClientMessage::MarkRead { alert_id } => {
            if let Err(e) = store.mark_read(&handle.user_id, &alert_id).await {
                error!(user_id = %handle.user_id, alert_id = %alert_id, error = %e, "mark_read failed");
                return Ok(());
            }
            handle
                .send(ServerMessage::MarkedRead { alert_id })
                .map_err(drop)
        }
        ClientMessage::MarkAllRead => {
            let count = match store.mark_all_read(&handle.user_id).await {
                Ok(count) => count,
                Err(e) => {
                    error!(user_id = %handle.user_id, error = %e, "mark_all_read failed");
                    return Ok(());
                }
            };
            handle
                .send(ServerMessage::AllMarkedRead { count })
                .map_err(drop)
        }
        ClientMessage::Ping => handle.send(ServerMessage::pong()).map_err(drop),
        // forward-compatible: future kinds are ignored, never answered
        ClientMessage::Unknown => {
            debug!(user_id = %handle.user_id, "ignoring unrecognized client message");
            Ok(())
        }
    }
}

async fn close(registry: &ConnectionRegistry, handle: &SessionHandle) {
    registry.disconnect(&handle.user_id, handle.id).await;
    info!(user_id = %handle.user_id, session_id = ?handle.id, "session closed");
}
