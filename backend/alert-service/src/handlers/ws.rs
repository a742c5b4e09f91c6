/// WebSocket transport for alert sessions
///
/// The actor is a thin adapter: inbound text frames are parsed into
/// `ClientMessage` and fed to the session task's channel; a spawned
/// forwarder drains the registry receiver into the actor so everything the
/// session or a broadcast queues goes out on this socket in order. The
/// protocol itself lives in `websocket::session`.
use std::time::Duration;

use actix::{Actor, ActorContext, Addr, Handler, Message as ActixMessage, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::metrics;
use crate::state::AppState;
use crate::websocket::session::run_session;
use crate::websocket::{ClientMessage, ServerMessage, SessionId};

// Outbound envelope already rendered to JSON
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct TextMessage(String);

struct WsAlertSession {
    user_id: String,
    session_id: SessionId,
    inbound: UnboundedSender<ClientMessage>,
}

impl Actor for WsAlertSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        metrics::session_opened();
        info!(
            user_id = %self.user_id,
            session_id = ?self.session_id,
            "websocket transport opened"
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // dropping `inbound` ends the session task, which runs the
        // registry disconnect
        metrics::session_closed();
        info!(
            user_id = %self.user_id,
            session_id = ?self.session_id,
            "websocket transport closed"
        );
    }
}

impl Handler<TextMessage> for WsAlertSession {
    type Result = ();

    fn handle(&mut self, msg: TextMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsAlertSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => ctx.pong(&payload),
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(text)) => match ClientMessage::from_json(&text) {
                Ok(parsed) => {
                    if self.inbound.send(parsed).is_err() {
                        ctx.stop();
                    }
                }
                Err(e) => {
                    // a frame we cannot parse at all poisons the loop;
                    // close rather than guess
                    warn!(
                        user_id = %self.user_id,
                        error = %e,
                        "unparsable websocket frame, closing session"
                    );
                    ctx.stop();
                }
            },
            Ok(ws::Message::Binary(_)) => {
                warn!(user_id = %self.user_id, "binary frames not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                debug!(user_id = %self.user_id, ?reason, "close frame received");
                ctx.stop();
            }
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "websocket protocol error");
                ctx.stop();
            }
            _ => {}
        }
    }
}

/// Drain the registry receiver into the actor. Exits when the registry side
/// closes or the actor dies, so dropped transports surface as send failures
/// to the broadcaster.
fn spawn_forwarder(addr: Addr<WsAlertSession>, mut outbound: UnboundedReceiver<ServerMessage>) {
    tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            if !addr.connected() {
                break;
            }
            match msg.to_json() {
                Ok(json) => addr.do_send(TextMessage(json)),
                Err(e) => warn!(error = %e, "failed to serialize outbound envelope"),
            }
        }
    });
}

/// GET /ws/{user_id}
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();

    let (handle, outbound) = state.registry.connect(&user_id).await;
    let (inbound_tx, inbound_rx) = unbounded_channel();

    let session = WsAlertSession {
        user_id: user_id.clone(),
        session_id: handle.id,
        inbound: inbound_tx,
    };

    let heartbeat = Duration::from_secs(state.config.websocket.heartbeat_secs);
    tokio::spawn(run_session(
        state.store.clone(),
        state.registry.clone(),
        handle,
        inbound_rx,
        heartbeat,
    ));

    let resp = ws::WsResponseBuilder::new(session, &req, stream).start_with_addr();
    match resp {
        Ok((addr, resp)) => {
            spawn_forwarder(addr, outbound);
            Ok(resp)
        }
        Err(e) => {
            // handshake failed; the session task cleans itself up once the
            // inbound sender is dropped
            Err(e)
        }
    }
}

/// Register WebSocket routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws/{user_id}", web::get().to(ws_connect));
}
