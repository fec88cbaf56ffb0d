//! WebSocket session lifecycle: handshake, then relay handoff.
//!
//! One session per upgraded connection. All state is private to the session
//! and dropped when the transport closes; nothing survives across
//! connections.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use veil_core::{
    handshake::{self, Handshake, Outcome},
    request,
};

use crate::relay;
use crate::AppState;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session(socket, state))
}

/// Drive one upgraded connection: authenticate, dial, relay.
async fn handle_session(mut socket: WebSocket, state: Arc<AppState>) {
    let mut handshake = Handshake::new(state.identity.clone(), state.config.max_attempts);
    let deadline = Duration::from_secs(state.config.handshake_timeout);

    let payload =
        match tokio::time::timeout(deadline, authenticate(&mut socket, &mut handshake)).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                info!(
                    client_id = handshake.client_id(),
                    "session ended before handshake completed"
                );
                return;
            }
            Err(_) => {
                info!(client_id = handshake.client_id(), "handshake timed out");
                return;
            }
        };

    let head = match request::parse_request(&payload) {
        Ok(head) => head,
        Err(e) => {
            warn!(
                client_id = handshake.client_id(),
                "authenticated but request head unusable: {}", e
            );
            return;
        }
    };

    info!(
        client_id = handshake.client_id(),
        target = %head.target,
        "session authenticated"
    );

    let upstream = match TcpStream::connect(&head.target).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(target = %head.target, "failed to reach destination: {}", e);
            return;
        }
    };

    relay::run(socket, upstream, head.payload).await;

    info!(client_id = handshake.client_id(), "session closed");
}

/// What one pre-auth websocket message contributes to the handshake.
#[derive(Debug, PartialEq, Eq)]
enum PreAuth {
    /// Binary payload to feed the state machine.
    Frame(Vec<u8>),
    /// Text and ping/pong carry no handshake bytes.
    Ignored,
    /// Client closed; tear the session down.
    Closed,
}

/// Screen a pre-auth message. Only binary payloads reach the state machine.
fn classify(msg: WsMessage) -> PreAuth {
    match msg {
        WsMessage::Binary(data) => PreAuth::Frame(data),
        WsMessage::Close(_) => PreAuth::Closed,
        _ => PreAuth::Ignored,
    }
}

/// Run the pre-auth receive loop.
///
/// Returns the bytes that followed the matched preamble, or `None` when the
/// transport closed, errored, or the retry bound was spent. The
/// acknowledgment is sent here, at most once, and only while the socket is
/// still writable.
async fn authenticate(socket: &mut WebSocket, handshake: &mut Handshake) -> Option<Vec<u8>> {
    while let Some(result) = socket.recv().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                debug!("websocket error during handshake: {}", e);
                return None;
            }
        };

        match classify(msg) {
            PreAuth::Frame(data) => match handshake.on_frame(&data) {
                Outcome::Matched { version, payload } => {
                    let ack = handshake::ack(version);
                    if socket.send(WsMessage::Binary(ack.to_vec())).await.is_err() {
                        debug!("socket closed before acknowledgment could be sent");
                        return None;
                    }
                    return Some(payload);
                }
                Outcome::Mismatched { observed } => {
                    debug!(observed, "identifier mismatch, awaiting another frame");
                }
                Outcome::AttemptsExhausted { observed } => {
                    warn!(observed, "closing connection after repeated mismatches");
                    return None;
                }
                Outcome::Ignored => {}
            },
            PreAuth::Ignored => {}
            PreAuth::Closed => {
                debug!("client closed during handshake");
                return None;
            }
        }
    }
    None
}
