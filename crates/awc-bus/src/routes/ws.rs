//! `/api/stream` — the duplex event channel. The server fans out every
//! [`ServerEvent`] published on the bus; the client may send [`ClientFrame`]s
//! back (`chat`, `voice`, `subscribe`, `ping`/`pong`). The server pings on
//! an interval and closes the connection if the client doesn't answer
//! within it; oversize frames close the connection too.

use std::time::Duration;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};

use awc_api_types::{ClientFrame, ServerEvent};

use crate::state::ApiState;

/// Oversize text frames close the channel rather than being buffered.
const MAX_FRAME_BYTES: usize = 1024 * 1024;

pub fn router() -> Router<ApiState> {
    Router::new().route("/api/stream", get(upgrade))
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<ApiState>) -> axum::response::Response {
    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ApiState) {
    let (mut sink, mut stream) = socket.split();
    let mut events = state.bus.subscribe();
    let ping_interval = Duration::from_secs(state.ping_secs.max(1));
    let mut ticker = tokio::time::interval(ping_interval);
    let mut awaiting_pong = false;

    state.bus.publish(ServerEvent::Presence {
        client_count: state.bus.subscriber_count(),
    });

    loop {
        tokio::select! {
            event = events.recv_async() => {
                let Ok(event) = event else { break };
                let Ok(text) = serde_json::to_string(&event) else { continue };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if awaiting_pong {
                    tracing::debug!("client missed ping deadline, closing stream");
                    break;
                }
                awaiting_pong = true;
                if sink.send(Message::Text(
                    serde_json::to_string(&ServerEvent::Ping).unwrap().into(),
                )).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                let Some(Ok(msg)) = incoming else { break };
                match msg {
                    Message::Text(text) => {
                        if text.len() > MAX_FRAME_BYTES {
                            break;
                        }
                        let Ok(frame) = serde_json::from_str::<ClientFrame>(&text) else {
                            tracing::debug!("dropping malformed client frame");
                            continue;
                        };
                        match frame {
                            ClientFrame::Pong => awaiting_pong = false,
                            ClientFrame::Ping => {
                                if sink.send(Message::Text(
                                    serde_json::to_string(&ServerEvent::Pong).unwrap().into(),
                                )).await.is_err() {
                                    break;
                                }
                            }
                            ClientFrame::Subscribe { .. } => {
                                // Every client currently receives every event; a
                                // channel filter can be layered on here later.
                            }
                            ClientFrame::Chat { .. } | ClientFrame::Voice { .. } => {
                                // Routed to the chat/voice backend once that
                                // surface exists; out of scope for the bus itself.
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }
}
