use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use futures::{SinkExt, StreamExt};
use nal2::RelayHub;
use tracing::{debug, warn};

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    accept(ws, &state).unwrap_or_else(|| StatusCode::NOT_FOUND.into_response())
}

/// Hand the upgrade to the relay hub, or `None` when no hub is running.
pub(super) fn accept(ws: WebSocketUpgrade, state: &AppState) -> Option<Response> {
    let hub = state.gateway.relay().cloned()?;
    Some(ws.on_upgrade(move |socket| serve_socket(socket, hub)))
}

/// Pump one peer connection through the hub until either side closes.
async fn serve_socket(socket: WebSocket, hub: RelayHub) {
    let (mut sink, mut stream) = socket.split();
    let (mut session, mut outbox) = hub.connect();
    let id = session.id();

    let writer = tokio::spawn(async move {
        while let Some(message) = outbox.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode message for {}: {}", id, e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                debug!("Socket {} closed while sending", id);
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => hub.on_text(&mut session, text.as_str()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Socket {} failed: {}", id, e);
                break;
            }
        }
    }

    hub.disconnect(session);
    writer.abort();
}
