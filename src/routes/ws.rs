use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::hub::{ConnectionId, HubEvent};
use crate::state::SharedState;

pub async fn upgrade(State(state): State<SharedState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let id = state.hub.register(tx);
    tracing::info!(
        "Client {id} connected ({} open)",
        state.hub.connection_count()
    );

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => handle_text(&state, id, text.as_str()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("Client {id} read error: {e}");
                    break;
                }
            },
            // Writer gone means the peer stopped accepting frames.
            _ = &mut writer => break,
        }
    }

    state.hub.unregister(id);
    writer.abort();
    tracing::info!(
        "Client {id} disconnected ({} open)",
        state.hub.connection_count()
    );
}

fn handle_text(state: &SharedState, id: ConnectionId, text: &str) {
    let event: HubEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Ignoring unparseable frame from {id}: {e}");
            return;
        }
    };

    if !event.is_image_sent() {
        tracing::debug!("Ignoring '{}' event from {id}", event.event);
        return;
    }

    match event.user_id() {
        Some(user_id) => tracing::info!("Received imagesent from {id} for user {user_id}"),
        None => tracing::warn!("Relaying imagesent from {id} with malformed payload: {}", event.data),
    }

    // Relay the sender's frame untouched rather than re-encoding the parsed event.
    let delivered = state.hub.relay(text);
    tracing::info!("Broadcast imagesent to {delivered} clients");
}
