//! `GET /v1/relay/ws` — the remote WebSocket relay (`spec.md` §6's wire
//! format: one JSON object per message, `{type, ...fields}`).

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::chat::build_turn_driver;
use crate::runtime::TransportEvent;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default, rename = "session_id")]
    pub session_key: Option<String>,
}

pub async fn relay_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>, Query(query): Query<WsQuery>) -> impl IntoResponse {
    let session_key = query.session_key.unwrap_or_else(|| Uuid::new_v4().to_string());
    ws.on_upgrade(move |socket| handle_socket(socket, state, session_key))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InboundFrame {
    UserMessage { text: String },
    ClearChat,
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, session_key: String) {
    let (mut sink, mut source) = socket.split();
    let transport_session = state.transport.session(&session_key);
    let mut rx = transport_session.subscribe();

    let forward = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = match event {
                TransportEvent::Text(text) => json!({ "type": "response_chunk", "text": text }),
                TransportEvent::Image { base64_png, width, height } => {
                    json!({ "type": "response_image", "base64_png": base64_png, "width": width, "height": height })
                }
                TransportEvent::Stats(summary) => json!({ "type": "stats_update", "summary": summary }),
            };
            if sink.send(WsMessage::Text(frame.to_string())).await.is_err() {
                break;
            }
        }
        let _ = sink.send(WsMessage::Text(json!({ "type": "response_end" }).to_string())).await;
    });

    while let Some(Ok(msg)) = source.next().await {
        let WsMessage::Text(text) = msg else { continue };
        let Ok(frame) = serde_json::from_str::<InboundFrame>(&text) else { continue };
        match frame {
            InboundFrame::UserMessage { text } => {
                let cancel = state.cancel_map.register(&session_key);
                let transport_session = state.transport.session(&session_key);
                let driver = build_turn_driver(&state);
                let permit = match state.session_locks.acquire(&session_key).await {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                let _ = driver.chat(&text, &transport_session, &cancel).await;
                state.cancel_map.remove(&session_key);
                drop(permit);
            }
            InboundFrame::ClearChat => state.memory.clear(),
        }
    }

    forward.abort();
}
