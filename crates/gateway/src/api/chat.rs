//! `POST /v1/chat` and `GET /v1/chat/stream` (`spec.md` §6's Turn Driver
//! entry point, `chat(text, stream) → string | stream`).

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::{http::StatusCode, Json};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::runtime::{Executor, Planner, Reviewer, TransportEvent, TurnDriver};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    #[serde(default, rename = "session_id")]
    pub session_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    #[serde(rename = "session_id")]
    pub session_key: String,
    pub final_text: String,
    #[serde(rename = "tool_executed")]
    pub tool_executed_flag: bool,
}

pub(crate) fn build_turn_driver(state: &AppState) -> TurnDriver {
    let planner = Planner::new(state.llm.clone(), state.skills.clone());
    let executor = Executor::new(state.llm.clone(), state.skills.clone(), state.config.turn.skill_timeout_seconds);
    let reviewer = Reviewer::new(state.llm.clone());
    TurnDriver::new(planner, executor, reviewer, state.memory.clone(), state.ledger.clone(), state.config.turn.max_review_rounds)
}

/// Non-streaming chat: runs the turn to completion and returns the final
/// text plus whatever breadcrumb/progress bytes were produced, flattened.
pub async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> impl IntoResponse {
    let session_key = req.session_key.unwrap_or_else(|| Uuid::new_v4().to_string());

    let permit = match state.session_locks.acquire(&session_key).await {
        Ok(p) => p,
        Err(_) => return (StatusCode::TOO_MANY_REQUESTS, "session is busy").into_response(),
    };

    let cancel = state.cancel_map.register(&session_key);
    let transport_session = state.transport.session(&session_key);
    let driver = build_turn_driver(&state);

    let result = driver.chat(&req.text, &transport_session, &cancel).await;
    state.cancel_map.remove(&session_key);
    drop(permit);

    match result {
        Ok(outcome) => Json(ChatResponse {
            session_key,
            final_text: outcome.final_text,
            tool_executed_flag: outcome.tool_executed_flag,
        })
        .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatStreamQuery {
    pub text: String,
    #[serde(default, rename = "session_id")]
    pub session_key: Option<String>,
}

/// Streaming chat: subscribes to the session's transport before spawning the
/// turn, so no progress/final bytes are missed (`spec.md` §4.9's join-mid-
/// turn guarantee only promises no replay, not a race against the driver).
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChatStreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_key = query.session_key.unwrap_or_else(|| Uuid::new_v4().to_string());
    let transport_session = state.transport.session(&session_key);
    let mut rx = transport_session.subscribe();

    let cancel = state.cancel_map.register(&session_key);
    let driver = build_turn_driver(&state);
    let state_for_task = state.clone();
    let session_key_for_task = session_key.clone();
    let text = query.text;

    tokio::spawn(async move {
        let permit = match state_for_task.session_locks.acquire(&session_key_for_task).await {
            Ok(p) => p,
            Err(_) => {
                transport_session.publish_text("session is busy");
                return;
            }
        };
        if let Err(e) = driver.chat(&text, &transport_session, &cancel).await {
            transport_session.publish_text(format!("[[PROGRESS_END]][[FINAL_START]]错误：{e}[[FINAL_END]]"));
        }
        state_for_task.cancel_map.remove(&session_key_for_task);
        drop(permit);
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match event {
                TransportEvent::Text(text) => yield Ok(Event::default().event("response_chunk").data(text)),
                TransportEvent::Image { base64_png, width, height } => {
                    let payload = serde_json::json!({ "base64_png": base64_png, "width": width, "height": height });
                    yield Ok(Event::default().event("response_image").data(payload.to_string()));
                }
                TransportEvent::Stats(summary) => {
                    let payload = serde_json::to_string(&summary).unwrap_or_default();
                    yield Ok(Event::default().event("stats_update").data(payload));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
