//! `GET /v1/stats` — the token ledger summary (`spec.md` §6).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::state::AppState;

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<lg_memory::ledger::LedgerSummary> {
    Json(state.ledger.summary())
}
