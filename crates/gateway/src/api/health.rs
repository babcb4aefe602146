//! Liveness/readiness probe.

use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// GET /health — verifies the database answers.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = sqlx_ping(&state).await;
    Json(serde_json::json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "database": db_ok,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn sqlx_ping(state: &AppState) -> bool {
    state
        .db
        .users()
        .get_by_id(0)
        .await
        .is_ok()
}
