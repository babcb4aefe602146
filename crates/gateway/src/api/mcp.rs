//! MCP endpoint — hands agent CLI sessions their tool configuration and
//! proxies their JSON-RPC calls to the per-user hub tool-router session.
//!
//! - `GET  /v1/mcp`        — MCP client config pointing at the router
//! - `POST /v1/mcp/router` — JSON-RPC proxy (session cached per user)

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::ACCEPT;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json, Response};

use valet_hub::RouterSession;

use crate::api::error::ApiResult;
use crate::api::integrations::get_or_create_entity_id;
use crate::auth::CurrentUser;
use crate::state::AppState;

/// GET /v1/mcp — configuration for `claude mcp add` / `.mcp.json`.
///
/// The router URL carries the caller's own bearer token so the CLI
/// session authenticates as the same user.
pub async fn config(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let router_url = format!(
        "{}/v1/mcp/router",
        state.config.hub.public_url.trim_end_matches('/')
    );

    tracing::debug!(user_id = user.id, "mcp config requested");
    Ok(Json(serde_json::json!({
        "mcpServers": {
            "valet": {
                "type": "http",
                "url": router_url,
                "headers": { "Authorization": token },
            }
        }
    })))
}

fn rpc_error(code: i64, message: &str) -> Response {
    Json(serde_json::json!({
        "jsonrpc": "2.0",
        "error": { "code": code, "message": message },
    }))
    .into_response()
}

/// POST /v1/mcp/router — forward one JSON-RPC request.
pub async fn router(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let Some(hub) = state.hub.clone() else {
        return rpc_error(-32000, "connector hub is not configured");
    };

    let Ok(Json(body)) = body else {
        return rpc_error(-32700, "Parse error");
    };

    let entity_id = match get_or_create_entity_id(&state, &user).await {
        Ok(e) => e,
        Err(e) => {
            tracing::error!(error = %e, "resolving hub entity failed");
            return rpc_error(-32602, "Unknown user");
        }
    };

    // One tool-router session per user, shared by concurrent requests.
    let session = {
        let hub = hub.clone();
        let entity = entity_id.clone();
        state
            .router_sessions
            .get_or_create(user.id, move || async move {
                let created = hub.create_router_session(&entity).await?;
                tracing::info!(entity_id = %entity, session_id = %created.session_id, "tool-router session created");
                Ok(RouterSession {
                    session_id: created.session_id,
                    mcp_url: created.mcp_url,
                })
            })
            .await
    };

    let session = match session {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "creating tool-router session failed");
            return rpc_error(-32000, "failed to create tool-router session");
        }
    };

    let accept = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json");

    match hub.forward_rpc(&session.mcp_url, &body, accept).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "tool-router call failed — dropping cached session");
            // The session may have expired hub-side; a retry gets a new one.
            state.router_sessions.invalidate(&user.id).await;
            rpc_error(-32000, &format!("tool router: {e}"))
        }
    }
}
