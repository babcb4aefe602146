//! Messaging endpoints — the conversation controller.
//!
//! - `GET  /v1/messages` — newest-first page of a conversation's turns
//! - `POST /v1/messages` — send a prompt; returns a live SSE stream of
//!   turn frames, answered either by the local agent CLI or relayed
//!   verbatim from the user's remote backend.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use valet_domain::error::Error;
use valet_domain::frame::{StartedFrame, TurnFrame};
use valet_storage::MessageRow;

use crate::api::conversations::require_owned;
use crate::api::error::ApiResult;
use crate::auth::CurrentUser;
use crate::runtime::turn::{persist_root, stream_turn, TurnContext};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/messages — read side
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct GetMessagesQuery {
    pub conversation_id: Uuid,
    #[serde(default = "d_limit")]
    pub limit: i64,
    #[serde(default)]
    pub cursor: Option<DateTime<Utc>>,
}

fn d_limit() -> i64 {
    10
}

/// One turn: the root user message plus everything produced answering it.
#[derive(Debug, Serialize)]
pub struct TurnView {
    pub turn_id: String,
    pub user_message: MessageRow,
    pub assistant_messages: Vec<MessageRow>,
}

#[derive(Debug, Serialize)]
pub struct GetMessagesResponse {
    pub conversation_id: Uuid,
    pub conversation_type: String,
    pub turns: Vec<TurnView>,
    pub next_cursor: Option<DateTime<Utc>>,
}

pub async fn get_messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<GetMessagesQuery>,
) -> ApiResult<Json<GetMessagesResponse>> {
    let conversation = require_owned(&state, user.id, query.conversation_id).await?;

    let roots = state
        .db
        .messages()
        .root_user_messages(user.id, conversation.id, query.limit, query.cursor)
        .await?;

    let root_ids: Vec<Uuid> = roots.iter().map(|m| m.id).collect();
    let children = state.db.messages().children_for_roots(&root_ids).await?;

    let mut grouped: std::collections::HashMap<Uuid, Vec<MessageRow>> =
        root_ids.iter().map(|id| (*id, Vec::new())).collect();
    for child in children {
        if let Some(parent) = child.parent_message_id {
            if let Some(bucket) = grouped.get_mut(&parent) {
                bucket.push(child);
            }
        }
    }

    let next_cursor = match roots.last() {
        Some(oldest)
            if state
                .db
                .messages()
                .has_older(user.id, conversation.id, oldest.timestamp)
                .await? =>
        {
            Some(oldest.timestamp)
        }
        _ => None,
    };

    let turns = roots
        .into_iter()
        .map(|root| TurnView {
            turn_id: root.id.to_string(),
            assistant_messages: grouped.remove(&root.id).unwrap_or_default(),
            user_message: root,
        })
        .collect();

    Ok(Json(GetMessagesResponse {
        conversation_id: conversation.id,
        conversation_type: conversation.kind,
        turns,
        next_cursor,
    }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/messages — send
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub conversation_id: Option<Uuid>,
    pub prompt: String,
}

/// The raw body is kept so the proxy path can forward it unchanged.
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    if state.config.proxy.enabled {
        if let Some(host) = user.server_host.clone() {
            tracing::info!(user_id = user.id, backend = %host, "relaying send to remote backend");
            return Ok(relay_to_backend(&state, &host, &headers, body).await);
        }
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "no backend assigned" })),
        )
            .into_response());
    }

    let request: SendMessageRequest =
        serde_json::from_slice(&body).map_err(|e| Error::Invalid(e.to_string()))?;

    let prompt = request.prompt.trim().to_owned();
    if prompt.is_empty() {
        return Err(Error::Invalid("prompt must not be empty".into()).into());
    }

    tracing::info!(user_id = user.id, "send message request");

    let conversation = match request.conversation_id {
        Some(id) => require_owned(&state, user.id, id).await?,
        None => {
            state
                .db
                .conversations()
                .create(user.id, "New Conversation", "chat")
                .await?
        }
    };

    // The root user message is durable before the agent is invoked.
    let root = persist_root(&state.db, user.id, conversation.id, &prompt).await?;

    let ctx = TurnContext {
        user_id: user.id,
        conversation_id: conversation.id,
        root_message_id: root.id,
    };
    let events = state.agent.stream(&prompt);
    let frames = stream_turn(Arc::new(state.db.clone()), events, ctx);

    let started = StartedFrame::new(user.id, conversation.id, Utc::now());
    let sse = async_stream::stream! {
        yield Ok::<_, Infallible>(frame_event(&TurnFrame::Started(started)));

        let mut frames = std::pin::pin!(frames);
        while let Some(frame) = frames.next().await {
            let terminal = frame.is_terminal();
            yield Ok(frame_event(&frame));
            if terminal {
                break;
            }
        }
    };

    let mut response = Sse::new(sse).keep_alive(KeepAlive::default()).into_response();
    let headers = response.headers_mut();
    headers.insert("cache-control", HeaderValue::from_static("no-cache"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    Ok(response)
}

/// Encode one frame for transport. Message frames are plain `data:`
/// frames; error frames carry an SSE event name so clients can tell
/// "failed" from "done".
fn frame_event(frame: &TurnFrame) -> Event {
    let data = serde_json::to_string(frame).unwrap_or_default();
    match frame.event_name() {
        Some(name) => Event::default().event(name).data(data),
        None => Event::default().data(data),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Proxy path
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hop-by-hop headers (RFC 9110 §7.6.1) that must not be forwarded,
/// plus `host` (set by the client) and `content-length` (recomputed).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn filter_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        out.append(name, value.clone());
    }
    out
}

/// Forward the raw request body to the user's backend and relay the
/// upstream byte stream unmodified — no re-parsing, no persistence.
async fn relay_to_backend(
    state: &AppState,
    host: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    let target = format!("{}/v1/messages", host.trim_end_matches('/'));

    let mut upstream_headers = filter_headers(headers);
    // Force event-stream upstream and keep frames uncompressed, unless
    // the client already said so.
    if !upstream_headers.contains_key(ACCEPT) {
        upstream_headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    }
    if !upstream_headers.contains_key(ACCEPT_ENCODING) {
        upstream_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    }

    let sent = state
        .proxy_http
        .post(&target)
        .headers(upstream_headers)
        .body(body)
        .send()
        .await;

    let upstream = match sent {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(target = %target, error = %e, "upstream connection failed");
            return error_frame_response(format!("upstream connection failed: {e}"));
        }
    };

    if upstream.status().as_u16() >= 400 {
        let status = upstream.status();
        let body = upstream.text().await.unwrap_or_default();
        tracing::warn!(target = %target, status = %status, "upstream rejected relayed send");
        return error_frame_response(body);
    }

    let bytes = upstream.bytes_stream();
    let relayed = async_stream::stream! {
        let mut bytes = std::pin::pin!(bytes);
        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => yield Ok::<Bytes, Infallible>(chunk),
                Err(e) => {
                    tracing::warn!(error = %e, "upstream stream dropped mid-turn");
                    yield Ok(encode_error_frame(&format!("upstream stream dropped: {e}")));
                    break;
                }
            }
        }
    };

    stream_response(Body::from_stream(relayed))
}

/// A complete SSE response holding a single `event: error` frame.
fn error_frame_response(message: String) -> Response {
    stream_response(Body::from(encode_error_frame(&message)))
}

fn encode_error_frame(message: &str) -> Bytes {
    Bytes::from(format!(
        "event: error\ndata: {}\n\n",
        serde_json::json!({ "error": message })
    ))
}

fn stream_response(body: Body) -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "text/event-stream"),
            ("cache-control", "no-cache"),
            ("x-accel-buffering", "no"),
        ],
        body,
    )
        .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_by_hop_headers_are_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", "keep-alive".parse().unwrap());
        headers.insert("transfer-encoding", "chunked".parse().unwrap());
        headers.insert("host", "api.example.com".parse().unwrap());
        headers.insert("content-length", "42".parse().unwrap());
        headers.insert("authorization", "Bearer token".parse().unwrap());
        headers.insert("x-request-id", "abc".parse().unwrap());

        let filtered = filter_headers(&headers);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.contains_key("authorization"));
        assert!(filtered.contains_key("x-request-id"));
    }

    #[test]
    fn error_frame_is_one_well_formed_sse_unit() {
        let frame = encode_error_frame("backend said no");
        let text = std::str::from_utf8(&frame).unwrap();
        assert!(text.starts_with("event: error\ndata: "));
        assert!(text.ends_with("\n\n"));
        // The payload is one line of JSON.
        let data_line = text.lines().nth(1).unwrap().strip_prefix("data: ").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(data_line).unwrap();
        assert_eq!(parsed["error"], "backend said no");
    }
}
