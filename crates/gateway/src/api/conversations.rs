//! Conversation management endpoints.
//!
//! - `GET    /v1/conversations`      — list (optional `?type=` filter)
//! - `PATCH  /v1/conversations/:id`  — update title / pin / type
//! - `DELETE /v1/conversations/:id`  — soft delete

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use valet_domain::error::Error;
use valet_storage::{ConversationPatch, ConversationRow};

use crate::api::error::ApiResult;
use crate::auth::CurrentUser;
use crate::state::AppState;

/// Conversation categories a client may switch between.
const PATCHABLE_TYPES: &[&str] = &["chat", "project"];

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PatchRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_pinned: Option<bool>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Fetch a conversation the requester owns; anything else is NotFound.
pub async fn require_owned(
    state: &AppState,
    user_id: i64,
    conversation_id: Uuid,
) -> Result<ConversationRow, Error> {
    match state.db.conversations().get_active(conversation_id).await? {
        Some(c) if c.user_id == user_id => Ok(c),
        _ => Err(Error::not_found("conversation")),
    }
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<ConversationRow>>> {
    let conversations = state
        .db
        .conversations()
        .list_by_user(user.id, query.kind.as_deref())
        .await?;
    Ok(Json(conversations))
}

pub async fn patch(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<PatchRequest>,
) -> ApiResult<StatusCode> {
    let conversation = require_owned(&state, user.id, conversation_id).await?;

    // Type may only move between patchable categories.
    let kind = body.kind.filter(|k| {
        PATCHABLE_TYPES.contains(&k.as_str())
            && PATCHABLE_TYPES.contains(&conversation.kind.as_str())
    });

    state
        .db
        .conversations()
        .patch(
            conversation_id,
            ConversationPatch {
                title: body.title,
                kind,
                is_pinned: body.is_pinned,
            },
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(conversation_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_owned(&state, user.id, conversation_id).await?;
    state
        .db
        .conversations()
        .soft_delete(conversation_id, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
