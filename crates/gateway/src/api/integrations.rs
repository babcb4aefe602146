//! Integration connection management, backed by the connector hub.
//!
//! - `GET  /v1/integrations`                  — catalog with connected flags
//! - `POST /v1/integrations/:slug/connect`    — begin OAuth, return redirect
//! - `GET  /v1/integrations/:slug/status`     — poll + sync connection state
//! - `POST /v1/integrations/:slug/disconnect` — drop the hub connection
//! - `GET  /v1/integrations/callback`         — OAuth redirect target (public)

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use valet_domain::error::Error;
use valet_hub::{HubClient, InitiateConnectionRequest};
use valet_storage::{IntegrationRow, UserRow};

use crate::api::error::ApiResult;
use crate::auth::CurrentUser;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Shapes + helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize)]
pub struct IntegrationItem {
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub is_connected: bool,
}

#[derive(Debug, Serialize)]
pub struct ListIntegrationsResponse {
    pub active: Vec<IntegrationItem>,
    pub inactive: Vec<IntegrationItem>,
}

fn require_hub(state: &AppState) -> Result<Arc<HubClient>, Error> {
    state
        .hub
        .clone()
        .ok_or_else(|| Error::Hub("connector hub is not configured".into()))
}

async fn require_integration(state: &AppState, slug: &str) -> Result<IntegrationRow, Error> {
    state
        .db
        .integrations()
        .get_by_slug(&slug.to_ascii_lowercase())
        .await?
        .ok_or_else(|| Error::not_found("integration"))
}

/// Resolve (or mint) the hub entity id tied to this user.
pub async fn get_or_create_entity_id(state: &AppState, user: &UserRow) -> Result<String, Error> {
    if let Some(ref entity) = user.hub_entity_id {
        return Ok(entity.clone());
    }
    let local_part = user.email.split('@').next().unwrap_or("user");
    let entity_id = format!("user_{}_{}", local_part, user.id);
    state.db.users().set_hub_entity_id(user.id, &entity_id).await?;
    tracing::info!(user_id = user.id, entity_id = %entity_id, "hub entity created");
    Ok(entity_id)
}

/// Map a hub connection status onto our stored status.
fn map_hub_status(status: &str) -> &'static str {
    match status.to_ascii_uppercase().as_str() {
        "ACTIVE" => "connected",
        "FAILED" | "EXPIRED" | "DELETED" => "disconnected",
        _ => "pending",
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handlers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<ListIntegrationsResponse>> {
    let catalog = state.db.integrations().all().await?;
    let connections = state.db.integrations().user_integrations(user.id).await?;

    let connected_ids: std::collections::HashSet<_> = connections
        .iter()
        .filter(|c| c.status == "connected")
        .map(|c| c.integration_id)
        .collect();

    let mut active = Vec::new();
    let mut inactive = Vec::new();
    for integration in catalog {
        let item = IntegrationItem {
            name: integration.name,
            slug: integration.slug,
            image: integration.image_url,
            is_connected: connected_ids.contains(&integration.id),
        };
        if item.is_connected {
            active.push(item);
        } else {
            inactive.push(item);
        }
    }

    Ok(Json(ListIntegrationsResponse { active, inactive }))
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub redirect_url: Option<String>,
}

pub async fn connect(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    Json(body): Json<ConnectRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let hub = require_hub(&state)?;
    let integration = require_integration(&state, &slug).await?;
    let entity_id = get_or_create_entity_id(&state, &user).await?;

    state
        .db
        .integrations()
        .upsert_user_integration(user.id, integration.id, "pending", None)
        .await?;

    let auth_config_id = hub
        .auth_config_for(&integration.slug)
        .await?
        .ok_or_else(|| Error::Hub(format!("no auth config for {}", integration.slug)))?;

    let callback = body.redirect_url.or_else(|| {
        Some(format!(
            "{}/v1/integrations/callback",
            state.config.hub.public_url.trim_end_matches('/')
        ))
    });

    let connection = hub
        .initiate_connection(&InitiateConnectionRequest {
            entity_id,
            auth_config_id,
            callback_url: callback,
        })
        .await?;

    state
        .db
        .integrations()
        .upsert_user_integration(user.id, integration.id, "pending", Some(&connection.id))
        .await?;

    tracing::info!(user_id = user.id, slug = %integration.slug, "integration connection initiated");
    Ok(Json(serde_json::json!({
        "slug": integration.slug,
        "status": "pending",
        "redirect_url": connection.redirect_url,
    })))
}

pub async fn status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let hub = require_hub(&state)?;
    let integration = require_integration(&state, &slug).await?;

    let connection = state
        .db
        .integrations()
        .get_user_integration(user.id, integration.id)
        .await?
        .ok_or_else(|| Error::not_found("integration connection"))?;

    let status = match connection.connected_account_id.as_deref() {
        Some(account_id) => {
            let account = hub.get_connected_account(account_id).await?;
            let mapped = map_hub_status(&account.status);
            if mapped != connection.status {
                state
                    .db
                    .integrations()
                    .upsert_user_integration(user.id, integration.id, mapped, Some(account_id))
                    .await?;
            }
            mapped.to_owned()
        }
        None => connection.status,
    };

    Ok(Json(serde_json::json!({
        "slug": integration.slug,
        "status": status,
    })))
}

pub async fn disconnect(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let hub = require_hub(&state)?;
    let integration = require_integration(&state, &slug).await?;

    let connection = state
        .db
        .integrations()
        .get_user_integration(user.id, integration.id)
        .await?
        .ok_or_else(|| Error::not_found("integration connection"))?;

    if let Some(ref account_id) = connection.connected_account_id {
        hub.delete_connected_account(account_id).await?;
    }

    state
        .db
        .integrations()
        .upsert_user_integration(user.id, integration.id, "disconnected", None)
        .await?;

    // The tool-router session may hold the old connection; rebuild lazily.
    state.router_sessions.invalidate(&user.id).await;

    tracing::info!(user_id = user.id, slug = %integration.slug, "integration disconnected");
    Ok(Json(serde_json::json!({
        "slug": integration.slug,
        "status": "disconnected",
    })))
}

// ── OAuth callback (public — the provider redirects the browser here) ──

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub connected_account_id: Option<String>,
    pub status: Option<String>,
}

pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    if let Some(ref account_id) = query.connected_account_id {
        let status = map_hub_status(query.status.as_deref().unwrap_or("ACTIVE"));
        match state
            .db
            .integrations()
            .set_status_by_account(account_id, status)
            .await?
        {
            Some(row) => {
                tracing::info!(user_id = row.user_id, status, "oauth callback applied")
            }
            None => tracing::warn!(account_id = %account_id, "oauth callback for unknown account"),
        }
    }
    Ok(Json(serde_json::json!({
        "message": "Connection updated. You can close this window."
    })))
}
