//! Auth endpoints — registration, login, token refresh, profile.
//!
//! - `POST /v1/auth/register` — create account, return token pair
//! - `POST /v1/auth/login`    — verify credentials, return token pair
//! - `POST /v1/auth/refresh`  — refresh token → new pair
//! - `GET  /v1/auth/me`       — current user profile

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use valet_domain::error::Error;
use valet_storage::{NewUser, UserRow};

use crate::auth::{CurrentUser, TokenKind};
use crate::api::error::ApiResult;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / response shapes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub access_token: String,
    pub refresh_token: String,
}

fn token_pair(state: &AppState, user_id: i64) -> ApiResult<TokensResponse> {
    Ok(TokensResponse {
        access_token: state.auth.issue(user_id, TokenKind::Access)?,
        refresh_token: state.auth.issue(user_id, TokenKind::Refresh)?,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handlers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<Json<TokensResponse>> {
    let email = body.email.trim().to_ascii_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::Invalid("invalid email address".into()).into());
    }
    if body.password.len() < 8 {
        return Err(Error::Invalid("password must be at least 8 characters".into()).into());
    }

    if state.db.users().get_by_email(&email).await?.is_some() {
        return Err(Error::Conflict("email already registered".into()).into());
    }

    // Hashing is CPU-bound; keep it off the event loop.
    let password = body.password;
    let password_hash = tokio::task::spawn_blocking(move || {
        bcrypt::hash(password, bcrypt::DEFAULT_COST)
    })
    .await
    .map_err(|e| Error::Other(e.to_string()))?
    .map_err(|e| Error::Other(format!("hashing password: {e}")))?;

    let user = state
        .db
        .users()
        .create(NewUser {
            email,
            password_hash: Some(password_hash),
            name: body.name.trim().to_owned(),
            company: body.company,
        })
        .await?;

    tracing::info!(user_id = user.id, "user registered");
    token_pair(&state, user.id).map(Json)
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<TokensResponse>> {
    let email = body.email.trim().to_ascii_lowercase();

    // Unknown email and wrong password are indistinguishable.
    let invalid = || Error::Auth("invalid credentials".into());

    let user = state
        .db
        .users()
        .get_by_email(&email)
        .await?
        .ok_or_else(invalid)?;
    let hash = user.password_hash.clone().ok_or_else(invalid)?;

    let password = body.password;
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| Error::Other(e.to_string()))?
        .unwrap_or(false);

    if !verified {
        return Err(invalid().into());
    }

    tracing::info!(user_id = user.id, "user logged in");
    token_pair(&state, user.id).map(Json)
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<Json<TokensResponse>> {
    let user_id = state.auth.verify(&body.refresh_token, TokenKind::Refresh)?;

    // The account must still exist.
    state
        .db
        .users()
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| Error::Auth("unknown user".into()))?;

    token_pair(&state, user_id).map(Json)
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserRow> {
    Json(user)
}
