//! Token issuance and requester resolution.
//!
//! Tokens are HS256 JWTs signed with the secret from the env var named
//! by `auth.secret_env`. Access and refresh tokens differ only in
//! `token_type` and lifetime; a refresh token is never accepted where an
//! access token is required (and vice versa).

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use valet_domain::config::AuthConfig;
use valet_domain::error::{Error, Result};
use valet_storage::UserRow;

use crate::api::error::ApiError;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tokens
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    exp: i64,
    iat: i64,
    token_type: TokenKind,
}

/// Signing and verification material, built once at bootstrap.
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthKeys {
    /// Read the signing secret from the configured env var.
    pub fn from_config(cfg: &AuthConfig) -> Result<Self> {
        let secret = std::env::var(&cfg.secret_env)
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::Config(format!("auth secret env var {} is not set", cfg.secret_env))
            })?;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            access_ttl: Duration::minutes(cfg.access_ttl_minutes),
            refresh_ttl: Duration::minutes(cfg.refresh_ttl_minutes),
        })
    }

    pub fn issue(&self, user_id: i64, kind: TokenKind) -> Result<String> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            token_type: kind,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Auth(e.to_string()))
    }

    /// Verify a token of the expected kind and return the user id.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<i64> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["iss", "exp", "iat", "sub"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| Error::Auth(format!("token verification failed: {e}")))?;

        if data.claims.token_type != expected {
            return Err(Error::Auth("wrong token type".into()));
        }
        data.claims
            .sub
            .parse::<i64>()
            .map_err(|_| Error::Auth("malformed subject claim".into()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CurrentUser extractor
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Pull a bearer token out of the `Authorization` header, if present.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// The authenticated requester, resolved before any handler logic runs.
pub struct CurrentUser(pub UserRow);

#[async_trait::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| Error::Auth("missing bearer token".into()))?;

        let user_id = state.auth.verify(token, TokenKind::Access)?;

        let user = state
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| Error::Auth("unknown user".into()))?;

        Ok(CurrentUser(user))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> AuthKeys {
        AuthKeys {
            encoding: EncodingKey::from_secret(b"test-secret"),
            decoding: DecodingKey::from_secret(b"test-secret"),
            issuer: "valet".into(),
            access_ttl: Duration::minutes(30),
            refresh_ttl: Duration::minutes(60),
        }
    }

    #[test]
    fn access_token_round_trips() {
        let keys = keys();
        let token = keys.issue(42, TokenKind::Access).unwrap();
        assert_eq!(keys.verify(&token, TokenKind::Access).unwrap(), 42);
    }

    #[test]
    fn refresh_token_rejected_as_access() {
        let keys = keys();
        let token = keys.issue(42, TokenKind::Refresh).unwrap();
        let err = keys.verify(&token, TokenKind::Access).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn foreign_issuer_rejected() {
        let base = keys();
        let other = AuthKeys {
            issuer: "someone-else".into(),
            ..base
        };
        let token = other.issue(42, TokenKind::Access).unwrap();
        assert!(keys().verify(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn garbage_token_rejected() {
        assert!(keys().verify("not.a.token", TokenKind::Access).is_err());
    }
}
