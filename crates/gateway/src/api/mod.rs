pub mod auth;
pub mod conversations;
pub mod error;
pub mod health;
pub mod integrations;
pub mod mcp;
pub mod messages;
pub mod workflows;

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// `/health`, the auth entry points, and the OAuth callback are public;
/// everything else resolves the requester through the `CurrentUser`
/// extractor and fails with 401 before any handler logic runs.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health::health))
        // Auth
        .route("/v1/auth/register", post(auth::register))
        .route("/v1/auth/login", post(auth::login))
        .route("/v1/auth/refresh", post(auth::refresh))
        .route("/v1/auth/me", get(auth::me))
        // Messaging (core pipeline)
        .route("/v1/messages", get(messages::get_messages))
        .route("/v1/messages", post(messages::send_message))
        // Conversations
        .route("/v1/conversations", get(conversations::list))
        .route("/v1/conversations/:id", patch(conversations::patch))
        .route("/v1/conversations/:id", delete(conversations::delete))
        // Workflows
        .route("/v1/workflows", get(workflows::list))
        .route("/v1/workflows", post(workflows::create))
        .route("/v1/workflows/:id", get(workflows::get))
        .route("/v1/workflows/:id", patch(workflows::patch))
        .route("/v1/workflows/:id", delete(workflows::delete))
        .route("/v1/workflows/:id/run", post(workflows::run))
        // Integrations
        .route("/v1/integrations", get(integrations::list))
        .route("/v1/integrations/callback", get(integrations::callback))
        .route("/v1/integrations/:slug/connect", post(integrations::connect))
        .route("/v1/integrations/:slug/status", get(integrations::status))
        .route(
            "/v1/integrations/:slug/disconnect",
            post(integrations::disconnect),
        )
        // MCP (agent CLI tool access)
        .route("/v1/mcp", get(mcp::config))
        .route("/v1/mcp/router", post(mcp::router))
}
