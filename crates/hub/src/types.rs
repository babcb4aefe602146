//! DTOs matching the connector-hub API schema.

use serde::{Deserialize, Serialize};

/// One OAuth app configuration registered with the hub.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub id: String,
    pub toolkit: Toolkit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Toolkit {
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfigList {
    #[serde(default)]
    pub items: Vec<AuthConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitiateConnectionRequest {
    pub entity_id: String,
    pub auth_config_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitiateConnectionResponse {
    /// Connected-account id to poll for status.
    pub id: String,
    /// Where the end user completes the OAuth flow.
    pub redirect_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectedAccount {
    pub id: String,
    /// Hub-side status, e.g. `INITIATED`, `ACTIVE`, `FAILED`.
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouterSessionRequest {
    pub entity_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterSessionResponse {
    pub session_id: String,
    /// Fully-qualified MCP endpoint for this session.
    pub mcp_url: String,
}
