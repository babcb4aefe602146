use std::sync::Arc;

use valet_agent::AgentCli;
use valet_domain::config::Config;
use valet_hub::{HubClient, RouterSession, SessionCache};
use valet_storage::Database;

use crate::auth::AuthKeys;

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services** — config, database, agent CLI adapter
/// - **Auth** — JWT signing/verification keys
/// - **Integrations** — connector-hub client + tool-router session cache
/// - **Proxy** — shared HTTP client for per-user remote backends
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub db: Database,
    pub agent: AgentCli,

    // ── Auth ──────────────────────────────────────────────────────────
    pub auth: Arc<AuthKeys>,

    // ── Integrations ──────────────────────────────────────────────────
    /// `None` when no hub is configured; integration endpoints 503.
    pub hub: Option<Arc<HubClient>>,
    /// Per-user tool-router sessions, shared across concurrent requests.
    pub router_sessions: Arc<SessionCache<i64, RouterSession>>,

    // ── Proxy ─────────────────────────────────────────────────────────
    /// Single shared client for relaying sends to remote backends.
    /// No read timeout: SSE bodies stay open for the whole turn.
    pub proxy_http: reqwest::Client,
}
