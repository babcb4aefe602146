//! AppState construction and background-task spawning.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use valet_agent::AgentCli;
use valet_domain::config::{Config, ConfigSeverity};
use valet_hub::{HubClient, SessionCache};
use valet_storage::Database;

use crate::auth::AuthKeys;
use crate::runtime::scheduler;
use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Database ─────────────────────────────────────────────────────
    let db = Database::connect(&config.database)
        .await
        .context("connecting to database")?;
    tracing::info!("database ready");

    // ── Auth keys ────────────────────────────────────────────────────
    let auth = Arc::new(AuthKeys::from_config(&config.auth).context("initializing auth keys")?);
    tracing::info!(issuer = %config.auth.issuer, "auth keys ready");

    // ── Agent CLI adapter ────────────────────────────────────────────
    let agent = AgentCli::new(config.agent.clone());
    tracing::info!(
        command = %config.agent.command,
        channel = ?config.agent.channel,
        timeout_sec = config.agent.timeout_sec,
        "agent CLI adapter ready"
    );

    // ── Connector hub ────────────────────────────────────────────────
    let hub = if config.hub.enabled() {
        let client = HubClient::new(&config.hub).context("initializing hub client")?;
        tracing::info!(base_url = %config.hub.base_url, "connector hub client ready");
        Some(Arc::new(client))
    } else {
        tracing::info!("connector hub not configured — integration endpoints disabled");
        None
    };

    // ── Proxy client ─────────────────────────────────────────────────
    // No overall timeout: relayed SSE responses stay open for the whole
    // turn. Identity encoding keeps upstream event framing intact.
    let proxy_http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.proxy.connect_timeout_sec))
        .no_gzip()
        .no_brotli()
        .no_deflate()
        .build()
        .context("building proxy HTTP client")?;

    Ok(AppState {
        config,
        db,
        agent,
        auth,
        hub,
        router_sessions: Arc::new(SessionCache::new()),
        proxy_http,
    })
}

/// Spawn long-lived background loops (currently just the workflow
/// scheduler).
pub fn spawn_background_tasks(state: &AppState) {
    if state.config.scheduler.enabled {
        tokio::spawn(scheduler::run(state.clone()));
        tracing::info!(
            tick_sec = state.config.scheduler.tick_sec,
            timezone = %state.config.scheduler.timezone,
            "workflow scheduler started"
        );
    } else {
        tracing::info!("workflow scheduler disabled");
    }
}
