use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connector hub (third-party integration SaaS)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Base URL of the connector hub API. Empty = integrations disabled.
    #[serde(default)]
    pub base_url: String,
    /// Environment variable holding the hub API key.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    /// Public base URL of this deployment, used to build the OAuth
    /// callback and the MCP router URL handed to CLI sessions.
    #[serde(default = "d_public_url")]
    pub public_url: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key_env: d_api_key_env(),
            timeout_ms: d_timeout_ms(),
            public_url: d_public_url(),
        }
    }
}

impl HubConfig {
    pub fn enabled(&self) -> bool {
        !self.base_url.is_empty()
    }

    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

fn d_api_key_env() -> String {
    "VALET_HUB_API_KEY".into()
}
fn d_timeout_ms() -> u64 {
    30_000
}
fn d_public_url() -> String {
    "http://127.0.0.1:8080".into()
}
