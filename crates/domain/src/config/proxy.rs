use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Upstream proxy (per-user remote backends)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// When `false` every send is answered by the local agent CLI.
    /// When `true`, users with an assigned `server_host` are proxied to
    /// their remote backend instead.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "d_connect_timeout_sec")]
    pub connect_timeout_sec: u64,
    #[serde(default = "d_write_timeout_sec")]
    pub write_timeout_sec: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            connect_timeout_sec: d_connect_timeout_sec(),
            write_timeout_sec: d_write_timeout_sec(),
        }
    }
}

fn d_connect_timeout_sec() -> u64 {
    10
}
fn d_write_timeout_sec() -> u64 {
    60
}
