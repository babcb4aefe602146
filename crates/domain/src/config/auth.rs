use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auth (JWT issuance / verification)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable holding the HS256 signing secret.
    /// The server refuses to start without it.
    #[serde(default = "d_secret_env")]
    pub secret_env: String,
    /// `iss` claim pinned on every issued token.
    #[serde(default = "d_issuer")]
    pub issuer: String,
    #[serde(default = "d_access_ttl")]
    pub access_ttl_minutes: i64,
    #[serde(default = "d_refresh_ttl")]
    pub refresh_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_env: d_secret_env(),
            issuer: d_issuer(),
            access_ttl_minutes: d_access_ttl(),
            refresh_ttl_minutes: d_refresh_ttl(),
        }
    }
}

fn d_secret_env() -> String {
    "VALET_AUTH_SECRET".into()
}
fn d_issuer() -> String {
    "valet".into()
}
fn d_access_ttl() -> i64 {
    30
}
fn d_refresh_ttl() -> i64 {
    60 * 24 * 14
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_outlives_access_by_default() {
        let cfg = AuthConfig::default();
        assert!(cfg.refresh_ttl_minutes > cfg.access_ttl_minutes);
        assert_eq!(cfg.issuer, "valet");
    }
}
