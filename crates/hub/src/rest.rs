//! REST client for the connector hub.
//!
//! Created once at bootstrap and shared; the inner `reqwest::Client`
//! maintains the connection pool. Failures map to [`Error::Hub`] and are
//! never retried here — connection management is interactive and the
//! caller simply re-issues the request.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use valet_domain::config::HubConfig;
use valet_domain::error::{Error, Result};

use crate::types::{
    AuthConfigList, ConnectedAccount, InitiateConnectionRequest, InitiateConnectionResponse,
    RouterSessionRequest, RouterSessionResponse,
};

#[derive(Debug, Clone)]
pub struct HubClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HubClient {
    pub fn new(cfg: &HubConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Hub(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            api_key: cfg.api_key(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => rb.header("x-api-key", key),
            None => rb,
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, rb: RequestBuilder) -> Result<T> {
        let resp = self
            .decorate(rb)
            .send()
            .await
            .map_err(|e| Error::Hub(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Hub(format!("{status}: {body}")));
        }
        resp.json::<T>()
            .await
            .map_err(|e| Error::Hub(format!("decoding response: {e}")))
    }

    /// List every OAuth app configuration registered with the hub.
    pub async fn list_auth_configs(&self) -> Result<AuthConfigList> {
        self.read_json(self.http.get(self.url("/auth_configs"))).await
    }

    /// Find the auth config for a toolkit slug, if one is registered.
    pub async fn auth_config_for(&self, slug: &str) -> Result<Option<String>> {
        let configs = self.list_auth_configs().await?;
        Ok(configs
            .items
            .into_iter()
            .find(|c| c.toolkit.slug.eq_ignore_ascii_case(slug))
            .map(|c| c.id))
    }

    /// Start the OAuth flow for `entity_id` against one auth config.
    pub async fn initiate_connection(
        &self,
        req: &InitiateConnectionRequest,
    ) -> Result<InitiateConnectionResponse> {
        self.read_json(
            self.http
                .post(self.url("/connected_accounts/initiate"))
                .json(req),
        )
        .await
    }

    pub async fn get_connected_account(&self, id: &str) -> Result<ConnectedAccount> {
        self.read_json(self.http.get(self.url(&format!("/connected_accounts/{id}"))))
            .await
    }

    pub async fn delete_connected_account(&self, id: &str) -> Result<()> {
        let resp = self
            .decorate(self.http.delete(self.url(&format!("/connected_accounts/{id}"))))
            .send()
            .await
            .map_err(|e| Error::Hub(e.to_string()))?;

        // Already gone counts as disconnected.
        if !resp.status().is_success() && resp.status() != StatusCode::NOT_FOUND {
            return Err(Error::Hub(format!("{}", resp.status())));
        }
        Ok(())
    }

    /// Create a tool-router session for an entity.
    pub async fn create_router_session(
        &self,
        entity_id: &str,
    ) -> Result<RouterSessionResponse> {
        self.read_json(
            self.http
                .post(self.url("/tool_router/sessions"))
                .json(&RouterSessionRequest {
                    entity_id: entity_id.to_owned(),
                }),
        )
        .await
    }

    /// Forward one JSON-RPC request to a session's MCP endpoint.
    pub async fn forward_rpc(
        &self,
        mcp_url: &str,
        body: &serde_json::Value,
        accept: &str,
    ) -> Result<serde_json::Value> {
        self.read_json(self.http.post(mcp_url).header("accept", accept).json(body))
            .await
    }
}
