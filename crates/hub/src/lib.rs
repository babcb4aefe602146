//! `valet-hub` — client for the external connector-hub SaaS.
//!
//! The hub owns OAuth for third-party tools (mail, calendar, ...) and
//! exposes an MCP "tool router" that agent CLI sessions call back into.
//! This crate wraps its REST API ([`HubClient`]), the DTOs it speaks
//! ([`types`]), and the per-user tool-router session cache
//! ([`SessionCache`]).

pub mod rest;
pub mod session;
pub mod types;

pub use rest::HubClient;
pub use session::{RouterSession, SessionCache};
pub use types::{
    AuthConfig, AuthConfigList, ConnectedAccount, InitiateConnectionRequest,
    InitiateConnectionResponse, RouterSessionRequest, RouterSessionResponse,
};
