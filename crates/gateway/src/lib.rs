//! `valet-gateway` — the Valet HTTP API.
//!
//! Layering, outermost first: `api` (axum handlers), `runtime` (turn
//! assembly, workflow execution, the schedule loop), then the shared
//! crates (`valet-agent`, `valet-storage`, `valet-hub`).

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
