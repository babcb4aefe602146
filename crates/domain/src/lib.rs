//! `valet-domain` — shared types for the Valet backend.
//!
//! Carries the config tree, the crate-wide error type, the CLI adapter
//! event model, and the outward turn-frame model. No I/O lives here.

pub mod config;
pub mod error;
pub mod event;
pub mod frame;

pub use error::{Error, Result};
pub use event::{CliEvent, ContentBlock, EventMessage, Role};
pub use frame::{ErrorFrame, MessageFrame, ResultFrame, StartedFrame, TurnFrame};
