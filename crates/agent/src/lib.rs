//! `valet-agent` — the CLI/process adapter.
//!
//! Turns one text prompt into a lazy, finite stream of [`CliEvent`]s by
//! spawning the external agent CLI and incrementally decoding its
//! newline-delimited JSON output.
//!
//! Three layers, outermost first:
//!
//! - [`AgentCli`] — spawns a channel per prompt and drives decoding,
//!   the generation-timeout budget, and exit-status handling.
//! - [`channel`] — the line-oriented subprocess channel: one handle
//!   shape, two spawn paths (pipes everywhere, a pseudo terminal where
//!   the platform supports it). Termination is graceful-then-forced and
//!   runs on every exit path, including consumer drop.
//! - [`LineDecoder`] — pure byte-buffer → event decoding, independent
//!   of any I/O.
//!
//! Streams are not restartable: every call to [`AgentCli::stream`]
//! spawns a new process.

pub mod channel;
pub mod decode;

mod cli;

pub use cli::{AgentCli, EventStream};
pub use decode::LineDecoder;

pub use valet_domain::event::CliEvent;
