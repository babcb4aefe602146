//! Line-oriented subprocess channel.
//!
//! One handle shape, two spawn paths: [`pipe`] uses plain OS pipes and
//! works everywhere; [`pty`] attaches the child to a pseudo terminal so
//! CLIs that only line-buffer on a TTY behave. Callers never see the
//! difference — both deliver combined output chunks over an mpsc
//! channel, followed by a single [`ChannelMsg::Exit`].
//!
//! Dropping the handle (or its [`Terminator`]) triggers the termination
//! sequence: graceful signal, bounded grace period, force-kill. The
//! monitor task outlives the handle so cleanup always completes.

pub mod pipe;
pub mod pty;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use valet_domain::config::{AgentConfig, ChannelMode};
use valet_domain::error::Result;

/// How the child exited.
#[derive(Debug, Clone, Copy)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub success: bool,
}

/// Messages produced by a channel's monitor.
#[derive(Debug)]
pub enum ChannelMsg {
    /// A chunk of combined child output, raw bytes.
    Chunk(Vec<u8>),
    /// The child was reaped. Always the last message.
    Exit(ExitInfo),
}

/// Cancellation handle for a spawned channel. Dropping it requests the
/// termination sequence; the detached monitor task carries it out.
#[derive(Debug)]
pub struct Terminator {
    token: CancellationToken,
}

impl Terminator {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Drop for Terminator {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// A live subprocess channel.
#[derive(Debug)]
pub struct ChannelHandle {
    pub messages: mpsc::Receiver<ChannelMsg>,
    _terminator: Terminator,
}

impl ChannelHandle {
    pub(crate) fn new(messages: mpsc::Receiver<ChannelMsg>, terminator: Terminator) -> Self {
        Self {
            messages,
            _terminator: terminator,
        }
    }
}

/// Resolve `Auto` to a concrete mode for this platform.
pub fn resolve_mode(mode: ChannelMode) -> ChannelMode {
    match mode {
        ChannelMode::Auto => {
            if cfg!(unix) {
                ChannelMode::Pty
            } else {
                ChannelMode::Pipe
            }
        }
        other => other,
    }
}

/// Spawn the agent CLI for one prompt and return its output channel.
pub fn spawn(config: &AgentConfig, prompt: &str) -> Result<ChannelHandle> {
    let argv: Vec<String> = config
        .args
        .iter()
        .cloned()
        .chain(std::iter::once(prompt.to_owned()))
        .collect();

    match resolve_mode(config.channel) {
        ChannelMode::Pty => pty::spawn(config, &argv),
        _ => pipe::spawn(config, &argv),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_resolves_to_a_concrete_mode() {
        let resolved = resolve_mode(ChannelMode::Auto);
        assert_ne!(resolved, ChannelMode::Auto);
    }

    #[test]
    fn explicit_modes_pass_through() {
        assert_eq!(resolve_mode(ChannelMode::Pipe), ChannelMode::Pipe);
        assert_eq!(resolve_mode(ChannelMode::Pty), ChannelMode::Pty);
    }
}
