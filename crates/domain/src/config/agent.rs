use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent CLI (the external model session process)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How the adapter attaches to the child's output.
///
/// The target CLI only line-buffers its stream-JSON output when it is
/// attached to a terminal-like device, so `Auto` prefers a pseudo
/// terminal on unix and falls back to pipes elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    Auto,
    Pty,
    Pipe,
}

impl Default for ChannelMode {
    fn default() -> Self {
        Self::Auto
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// The agent executable.
    #[serde(default = "d_command")]
    pub command: String,
    /// Flags placed before the prompt. The prompt itself is always the
    /// final positional argument.
    #[serde(default = "d_args")]
    pub args: Vec<String>,
    /// Working directory for the spawned process.
    #[serde(default)]
    pub workdir: Option<PathBuf>,
    #[serde(default)]
    pub channel: ChannelMode,
    /// Generation timeout budget for one turn, in seconds.
    #[serde(default = "d_timeout_sec")]
    pub timeout_sec: u64,
    /// Grace period between graceful termination and force-kill.
    #[serde(default = "d_kill_grace_sec")]
    pub kill_grace_sec: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: d_command(),
            args: d_args(),
            workdir: None,
            channel: ChannelMode::default(),
            timeout_sec: d_timeout_sec(),
            kill_grace_sec: d_kill_grace_sec(),
        }
    }
}

fn d_command() -> String {
    "claude".into()
}

fn d_args() -> Vec<String> {
    vec![
        "--continue".into(),
        "--output-format".into(),
        "stream-json".into(),
        "--verbose".into(),
        "--print".into(),
    ]
}

fn d_timeout_sec() -> u64 {
    300
}

fn d_kill_grace_sec() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_requests_stream_json_output() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.command, "claude");
        assert!(cfg.args.iter().any(|a| a == "stream-json"));
        assert_eq!(cfg.channel, ChannelMode::Auto);
    }

    #[test]
    fn channel_mode_parses_lowercase() {
        let cfg: AgentConfig = toml::from_str(r#"channel = "pipe""#).unwrap();
        assert_eq!(cfg.channel, ChannelMode::Pipe);
    }
}
