//! Event model for the CLI adapter.
//!
//! The agent CLI emits one JSON object per output line. Lines that parse
//! become [`CliEvent`]s; lines that don't are degraded to
//! [`CliEvent::Raw`] so one garbled diagnostic never desynchronizes the
//! stream.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Role
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Role of a persisted message (or of the terminal frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolUse,
    ToolResult,
    Result,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::ToolUse => "tool_use",
            Role::ToolResult => "tool_result",
            Role::Result => "result",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool_use" => Ok(Role::ToolUse),
            "tool_result" => Ok(Role::ToolResult),
            "result" => Ok(Role::Result),
            other => Err(crate::error::Error::Invalid(format!(
                "unknown role: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Content blocks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One unit of structured output from the agent session: free text, a
/// tool invocation, or a tool result.
///
/// Fields beyond `type` and `text` vary per block kind (tool name, input
/// payload, ...) and are kept verbatim in `extra` so the block survives a
/// persist/reload round trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContentBlock {
    /// A plain text block (the shape of every root user message).
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".into(),
            text: Some(text.into()),
            extra: serde_json::Map::new(),
        }
    }

    pub fn is_tool_use(&self) -> bool {
        self.kind == "tool_use"
    }

    pub fn is_tool_result(&self) -> bool {
        self.kind == "tool_result"
    }

    /// Trimmed display text, empty when the block carries none.
    pub fn display_text(&self) -> String {
        self.text.as_deref().unwrap_or("").trim().to_owned()
    }
}

/// The `message` envelope of an `assistant`/`user` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CliEvent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One decoded unit of agent CLI output.
#[derive(Debug, Clone, PartialEq)]
pub enum CliEvent {
    /// Assistant output (text and/or tool invocations).
    Assistant(EventMessage),
    /// Tool results echoed back into the session.
    User(EventMessage),
    /// Turn-completion sentinel; terminates the sequence.
    Result,
    /// A valid JSON event of a kind the pipeline does not consume
    /// (e.g. `system` init chatter). Skipped downstream.
    Other { kind: String },
    /// A line that failed to parse as JSON. Logged, never persisted.
    Raw { text: String },
}

/// Wire shape of one CLI output line.
#[derive(Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<EventMessage>,
}

impl CliEvent {
    /// Parse one complete output line. Never fails: non-JSON input (or
    /// JSON without an event shape) becomes [`CliEvent::Raw`].
    pub fn parse_line(line: &str) -> Option<CliEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<WireEvent>(line) {
            Ok(ev) => Some(match ev.kind.as_str() {
                "assistant" => CliEvent::Assistant(ev.message.unwrap_or_default()),
                "user" => CliEvent::User(ev.message.unwrap_or_default()),
                "result" => CliEvent::Result,
                _ => CliEvent::Other { kind: ev.kind },
            }),
            Err(_) => Some(CliEvent::Raw {
                text: line.to_owned(),
            }),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assistant_event_with_text_block() {
        let ev = CliEvent::parse_line(
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hi"}]}}"#,
        )
        .unwrap();
        match ev {
            CliEvent::Assistant(msg) => {
                assert_eq!(msg.content.len(), 1);
                assert_eq!(msg.content[0].kind, "text");
                assert_eq!(msg.content[0].text.as_deref(), Some("hi"));
            }
            other => panic!("expected assistant, got {other:?}"),
        }
    }

    #[test]
    fn parses_result_sentinel() {
        assert_eq!(
            CliEvent::parse_line(r#"{"type":"result","subtype":"success"}"#),
            Some(CliEvent::Result)
        );
    }

    #[test]
    fn non_json_line_degrades_to_raw() {
        assert_eq!(
            CliEvent::parse_line("Loading model..."),
            Some(CliEvent::Raw {
                text: "Loading model...".into()
            })
        );
    }

    #[test]
    fn unknown_event_kind_is_other() {
        assert_eq!(
            CliEvent::parse_line(r#"{"type":"system","session_id":"abc"}"#),
            Some(CliEvent::Other {
                kind: "system".into()
            })
        );
    }

    #[test]
    fn blank_line_yields_nothing() {
        assert_eq!(CliEvent::parse_line("   "), None);
    }

    #[test]
    fn tool_use_block_keeps_extra_fields() {
        let ev = CliEvent::parse_line(
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"gmail_list","input":{"q":"unread"}}]}}"#,
        )
        .unwrap();
        let CliEvent::Assistant(msg) = ev else {
            panic!("expected assistant");
        };
        let block = &msg.content[0];
        assert!(block.is_tool_use());
        assert_eq!(block.extra["name"], "gmail_list");
        // Round trip preserves the full block.
        let json = serde_json::to_value(block).unwrap();
        assert_eq!(json["input"]["q"], "unread");
    }
}
