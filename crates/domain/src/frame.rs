//! Outward frame model — the units of the turn SSE stream.
//!
//! Persisted message frames and the ephemeral terminal frame are kept
//! as distinct variants: the terminal `result` frame carries a freshly
//! minted message id that is never written to storage.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Opening frame: the turn has been accepted and the conversation is live.
#[derive(Debug, Clone, Serialize)]
pub struct StartedFrame {
    pub user_id: i64,
    pub conversation_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
}

impl StartedFrame {
    pub fn new(user_id: i64, conversation_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            conversation_id,
            kind: "resume_conversation".into(),
            timestamp: at,
        }
    }
}

/// A frame describing one persisted message row.
#[derive(Debug, Clone, Serialize)]
pub struct MessageFrame {
    pub user_id: i64,
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub role: crate::event::Role,
    /// The full structured content block, verbatim.
    pub content: serde_json::Value,
    /// Position within the turn (root user message = 0).
    pub seq: i32,
    pub timestamp: DateTime<Utc>,
}

/// Terminal frame: the turn completed. `message_id` is ephemeral.
#[derive(Debug, Clone, Serialize)]
pub struct ResultFrame {
    pub user_id: i64,
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub role: crate::event::Role,
    pub timestamp: DateTime<Utc>,
}

impl ResultFrame {
    pub fn new(user_id: i64, conversation_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            conversation_id,
            message_id: Uuid::new_v4(),
            role: crate::event::Role::Result,
            timestamp: at,
        }
    }
}

/// Transport-level error frame, distinct from message frames so a client
/// can tell "failed" from "done".
#[derive(Debug, Clone, Serialize)]
pub struct ErrorFrame {
    pub error: String,
}

/// One unit of the outward event stream.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TurnFrame {
    Started(StartedFrame),
    Persisted(MessageFrame),
    Result(ResultFrame),
    Error(ErrorFrame),
}

impl TurnFrame {
    /// Whether no further frames follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnFrame::Result(_) | TurnFrame::Error(_))
    }

    /// SSE event name; message-bearing frames are plain `data:` frames.
    pub fn event_name(&self) -> Option<&'static str> {
        match self {
            TurnFrame::Error(_) => Some("error"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Role;

    #[test]
    fn result_frame_serializes_with_result_role() {
        let frame = ResultFrame::new(7, Uuid::new_v4(), Utc::now());
        let json = serde_json::to_value(TurnFrame::Result(frame)).unwrap();
        assert_eq!(json["role"], "result");
        assert!(json["message_id"].is_string());
    }

    #[test]
    fn started_frame_carries_resume_marker() {
        let frame = StartedFrame::new(1, Uuid::new_v4(), Utc::now());
        let json = serde_json::to_value(TurnFrame::Started(frame)).unwrap();
        assert_eq!(json["type"], "resume_conversation");
    }

    #[test]
    fn only_error_frames_carry_an_event_name() {
        let err = TurnFrame::Error(ErrorFrame {
            error: "boom".into(),
        });
        assert_eq!(err.event_name(), Some("error"));
        assert!(err.is_terminal());

        let msg = TurnFrame::Persisted(MessageFrame {
            user_id: 1,
            conversation_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            role: Role::Assistant,
            content: serde_json::json!({"type": "text", "text": "hi"}),
            seq: 1,
            timestamp: Utc::now(),
        });
        assert_eq!(msg.event_name(), None);
        assert!(!msg.is_terminal());
    }
}
