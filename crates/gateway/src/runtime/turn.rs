//! Turn assembly — adapter events in, persisted rows + outward frames out.
//!
//! For every content block of an `assistant` event a `tool_use` block
//! becomes a `tool_use` message and anything else an `assistant`
//! message; for blocks of a `user` event (tool results echoed back into
//! the session) a `tool_result` block becomes `tool_result`, anything
//! else `assistant`. Each block is persisted parented to the turn's root
//! user message with an incrementing `seq`, the conversation's
//! `updated_date` is bumped, and one outward frame is emitted.
//!
//! The `result` sentinel is the sole expected termination: it emits the
//! ephemeral terminal frame (its message id is never persisted). A
//! persistence or adapter failure emits one error frame and stops;
//! already-persisted messages stay.
//!
//! Storage is reached through [`TurnStore`] so assembly is testable
//! without Postgres. Dropping the returned frame stream drops the
//! adapter stream, which triggers process termination upstream.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_core::Stream;
use futures_util::StreamExt;
use uuid::Uuid;

use valet_domain::error::Result;
use valet_domain::event::{CliEvent, ContentBlock, Role};
use valet_domain::frame::{ErrorFrame, MessageFrame, ResultFrame, TurnFrame};
use valet_storage::{Database, MessageRow, NewMessage};

use valet_agent::EventStream;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TurnStore
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The slice of storage a turn needs: append one message, bump the
/// parent conversation.
#[async_trait::async_trait]
pub trait TurnStore: Send + Sync {
    async fn insert_message(&self, msg: NewMessage) -> Result<MessageRow>;
    async fn touch_conversation(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

#[async_trait::async_trait]
impl TurnStore for Database {
    async fn insert_message(&self, msg: NewMessage) -> Result<MessageRow> {
        self.messages().create(msg).await
    }

    async fn touch_conversation(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.conversations().touch(id, at).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn context + root persistence
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Identity of one in-flight turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext {
    pub user_id: i64,
    pub conversation_id: Uuid,
    pub root_message_id: Uuid,
}

/// Persist the root user message for a turn. Called *before* the
/// adapter is invoked so a crash mid-stream still leaves the user's
/// input durably recorded.
pub async fn persist_root<S: TurnStore + ?Sized>(
    store: &S,
    user_id: i64,
    conversation_id: Uuid,
    prompt: &str,
) -> Result<MessageRow> {
    let now = Utc::now();
    let block = ContentBlock::text(prompt);
    let row = store
        .insert_message(NewMessage {
            user_id,
            parent_message_id: None,
            conversation_id,
            role: Role::User,
            content: prompt.to_owned(),
            payload: serde_json::to_value(&block)?,
            seq: 0,
            timestamp: now,
        })
        .await?;
    store.touch_conversation(conversation_id, now).await?;
    Ok(row)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// stream_turn
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drive one turn: consume adapter events, persist each content block,
/// and yield outward frames in source order.
pub fn stream_turn<S>(
    store: Arc<S>,
    events: EventStream,
    ctx: TurnContext,
) -> impl Stream<Item = TurnFrame> + Send
where
    S: TurnStore + 'static,
{
    async_stream::stream! {
        let mut events = events;
        let mut seq = 0i32;

        while let Some(item) = events.next().await {
            match item {
                Ok(CliEvent::Assistant(msg)) => {
                    for block in msg.content {
                        let role = if block.is_tool_use() {
                            Role::ToolUse
                        } else {
                            Role::Assistant
                        };
                        seq += 1;
                        match persist_block(store.as_ref(), &ctx, role, block, seq).await {
                            Ok(frame) => yield TurnFrame::Persisted(frame),
                            Err(e) => {
                                tracing::error!(error = %e, "persisting message failed — aborting turn");
                                yield TurnFrame::Error(ErrorFrame { error: e.to_string() });
                                return;
                            }
                        }
                    }
                }
                Ok(CliEvent::User(msg)) => {
                    for block in msg.content {
                        let role = if block.is_tool_result() {
                            Role::ToolResult
                        } else {
                            Role::Assistant
                        };
                        seq += 1;
                        match persist_block(store.as_ref(), &ctx, role, block, seq).await {
                            Ok(frame) => yield TurnFrame::Persisted(frame),
                            Err(e) => {
                                tracing::error!(error = %e, "persisting message failed — aborting turn");
                                yield TurnFrame::Error(ErrorFrame { error: e.to_string() });
                                return;
                            }
                        }
                    }
                }
                Ok(CliEvent::Result) => {
                    tracing::debug!(conversation_id = %ctx.conversation_id, "turn finished");
                    yield TurnFrame::Result(ResultFrame::new(
                        ctx.user_id,
                        ctx.conversation_id,
                        Utc::now(),
                    ));
                    return;
                }
                Ok(CliEvent::Raw { text }) => {
                    tracing::info!(line = %text, "raw agent output");
                }
                Ok(CliEvent::Other { kind }) => {
                    tracing::debug!(kind = %kind, "unhandled agent event");
                }
                Err(e) => {
                    tracing::error!(error = %e, "agent stream failed");
                    yield TurnFrame::Error(ErrorFrame { error: e.to_string() });
                    return;
                }
            }
        }

        // The adapter ended without the sentinel (clean exit, no result).
        yield TurnFrame::Error(ErrorFrame {
            error: "agent session ended without a result".into(),
        });
    }
}

async fn persist_block<S: TurnStore + ?Sized>(
    store: &S,
    ctx: &TurnContext,
    role: Role,
    block: ContentBlock,
    seq: i32,
) -> Result<MessageFrame> {
    let now = Utc::now();
    let payload = serde_json::to_value(&block)?;

    let row = store
        .insert_message(NewMessage {
            user_id: ctx.user_id,
            parent_message_id: Some(ctx.root_message_id),
            conversation_id: ctx.conversation_id,
            role,
            content: block.display_text(),
            payload: payload.clone(),
            seq,
            timestamp: now,
        })
        .await?;
    store.touch_conversation(ctx.conversation_id, now).await?;

    Ok(MessageFrame {
        user_id: ctx.user_id,
        conversation_id: ctx.conversation_id,
        message_id: row.id,
        role,
        content: payload,
        seq,
        timestamp: row.timestamp,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use valet_domain::error::Error;
    use valet_domain::event::EventMessage;

    /// In-memory store capturing every insert.
    #[derive(Default)]
    struct MemStore {
        messages: Mutex<Vec<MessageRow>>,
        touches: Mutex<Vec<Uuid>>,
        fail_inserts: bool,
    }

    #[async_trait::async_trait]
    impl TurnStore for MemStore {
        async fn insert_message(&self, msg: NewMessage) -> Result<MessageRow> {
            if self.fail_inserts {
                return Err(Error::Database("write refused".into()));
            }
            let row = MessageRow {
                id: Uuid::new_v4(),
                user_id: msg.user_id,
                parent_message_id: msg.parent_message_id,
                conversation_id: msg.conversation_id,
                role: msg.role.as_str().to_owned(),
                content: msg.content,
                payload: msg.payload,
                seq: msg.seq,
                timestamp: msg.timestamp,
            };
            self.messages.lock().push(row.clone());
            Ok(row)
        }

        async fn touch_conversation(&self, id: Uuid, _at: DateTime<Utc>) -> Result<()> {
            self.touches.lock().push(id);
            Ok(())
        }
    }

    fn events(items: Vec<Result<CliEvent>>) -> EventStream {
        Box::pin(futures_util::stream::iter(items))
    }

    fn block(json: serde_json::Value) -> ContentBlock {
        serde_json::from_value(json).unwrap()
    }

    fn ctx() -> TurnContext {
        TurnContext {
            user_id: 7,
            conversation_id: Uuid::new_v4(),
            root_message_id: Uuid::new_v4(),
        }
    }

    async fn collect(
        store: Arc<MemStore>,
        items: Vec<Result<CliEvent>>,
        ctx: TurnContext,
    ) -> Vec<TurnFrame> {
        stream_turn(store, events(items), ctx).collect().await
    }

    #[tokio::test]
    async fn tool_turn_persists_and_frames_in_order() {
        let store = Arc::new(MemStore::default());
        let ctx = ctx();

        let frames = collect(
            store.clone(),
            vec![
                Ok(CliEvent::Assistant(EventMessage {
                    content: vec![block(
                        serde_json::json!({"type": "tool_use", "name": "gmail_list"}),
                    )],
                })),
                Ok(CliEvent::User(EventMessage {
                    content: vec![block(
                        serde_json::json!({"type": "tool_result", "text": "3 emails"}),
                    )],
                })),
                Ok(CliEvent::Result),
            ],
            ctx,
        )
        .await;

        // Two persisted frames plus the terminal result frame.
        assert_eq!(frames.len(), 3);
        let TurnFrame::Persisted(first) = &frames[0] else {
            panic!("expected persisted frame");
        };
        assert_eq!(first.role, Role::ToolUse);
        assert_eq!(first.seq, 1);
        let TurnFrame::Persisted(second) = &frames[1] else {
            panic!("expected persisted frame");
        };
        assert_eq!(second.role, Role::ToolResult);
        assert_eq!(second.seq, 2);
        assert_eq!(second.content["text"], "3 emails");
        assert!(matches!(frames[2], TurnFrame::Result(_)));

        // Every child is parented to the root, in the same conversation.
        let rows = store.messages.lock();
        assert_eq!(rows.len(), 2);
        for row in rows.iter() {
            assert_eq!(row.parent_message_id, Some(ctx.root_message_id));
            assert_eq!(row.conversation_id, ctx.conversation_id);
        }
        // One conversation bump per persisted message.
        assert_eq!(store.touches.lock().len(), 2);
    }

    #[tokio::test]
    async fn text_block_in_user_event_maps_to_assistant() {
        let store = Arc::new(MemStore::default());
        let frames = collect(
            store,
            vec![
                Ok(CliEvent::User(EventMessage {
                    content: vec![block(serde_json::json!({"type": "text", "text": "hi"}))],
                })),
                Ok(CliEvent::Result),
            ],
            ctx(),
        )
        .await;

        let TurnFrame::Persisted(frame) = &frames[0] else {
            panic!("expected persisted frame");
        };
        assert_eq!(frame.role, Role::Assistant);
    }

    #[tokio::test]
    async fn process_failure_with_zero_events_yields_one_error_frame() {
        let store = Arc::new(MemStore::default());
        let frames = collect(
            store.clone(),
            vec![Err(Error::Process { code: 1 })],
            ctx(),
        )
        .await;

        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], TurnFrame::Error(_)));
        assert!(store.messages.lock().is_empty());
    }

    #[tokio::test]
    async fn raw_events_are_invisible_downstream() {
        let store = Arc::new(MemStore::default());
        let frames = collect(
            store.clone(),
            vec![
                Ok(CliEvent::Raw {
                    text: "Loading model...".into(),
                }),
                Ok(CliEvent::Other {
                    kind: "system".into(),
                }),
                Ok(CliEvent::Result),
            ],
            ctx(),
        )
        .await;

        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], TurnFrame::Result(_)));
        assert!(store.messages.lock().is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_aborts_remaining_assembly() {
        let store = Arc::new(MemStore {
            fail_inserts: true,
            ..Default::default()
        });
        let frames = collect(
            store,
            vec![
                Ok(CliEvent::Assistant(EventMessage {
                    content: vec![block(serde_json::json!({"type": "text", "text": "a"}))],
                })),
                Ok(CliEvent::Result),
            ],
            ctx(),
        )
        .await;

        // The error frame is terminal; the result sentinel is never seen.
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], TurnFrame::Error(_)));
    }

    #[tokio::test]
    async fn stream_end_without_sentinel_is_an_error() {
        let store = Arc::new(MemStore::default());
        let frames = collect(store, vec![], ctx()).await;
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], TurnFrame::Error(_)));
    }

    #[tokio::test]
    async fn root_message_round_trips_display_text() {
        let store = Arc::new(MemStore::default());
        let row = persist_root(store.as_ref(), 7, Uuid::new_v4(), "hello")
            .await
            .unwrap();
        assert_eq!(row.role, "user");
        assert_eq!(row.content, "hello");
        assert_eq!(row.seq, 0);
        assert!(row.parent_message_id.is_none());
        assert_eq!(row.payload["type"], "text");
        assert_eq!(row.payload["text"], "hello");
    }
}
