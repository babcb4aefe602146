//! Workflow execution — one workflow run is a full turn driven to
//! completion with its frames drained instead of streamed.

use std::sync::Arc;

use futures_util::StreamExt;
use uuid::Uuid;

use valet_domain::error::{Error, Result};
use valet_domain::frame::TurnFrame;
use valet_storage::WorkflowRow;

use crate::runtime::turn::{persist_root, stream_turn, TurnContext};
use crate::state::AppState;

/// Run one workflow now: record the run, execute the turn in a fresh
/// conversation, and mark the run completed or failed.
pub async fn run_workflow(state: &AppState, workflow: &WorkflowRow) -> Result<Uuid> {
    let run = state
        .db
        .workflows()
        .create_run(workflow.user_id, workflow.id, &workflow.prompt)
        .await?;

    tracing::info!(
        workflow_id = %workflow.id,
        run_id = %run.id,
        "workflow run started"
    );

    match execute_turn(state, workflow).await {
        Ok(conversation_id) => {
            state
                .db
                .workflows()
                .finish_run(run.id, Some(conversation_id), "completed")
                .await?;
            tracing::info!(run_id = %run.id, conversation_id = %conversation_id, "workflow run completed");
            Ok(run.id)
        }
        Err(e) => {
            tracing::error!(run_id = %run.id, error = %e, "workflow run failed");
            state
                .db
                .workflows()
                .finish_run(run.id, None, "failed")
                .await?;
            Err(e)
        }
    }
}

async fn execute_turn(state: &AppState, workflow: &WorkflowRow) -> Result<Uuid> {
    let prompt = workflow.prompt.trim();
    if prompt.is_empty() {
        return Err(Error::Invalid("workflow prompt is empty".into()));
    }

    let conversation = state
        .db
        .conversations()
        .create(workflow.user_id, "New Conversation", "chat")
        .await?;

    let root = persist_root(&state.db, workflow.user_id, conversation.id, prompt).await?;

    let events = state.agent.stream(prompt);
    let ctx = TurnContext {
        user_id: workflow.user_id,
        conversation_id: conversation.id,
        root_message_id: root.id,
    };

    let frames = stream_turn(Arc::new(state.db.clone()), events, ctx);
    let mut frames = std::pin::pin!(frames);
    while let Some(frame) = frames.next().await {
        if let TurnFrame::Error(err) = frame {
            return Err(Error::Other(err.error));
        }
    }

    Ok(conversation.id)
}
