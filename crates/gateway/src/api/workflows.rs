//! Workflow endpoints — CRUD plus manual runs.
//!
//! - `GET    /v1/workflows`          — list
//! - `POST   /v1/workflows`          — create (optional schedule)
//! - `GET    /v1/workflows/:id`      — details (with schedule)
//! - `PATCH  /v1/workflows/:id`      — update fields / schedule
//! - `DELETE /v1/workflows/:id`      — soft delete
//! - `POST   /v1/workflows/:id/run`  — run now, blocking until done

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use valet_domain::error::Error;
use valet_storage::{
    NewWorkflow, ScheduleSpec, WorkflowPatch, WorkflowRow, WorkflowScheduleRow,
};

use crate::api::error::ApiResult;
use crate::auth::CurrentUser;
use crate::runtime::workflow::run_workflow;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Shapes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct CreateWorkflowRequest {
    pub name: String,
    pub prompt: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub run_options: Option<serde_json::Value>,
    #[serde(default)]
    pub schedule: Option<ScheduleSpec>,
}

#[derive(Debug, Deserialize)]
pub struct PatchWorkflowRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub run_options: Option<serde_json::Value>,
    #[serde(default)]
    pub schedule: Option<ScheduleSpec>,
}

#[derive(Debug, Serialize)]
pub struct WorkflowDetails {
    #[serde(flatten)]
    pub workflow: WorkflowRow,
    pub schedule: Option<WorkflowScheduleRow>,
}

async fn require_owned(
    state: &AppState,
    user_id: i64,
    workflow_id: Uuid,
) -> Result<WorkflowRow, Error> {
    match state.db.workflows().get_active(workflow_id).await? {
        Some(w) if w.user_id == user_id => Ok(w),
        _ => Err(Error::not_found("workflow")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handlers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<WorkflowRow>>> {
    Ok(Json(state.db.workflows().list_by_user(user.id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateWorkflowRequest>,
) -> ApiResult<Json<WorkflowDetails>> {
    if body.name.trim().is_empty() {
        return Err(Error::Invalid("workflow name must not be empty".into()).into());
    }
    if body.prompt.trim().is_empty() {
        return Err(Error::Invalid("workflow prompt must not be empty".into()).into());
    }

    let workflow = state
        .db
        .workflows()
        .create(NewWorkflow {
            user_id: user.id,
            name: body.name.trim().to_owned(),
            prompt: body.prompt,
            is_active: body.is_active,
            run_options: body.run_options,
        })
        .await?;

    let schedule = match body.schedule {
        Some(spec) => Some(state.db.workflows().upsert_schedule(workflow.id, &spec).await?),
        None => None,
    };

    tracing::info!(workflow_id = %workflow.id, user_id = user.id, "workflow created");
    Ok(Json(WorkflowDetails { workflow, schedule }))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(workflow_id): Path<Uuid>,
) -> ApiResult<Json<WorkflowDetails>> {
    let workflow = require_owned(&state, user.id, workflow_id).await?;
    let schedule = state.db.workflows().get_schedule(workflow.id).await?;
    Ok(Json(WorkflowDetails { workflow, schedule }))
}

pub async fn patch(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(workflow_id): Path<Uuid>,
    Json(body): Json<PatchWorkflowRequest>,
) -> ApiResult<Json<WorkflowDetails>> {
    require_owned(&state, user.id, workflow_id).await?;

    let workflow = state
        .db
        .workflows()
        .patch(
            workflow_id,
            WorkflowPatch {
                name: body.name,
                prompt: body.prompt,
                is_active: body.is_active,
                run_options: body.run_options,
            },
        )
        .await?;

    let schedule = match body.schedule {
        Some(spec) => Some(state.db.workflows().upsert_schedule(workflow.id, &spec).await?),
        None => state.db.workflows().get_schedule(workflow.id).await?,
    };

    Ok(Json(WorkflowDetails { workflow, schedule }))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(workflow_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_owned(&state, user.id, workflow_id).await?;
    state
        .db
        .workflows()
        .soft_delete(workflow_id, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn run(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(workflow_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let workflow = require_owned(&state, user.id, workflow_id).await?;
    let run_id = run_workflow(&state, &workflow).await?;
    Ok(Json(serde_json::json!({ "run_id": run_id, "status": "completed" })))
}
