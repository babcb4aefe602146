//! Workflow, schedule, and run rows with their repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use valet_domain::error::Result;

use crate::db_err;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WorkflowRow {
    pub id: Uuid,
    pub user_id: i64,
    pub name: String,
    pub prompt: String,
    pub is_active: bool,
    pub run_options: Option<serde_json::Value>,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_date: Option<DateTime<Utc>>,
}

/// Fixed-cadence schedule attached to a workflow.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WorkflowScheduleRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub repeat_every: String,
    pub week_day: Option<i32>,
    pub hour: Option<i32>,
    pub minute: Option<i32>,
    pub meridiem: Option<String>,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WorkflowRunRow {
    pub id: Uuid,
    pub user_id: i64,
    pub workflow_id: Uuid,
    pub prompt: String,
    pub conversation_id: Option<Uuid>,
    pub status: String,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWorkflow {
    pub user_id: i64,
    pub name: String,
    pub prompt: String,
    pub is_active: bool,
    pub run_options: Option<serde_json::Value>,
}

/// Schedule shape accepted on workflow create/patch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSpec {
    /// `hour` | `day` | `week`
    pub repeat_every: String,
    /// ISO weekday 1–7, for weekly schedules.
    #[serde(default)]
    pub week_day: Option<i32>,
    #[serde(default)]
    pub hour: Option<i32>,
    #[serde(default)]
    pub minute: Option<i32>,
    /// `AM` / `PM`, for 12-hour clock input.
    #[serde(default)]
    pub meridiem: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowPatch {
    pub name: Option<String>,
    pub prompt: Option<String>,
    pub is_active: Option<bool>,
    pub run_options: Option<serde_json::Value>,
}

pub struct WorkflowRepo<'a> {
    pub(crate) pool: &'a PgPool,
}

impl WorkflowRepo<'_> {
    pub async fn create(&self, wf: NewWorkflow) -> Result<WorkflowRow> {
        sqlx::query_as::<_, WorkflowRow>(
            r#"
            INSERT INTO workflows (id, user_id, name, prompt, is_active, run_options)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(wf.user_id)
        .bind(&wf.name)
        .bind(&wf.prompt)
        .bind(wf.is_active)
        .bind(&wf.run_options)
        .fetch_one(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn get_active(&self, id: Uuid) -> Result<Option<WorkflowRow>> {
        sqlx::query_as::<_, WorkflowRow>(
            "SELECT * FROM workflows WHERE id = $1 AND deleted_date IS NULL",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<WorkflowRow>> {
        sqlx::query_as::<_, WorkflowRow>(
            r#"
            SELECT * FROM workflows
            WHERE user_id = $1 AND deleted_date IS NULL
            ORDER BY created_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn patch(&self, id: Uuid, patch: WorkflowPatch) -> Result<WorkflowRow> {
        sqlx::query_as::<_, WorkflowRow>(
            r#"
            UPDATE workflows
            SET name = COALESCE($2, name),
                prompt = COALESCE($3, prompt),
                is_active = COALESCE($4, is_active),
                run_options = COALESCE($5, run_options),
                updated_date = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.prompt)
        .bind(patch.is_active)
        .bind(patch.run_options)
        .fetch_one(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE workflows SET deleted_date = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ── schedules ────────────────────────────────────────────────────

    pub async fn upsert_schedule(
        &self,
        workflow_id: Uuid,
        spec: &ScheduleSpec,
    ) -> Result<WorkflowScheduleRow> {
        sqlx::query_as::<_, WorkflowScheduleRow>(
            r#"
            INSERT INTO workflow_schedules
                (id, workflow_id, repeat_every, week_day, hour, minute, meridiem)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (workflow_id) DO UPDATE
            SET repeat_every = EXCLUDED.repeat_every,
                week_day = EXCLUDED.week_day,
                hour = EXCLUDED.hour,
                minute = EXCLUDED.minute,
                meridiem = EXCLUDED.meridiem,
                updated_date = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workflow_id)
        .bind(&spec.repeat_every)
        .bind(spec.week_day)
        .bind(spec.hour)
        .bind(spec.minute)
        .bind(&spec.meridiem)
        .fetch_one(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn get_schedule(&self, workflow_id: Uuid) -> Result<Option<WorkflowScheduleRow>> {
        sqlx::query_as::<_, WorkflowScheduleRow>(
            "SELECT * FROM workflow_schedules WHERE workflow_id = $1",
        )
        .bind(workflow_id)
        .fetch_optional(self.pool)
        .await
        .map_err(db_err)
    }

    /// Schedules of every active, non-deleted workflow — the scheduler's
    /// per-tick working set.
    pub async fn active_schedules(&self) -> Result<Vec<WorkflowScheduleRow>> {
        sqlx::query_as::<_, WorkflowScheduleRow>(
            r#"
            SELECT s.* FROM workflow_schedules s
            JOIN workflows w ON w.id = s.workflow_id
            WHERE w.is_active AND w.deleted_date IS NULL
            "#,
        )
        .fetch_all(self.pool)
        .await
        .map_err(db_err)
    }

    // ── runs ─────────────────────────────────────────────────────────

    pub async fn create_run(
        &self,
        user_id: i64,
        workflow_id: Uuid,
        prompt: &str,
    ) -> Result<WorkflowRunRow> {
        sqlx::query_as::<_, WorkflowRunRow>(
            r#"
            INSERT INTO workflow_runs (id, user_id, workflow_id, prompt)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(workflow_id)
        .bind(prompt)
        .fetch_one(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn finish_run(
        &self,
        run_id: Uuid,
        conversation_id: Option<Uuid>,
        status: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE workflow_runs
            SET conversation_id = $2, status = $3, updated_date = now()
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .bind(conversation_id)
        .bind(status)
        .execute(self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
