//! Conversation rows and repository.
//!
//! Soft deletion: every read filters `deleted_date IS NULL`, so a
//! deleted conversation is indistinguishable from an absent one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use valet_domain::error::Result;

use crate::db_err;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ConversationRow {
    pub id: Uuid,
    pub user_id: i64,
    pub title: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub is_pinned: bool,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_date: Option<DateTime<Utc>>,
}

/// Patchable fields; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ConversationPatch {
    pub title: Option<String>,
    pub kind: Option<String>,
    pub is_pinned: Option<bool>,
}

pub struct ConversationRepo<'a> {
    pub(crate) pool: &'a PgPool,
}

impl ConversationRepo<'_> {
    pub async fn create(&self, user_id: i64, title: &str, kind: &str) -> Result<ConversationRow> {
        sqlx::query_as::<_, ConversationRow>(
            r#"
            INSERT INTO conversations (id, user_id, title, type)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(kind)
        .fetch_one(self.pool)
        .await
        .map_err(db_err)
    }

    /// Fetch a live (non-deleted) conversation by id.
    pub async fn get_active(&self, id: Uuid) -> Result<Option<ConversationRow>> {
        sqlx::query_as::<_, ConversationRow>(
            "SELECT * FROM conversations WHERE id = $1 AND deleted_date IS NULL",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn list_by_user(
        &self,
        user_id: i64,
        kind: Option<&str>,
    ) -> Result<Vec<ConversationRow>> {
        match kind {
            Some(kind) => {
                sqlx::query_as::<_, ConversationRow>(
                    r#"
                    SELECT * FROM conversations
                    WHERE user_id = $1 AND deleted_date IS NULL AND type = $2
                    ORDER BY updated_date DESC
                    "#,
                )
                .bind(user_id)
                .bind(kind)
                .fetch_all(self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, ConversationRow>(
                    r#"
                    SELECT * FROM conversations
                    WHERE user_id = $1 AND deleted_date IS NULL
                    ORDER BY updated_date DESC
                    "#,
                )
                .bind(user_id)
                .fetch_all(self.pool)
                .await
            }
        }
        .map_err(db_err)
    }

    /// Bump `updated_date` (called once per persisted message).
    pub async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE conversations SET updated_date = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    pub async fn patch(&self, id: Uuid, patch: ConversationPatch) -> Result<ConversationRow> {
        sqlx::query_as::<_, ConversationRow>(
            r#"
            UPDATE conversations
            SET title = COALESCE($2, title),
                type = COALESCE($3, type),
                is_pinned = COALESCE($4, is_pinned),
                updated_date = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.kind)
        .bind(patch.is_pinned)
        .fetch_one(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE conversations SET deleted_date = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
