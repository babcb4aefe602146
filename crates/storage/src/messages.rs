//! Message rows and repository.
//!
//! Messages are an append-only log: created once per streamed content
//! block, never mutated, never deleted. A turn is the tree rooted at a
//! `user` message; descendants carry `parent_message_id` = the root id
//! and a per-turn `seq` so ordering never depends on wall-clock ties.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use valet_domain::error::Result;
use valet_domain::event::Role;

use crate::db_err;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub user_id: i64,
    pub parent_message_id: Option<Uuid>,
    pub conversation_id: Uuid,
    pub role: String,
    pub content: String,
    pub payload: serde_json::Value,
    pub seq: i32,
    pub timestamp: DateTime<Utc>,
}

impl MessageRow {
    pub fn role(&self) -> Result<Role> {
        self.role.parse()
    }
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub user_id: i64,
    pub parent_message_id: Option<Uuid>,
    pub conversation_id: Uuid,
    pub role: Role,
    pub content: String,
    pub payload: serde_json::Value,
    pub seq: i32,
    pub timestamp: DateTime<Utc>,
}

pub struct MessageRepo<'a> {
    pub(crate) pool: &'a PgPool,
}

impl MessageRepo<'_> {
    pub async fn create(&self, msg: NewMessage) -> Result<MessageRow> {
        sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages
                (id, user_id, parent_message_id, conversation_id, role, content, payload, seq, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(msg.user_id)
        .bind(msg.parent_message_id)
        .bind(msg.conversation_id)
        .bind(msg.role.as_str())
        .bind(&msg.content)
        .bind(&msg.payload)
        .bind(msg.seq)
        .bind(msg.timestamp)
        .fetch_one(self.pool)
        .await
        .map_err(db_err)
    }

    /// Newest-first page of turn roots; `cursor` (exclusive) pages older.
    pub async fn root_user_messages(
        &self,
        user_id: i64,
        conversation_id: Uuid,
        limit: i64,
        cursor: Option<DateTime<Utc>>,
    ) -> Result<Vec<MessageRow>> {
        match cursor {
            Some(cursor) => {
                sqlx::query_as::<_, MessageRow>(
                    r#"
                    SELECT * FROM messages
                    WHERE user_id = $1 AND conversation_id = $2 AND role = 'user'
                      AND timestamp < $3
                    ORDER BY timestamp DESC
                    LIMIT $4
                    "#,
                )
                .bind(user_id)
                .bind(conversation_id)
                .bind(cursor)
                .bind(limit)
                .fetch_all(self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, MessageRow>(
                    r#"
                    SELECT * FROM messages
                    WHERE user_id = $1 AND conversation_id = $2 AND role = 'user'
                    ORDER BY timestamp DESC
                    LIMIT $3
                    "#,
                )
                .bind(user_id)
                .bind(conversation_id)
                .bind(limit)
                .fetch_all(self.pool)
                .await
            }
        }
        .map_err(db_err)
    }

    /// All descendants of the given roots, in emission order.
    pub async fn children_for_roots(&self, root_ids: &[Uuid]) -> Result<Vec<MessageRow>> {
        sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT * FROM messages
            WHERE parent_message_id = ANY($1)
            ORDER BY timestamp ASC, seq ASC
            "#,
        )
        .bind(root_ids.to_vec())
        .fetch_all(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn has_older(
        &self,
        user_id: i64,
        conversation_id: Uuid,
        before: DateTime<Utc>,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE user_id = $1 AND conversation_id = $2 AND role = 'user'
              AND timestamp < $3
            "#,
        )
        .bind(user_id)
        .bind(conversation_id)
        .bind(before)
        .fetch_one(self.pool)
        .await
        .map_err(db_err)?;
        Ok(count > 0)
    }
}
