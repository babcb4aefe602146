//! Integration catalog and per-user connection rows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use valet_domain::error::Result;

use crate::db_err;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct IntegrationRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserIntegrationRow {
    pub id: Uuid,
    pub user_id: i64,
    pub integration_id: Uuid,
    pub status: String,
    pub connected_account_id: Option<String>,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

pub struct IntegrationRepo<'a> {
    pub(crate) pool: &'a PgPool,
}

impl IntegrationRepo<'_> {
    pub async fn all(&self) -> Result<Vec<IntegrationRow>> {
        sqlx::query_as::<_, IntegrationRow>("SELECT * FROM integrations ORDER BY name")
            .fetch_all(self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<IntegrationRow>> {
        sqlx::query_as::<_, IntegrationRow>("SELECT * FROM integrations WHERE slug = $1")
            .bind(slug)
            .fetch_optional(self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn user_integrations(&self, user_id: i64) -> Result<Vec<UserIntegrationRow>> {
        sqlx::query_as::<_, UserIntegrationRow>(
            "SELECT * FROM user_integrations WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn get_user_integration(
        &self,
        user_id: i64,
        integration_id: Uuid,
    ) -> Result<Option<UserIntegrationRow>> {
        sqlx::query_as::<_, UserIntegrationRow>(
            "SELECT * FROM user_integrations WHERE user_id = $1 AND integration_id = $2",
        )
        .bind(user_id)
        .bind(integration_id)
        .fetch_optional(self.pool)
        .await
        .map_err(db_err)
    }

    /// Update status by hub connected-account id (OAuth callback path,
    /// where no authenticated user is available).
    pub async fn set_status_by_account(
        &self,
        connected_account_id: &str,
        status: &str,
    ) -> Result<Option<UserIntegrationRow>> {
        sqlx::query_as::<_, UserIntegrationRow>(
            r#"
            UPDATE user_integrations
            SET status = $2, updated_date = now()
            WHERE connected_account_id = $1
            RETURNING *
            "#,
        )
        .bind(connected_account_id)
        .bind(status)
        .fetch_optional(self.pool)
        .await
        .map_err(db_err)
    }

    /// Create or update the (user, integration) connection record.
    pub async fn upsert_user_integration(
        &self,
        user_id: i64,
        integration_id: Uuid,
        status: &str,
        connected_account_id: Option<&str>,
    ) -> Result<UserIntegrationRow> {
        sqlx::query_as::<_, UserIntegrationRow>(
            r#"
            INSERT INTO user_integrations (id, user_id, integration_id, status, connected_account_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, integration_id) DO UPDATE
            SET status = EXCLUDED.status,
                connected_account_id = COALESCE(EXCLUDED.connected_account_id,
                                                user_integrations.connected_account_id),
                updated_date = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(integration_id)
        .bind(status)
        .bind(connected_account_id)
        .fetch_one(self.pool)
        .await
        .map_err(db_err)
    }
}
