//! User rows and repository.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPool;

use valet_domain::error::Result;

use crate::db_err;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub name: String,
    pub company: Option<String>,
    #[serde(skip_serializing)]
    pub server_host: Option<String>,
    #[serde(skip_serializing)]
    pub hub_entity_id: Option<String>,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub name: String,
    pub company: Option<String>,
}

pub struct UserRepo<'a> {
    pub(crate) pool: &'a PgPool,
}

impl UserRepo<'_> {
    pub async fn create(&self, user: NewUser) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (email, password_hash, name, company)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.company)
        .fetch_one(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn set_hub_entity_id(&self, id: i64, entity_id: &str) -> Result<()> {
        sqlx::query("UPDATE users SET hub_entity_id = $2 WHERE id = $1")
            .bind(id)
            .bind(entity_id)
            .execute(self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
