//! `valet-storage` — Postgres persistence for the Valet backend.
//!
//! One [`Database`] handle wraps the connection pool; per-table
//! repositories hang off it (`db.users()`, `db.conversations()`, ...).
//! Queries are plain runtime `sqlx` queries — single-row reads and
//! writes, no multi-step transactional API.

pub mod conversations;
pub mod integrations;
pub mod messages;
pub mod users;
pub mod workflows;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use valet_domain::config::DatabaseConfig;
use valet_domain::error::{Error, Result};

pub use conversations::{ConversationPatch, ConversationRepo, ConversationRow};
pub use integrations::{IntegrationRepo, IntegrationRow, UserIntegrationRow};
pub use messages::{MessageRepo, MessageRow, NewMessage};
pub use users::{NewUser, UserRepo, UserRow};
pub use workflows::{
    NewWorkflow, ScheduleSpec, WorkflowPatch, WorkflowRepo, WorkflowRow, WorkflowRunRow,
    WorkflowScheduleRow,
};

/// Map a sqlx error into the shared domain error.
pub(crate) fn db_err(e: sqlx::Error) -> Error {
    Error::Database(e.to_string())
}

/// Shared database handle.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect using the resolved URL from `config` and optionally run
    /// the embedded migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config.resolve_url().ok_or_else(|| {
            Error::Config(format!(
                "no database URL: set {} or database.url",
                config.url_env
            ))
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
            .connect(&url)
            .await
            .map_err(db_err)?;

        let db = Self { pool };
        if config.migrate_on_start {
            db.migrate().await?;
        }
        Ok(db)
    }

    /// Run the embedded migrations to the latest version.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn users(&self) -> UserRepo<'_> {
        UserRepo { pool: &self.pool }
    }

    pub fn conversations(&self) -> ConversationRepo<'_> {
        ConversationRepo { pool: &self.pool }
    }

    pub fn messages(&self) -> MessageRepo<'_> {
        MessageRepo { pool: &self.pool }
    }

    pub fn workflows(&self) -> WorkflowRepo<'_> {
        WorkflowRepo { pool: &self.pool }
    }

    pub fn integrations(&self) -> IntegrationRepo<'_> {
        IntegrationRepo { pool: &self.pool }
    }
}
