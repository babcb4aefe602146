/// Shared error type used across all Valet crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("auth: {0}")]
    Auth(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("agent process exited with code {code}")]
    Process { code: i32 },

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("upstream: {0}")]
    Upstream(String),

    #[error("hub: {0}")]
    Hub(String),

    #[error("database: {0}")]
    Database(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str) -> Self {
        Error::NotFound { entity }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
