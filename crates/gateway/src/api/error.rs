//! Domain error → HTTP response mapping, in one place.
//!
//! Ownership mismatches never reach this module as anything but
//! `NotFound` — handlers map "exists but owned by someone else" to the
//! same error as "does not exist" so the API never leaks existence.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use valet_domain::error::Error;

/// Wrapper giving the shared error type an HTTP shape.
pub struct ApiError(pub Error);

impl<E: Into<Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        ApiError(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::Invalid(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Upstream(_) | Error::Hub(_) => StatusCode::BAD_GATEWAY,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Process { .. }
            | Error::Database(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        (status, Json(serde_json::json!({ "error": self.0.to_string() })))
            .into_response()
    }
}

/// Shorthand used by every handler.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: Error) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(status_of(Error::not_found("conversation")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(Error::Auth("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(Error::Invalid("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(Error::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(Error::Hub("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_of(Error::Database("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
