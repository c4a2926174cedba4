//! JSON error responses for bracket failures.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ffl_bracket::bracket::{BracketError, ErrorKind};
use serde::{Deserialize, Serialize};

/// Error body returned by every bracket endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Whether repeating the same request later may succeed
    pub retryable: bool,
}

/// Bracket error on its way to an HTTP response
#[derive(Debug)]
pub struct ApiError(pub BracketError);

impl From<BracketError> for ApiError {
    fn from(err: BracketError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// HTTP status for the wrapped error
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Precondition | ErrorKind::NotReady => StatusCode::CONFLICT,
            ErrorKind::Data => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Invariant => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Storage => match self.0 {
                BracketError::VersionConflict { .. } => StatusCode::CONFLICT,
                BracketError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.0.client_message(),
            retryable: self.0.is_retryable(),
        };
        (self.status(), Json(body)).into_response()
    }
}
