use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::node::StoreError;

/// Errors surfaced to HTTP clients.
///
/// API routes render these as a JSON `{status, message}` envelope;
/// `/files/*` and other non-API routes use [`ServerError::into_plain_response`].
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed or missing parameter, invalid name
    #[error("{0}")]
    BadRequest(String),

    /// Logical path does not resolve
    #[error("{0}")]
    NotFound(String),

    /// Root mutation attempt or backing-store permission denial
    #[error("{0}")]
    Forbidden(String),

    /// Admission gate has not approved this client
    #[error("Authorization required. Approve this connection on the host device, then refresh.")]
    NotAuthorized,

    /// Route exists but not for this method
    #[error("Method not allowed.")]
    MethodNotAllowed,

    /// Backing-store failure or unexpected internal error
    #[error("{0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::NotAuthorized => StatusCode::UNAUTHORIZED,
            ServerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render as `text/plain`, the shape non-API routes answer with.
    pub fn into_plain_response(self) -> Response {
        let status = self.status();
        let body = format!("Error {}: {}", status.as_u16(), self);
        (status, body).into_response()
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PermissionDenied => {
                ServerError::Forbidden("Permission denied.".to_string())
            }
            StoreError::Failed(message) => ServerError::Internal(message),
            StoreError::Io(io_err) => {
                tracing::error!("backing store I/O failure: {io_err}");
                ServerError::Internal("Unexpected I/O failure in backing store.".to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    status: &'static str,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorEnvelope {
            status: "error",
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_http_statuses() {
        let forbidden: ServerError = StoreError::PermissionDenied.into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let failed: ServerError = StoreError::Failed("name collision".to_string()).into();
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let io: ServerError = StoreError::Io(std::io::Error::other("disk gone")).into();
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Raw I/O detail must not reach the client.
        assert!(!io.to_string().contains("disk gone"));
    }

    #[test]
    fn plain_rendering_includes_status_code() {
        let response = ServerError::NotFound("File not found.".to_string()).into_plain_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
