use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fieldctl_core::{InputError, TlmError};
use serde::Serialize;
use thiserror::Error;

/// An HTTP-facing failure. Rendered as `{"error": "<status>", "message": ...}`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PRECONDITION_FAILED, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.status.as_str().to_owned(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<TlmError> for AppError {
    fn from(err: TlmError) -> Self {
        let status = match &err {
            TlmError::NoMapping { .. } => StatusCode::NOT_FOUND,
            TlmError::NothingStaged | TlmError::LocationOccupied { .. } => StatusCode::CONFLICT,
            TlmError::Reconcile(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        let status = match &err {
            InputError::Unbound { .. } => StatusCode::NOT_FOUND,
            InputError::NoState { .. } => StatusCode::CONFLICT,
        };
        Self::new(status, err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status.as_str(), self.message)
    }
}

impl std::error::Error for AppError {}

/// Failures running the server itself.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
