use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Failures of the community engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input, rejected before any write.
    #[error("validation error: {0}")]
    Validation(String),

    /// The addressed entity does not exist (or is not visible to the caller).
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// The requested transition no longer applies. Refresh rather than retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller lacks the role the operation requires.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A notification could not be written. Never escapes a primary operation.
    #[error("dispatch failed: {0:#}")]
    Dispatch(anyhow::Error),

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        Self::NotFound(what, id.to_string())
    }

    pub fn dispatch(err: impl Into<anyhow::Error>) -> Self {
        Self::Dispatch(err.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(..) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Dispatch(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

/// The engine-wide result type.
pub type Result<T> = std::result::Result<T, EngineError>;

/// `axum`-compatible error handler.
#[derive(Error)]
pub struct Error {
    status: StatusCode,
    err: anyhow::Error,
}

impl Error {
    pub fn with_status(status: StatusCode, err: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            err: err.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            err,
        }
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        Self::with_status(err.status(), err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?}", self.status, self.err)
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.err.fmt(f)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{:?}", self.err);
        }

        // N.B: Forward out the error message to the requester if this is a debug build.
        // This is insecure for production builds, so we'll return an empty body if this
        // is a release build.
        let body = if cfg!(debug_assertions) {
            Body::new(format!("{:?}", self.err))
        } else {
            Body::empty()
        };

        (self.status, body).into_response()
    }
}
