use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use deed_core::DeedError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0} already exists")]
    AlreadyExists(&'static str),
    #[error("concurrent update, retry the operation")]
    Conflict,
    #[error(transparent)]
    Core(#[from] DeedError),
}

/// Failure to load the on-disk snapshot at startup.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("could not read snapshot: {0}")]
    Read(#[from] std::io::Error),
    #[error("snapshot is not valid: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::AlreadyExists(_) | ServiceError::Conflict => StatusCode::CONFLICT,
            ServiceError::Core(DeedError::Forbidden) => StatusCode::FORBIDDEN,
            ServiceError::Core(DeedError::InvalidState { .. }) => StatusCode::CONFLICT,
            ServiceError::Core(DeedError::InsufficientMembers { .. }) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
