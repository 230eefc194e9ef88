use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure modes of the persistence gateway. Validation never reaches the
/// gateway; wrong-length keys are rejected by the intake machine first.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("key already registered")]
    Conflict,

    #[error("record not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl From<rusqlite::Error> for GatewayError {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
            GatewayError::Conflict
        } else {
            GatewayError::Storage(err.to_string())
        }
    }
}
