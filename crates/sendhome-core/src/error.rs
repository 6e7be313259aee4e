//! Error types surfaced to callers of the game service.

use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Caller-visible failures. Collaborator failures never appear here; they are
/// absorbed into fallback content before reaching this layer.
#[derive(Error, Debug)]
pub enum GameError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// Stable machine-readable code for wire formats.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::NotFound(_) => "not_found",
            GameError::ResourceExhausted(_) => "resource_exhausted",
            GameError::InvalidArgument(_) => "invalid_argument",
            GameError::FailedPrecondition(_) => "failed_precondition",
            GameError::Cancelled(_) => "cancelled",
            GameError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => GameError::NotFound(format!("session not found: {}", id)),
            StoreError::QuotaExhausted => {
                GameError::ResourceExhausted("no secondary checks remaining".to_string())
            }
            StoreError::SessionComplete => {
                GameError::FailedPrecondition("no more cases in this session".to_string())
            }
            StoreError::NotCurrentCase { expected, given } => GameError::FailedPrecondition(
                format!("case {} is not the current case ({})", given, expected),
            ),
            other => GameError::Internal(other.to_string()),
        }
    }
}
