use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::game::GameError;
use crate::persistence::PersistenceError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Persistence(e) => AppError::Persistence(e),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<GameError> for AppError {
    fn from(e: GameError) -> Self {
        match e {
            GameError::NotFound => AppError::NotFound(e.to_string()),
            GameError::Internal(msg) => AppError::Internal(msg),
            GameError::SamePlayer => AppError::BadRequest(e.to_string()),
            GameError::GameFinished
            | GameError::NotParticipant
            | GameError::NotYourTurn
            | GameError::IllegalMove(_) => AppError::Conflict(e.to_string()),
        }
    }
}

impl From<engine::EngineError> for AppError {
    fn from(e: engine::EngineError) -> Self {
        use engine::EngineError;
        match e {
            EngineError::Busy | EngineError::Unavailable | EngineError::Timeout => {
                AppError::Unavailable(e.to_string())
            }
            EngineError::NoLegalMove => AppError::BadRequest(e.to_string()),
            EngineError::Failure(_) | EngineError::InvalidMove(_) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
