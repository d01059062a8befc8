use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use santa_engine::EngineError;
use santa_types::api::ErrorBody;

/// Error returned by every handler. Each condition maps to its own status
/// and machine-readable code; infrastructure details stay in the logs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Engine(e) => match e {
                EngineError::Forbidden => StatusCode::FORBIDDEN,
                EngineError::NotFound => StatusCode::NOT_FOUND,
                EngineError::NoParticipants
                | EngineError::InsufficientParticipants
                | EngineError::NotGenerated => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::AlreadyLocked | EngineError::NotLocked => StatusCode::CONFLICT,
                EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Engine(EngineError::Storage(_)) | Self::Internal(_) => "internal",
            Self::Engine(e) => e.code(),
            Self::Unauthorized => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::Conflict(_) => "conflict",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            match &self {
                Self::Internal(e) => error!("Request failed: {:#}", e),
                other => error!("Request failed: {}", other),
            }
            "internal error".to_string()
        } else {
            warn!("Request rejected ({}): {}", status, self);
            self.to_string()
        };

        (
            status,
            Json(ErrorBody {
                error: self.code().to_string(),
                message,
            }),
        )
            .into_response()
    }
}

/// Run blocking DB work off the async runtime.
pub async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
    })?
}
