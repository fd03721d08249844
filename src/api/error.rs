use crate::errors::{DispatchError, PushError, RetrievalError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Every failure a handler can return, rendered as `{"success":false,"error":...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Internal(String),
}

impl From<PushError> for ApiError {
    fn from(e: PushError) -> Self {
        match e {
            PushError::MissingWebhookKey => {
                Self::Internal(PushError::MissingWebhookKey.to_string())
            }
            PushError::Retrieval(e) => Self::Retrieval(e),
            PushError::Dispatch(e) => Self::Dispatch(e),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Retrieval(_) | Self::Dispatch(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }

        let body = json!({ "success": false, "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
