use axum::{
    Json,
    extract::{
        FromRequestParts, Path,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use crate::{dto::ErrorResponse, grammar::GrammarError, service::NoteError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Note not found with id: {0}")]
    NotFound(i64),

    #[error("File size exceeds maximum allowed size ({limit} bytes)")]
    PayloadTooLarge { limit: usize },

    #[error("{0}")]
    BodyTooLarge(String),

    #[error("Error checking grammar: {0}")]
    Engine(#[from] GrammarError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge { .. } | Self::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Engine(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body-limit failures while streaming a multipart body become 413.
    pub fn from_multipart(err: &MultipartError, limit: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge { limit }
        } else {
            Self::Validation(err.body_text())
        }
    }
}

impl From<NoteError> for ApiError {
    fn from(err: NoteError) -> Self {
        match err {
            NoteError::Validation(msg) => Self::Validation(msg),
            NoteError::NotFound(id) => Self::NotFound(id),
            NoteError::Storage(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::BodyTooLarge(rejection.body_text())
        } else {
            Self::Validation(rejection.body_text())
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the log.
        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!("request failed: {}", detail);
                "Internal server error".to_string()
            }
            Self::Engine(e) => {
                tracing::error!("grammar check failed: {}", e);
                self.to_string()
            }
            _ => {
                tracing::debug!("request rejected: {}", self);
                self.to_string()
            }
        };

        let body = ErrorResponse {
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Note id taken from the path, rejecting non-numeric ids as validation errors.
pub struct NoteId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for NoteId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;

        Ok(Self(id))
    }
}
