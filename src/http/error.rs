//! HTTP error responses
//!
//! Every error renders as `{"detail": "<message>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::interaction::InteractionError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// The counter store is temporarily unreachable
    #[error("{0}")]
    Unavailable(String),

    /// Anything the caller cannot fix; the message is logged, not returned
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Internal(_) => "Internal Error".to_string(),
            Self::Unavailable(_) => "Service Unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<InteractionError> for ApiError {
    fn from(err: InteractionError) -> Self {
        match err {
            InteractionError::AppNotFound(_) => ApiError::NotFound(err.to_string()),
            InteractionError::Store(ref store) if store.is_transient() => {
                ApiError::Unavailable(err.to_string())
            }
            err if err.is_user_error() => ApiError::BadRequest(err.to_string()),
            // Store contract and key codec errors mean the façade passed bad input
            err => ApiError::Internal(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = ErrorResponse {
            detail: self.detail(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsdb::StoreError;

    #[test]
    fn test_user_errors_are_bad_requests() {
        let err = ApiError::from(InteractionError::InvalidTsdbField);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.detail(),
            "The tsdbField must be one of: sentry_app_viewed, sentry_app_component_interacted"
        );
    }

    #[test]
    fn test_store_errors_map_to_5xx() {
        let err = ApiError::from(InteractionError::Store(StoreError::EmptyKeySet));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail(), "Internal Error");

        // The façade caps ranges first, so an oversized read reaching the store is a bug
        let err = ApiError::from(InteractionError::Store(StoreError::RangeTooLarge {
            points: 20_000,
            max: 10_000,
        }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ApiError::from(InteractionError::Store(StoreError::Unavailable(
            "timeout".to_string(),
        )));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_missing_app_is_not_found() {
        let err = ApiError::from(InteractionError::AppNotFound("ghost".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.detail(), "sentry app 'ghost' does not exist");
    }
}
