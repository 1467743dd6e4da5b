use crate::db::StoreError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;

/// Error taxonomy surfaced by the API.
///
/// Authentication failures deliberately carry one uniform message regardless
/// of which internal check failed, so callers cannot probe which emails are
/// registered. Store failures collapse into `Internal` and never leak detail.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid credentials")]
    Authentication,
    #[error("Invalid refresh token")]
    InvalidToken,
    #[error("Refresh token expired or invalid")]
    ExpiredOrInvalidToken,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal server error")]
    Internal,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Authentication | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::ExpiredOrInvalidToken | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            // Lost race on a unique index; user-correctable, not a fault.
            StoreError::Duplicate(_) => ApiError::Conflict(err.to_string()),
            _ => {
                error!(error = %err, "Store operation failed");
                ApiError::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::Authentication.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::ExpiredOrInvalidToken.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("lead".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn authentication_message_is_uniform() {
        // Same text whether the email was unknown or the password wrong.
        assert_eq!(ApiError::Authentication.to_string(), "Invalid credentials");
    }
}
