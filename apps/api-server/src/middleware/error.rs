//! Error handling middleware - RFC 7807 compliant responses.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use quire_core::DomainError;
use quire_core::ports::AuthError;
use quire_shared::ErrorResponse;
use std::fmt;

/// Application-level error type that converts to RFC 7807 responses.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Unauthorized,
    Forbidden(String),
    Conflict(String),
    Internal(String),
    Validation(Vec<String>),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::Validation(errors) => write!(f, "Validation errors: {:?}", errors),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail),
            AppError::Unauthorized => ErrorResponse::unauthorized(),
            AppError::Forbidden(detail) => ErrorResponse::forbidden(detail),
            AppError::Conflict(detail) => ErrorResponse::conflict(detail),
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                ErrorResponse::internal_error()
            }
            AppError::Validation(errors) => ErrorResponse::unprocessable(errors.join(", ")),
        };

        HttpResponse::build(self.status_code()).json(error)
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, key } => {
                AppError::NotFound(format!("{entity_type} {key} not found"))
            }
            DomainError::Validation(msg) => AppError::Validation(vec![msg]),
            DomainError::Unauthenticated => AppError::Unauthorized,
            DomainError::Unauthorized(msg) => AppError::Forbidden(msg),
            DomainError::Consistency(msg) | DomainError::Duplicate(msg) => AppError::Conflict(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<quire_core::error::RepoError> for AppError {
    fn from(err: quire_core::error::RepoError) -> Self {
        DomainError::from(err).into()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::InvalidToken(_)
            | AuthError::MissingAuth => AppError::Unauthorized,
            AuthError::HashingError(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_statuses() {
        let cases = [
            (DomainError::Validation("short".into()), 422),
            (DomainError::Unauthorized("not yours".into()), 403),
            (DomainError::Unauthenticated, 401),
            (DomainError::not_found("post", "missing"), 404),
            (DomainError::Consistency("wrong post".into()), 409),
            (DomainError::Duplicate("email".into()), 409),
            (DomainError::Internal("boom".into()), 500),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code().as_u16(), status);
        }
    }
}
