//! Authentication extractors.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use std::future::{Ready, ready};
use uuid::Uuid;

use quire_core::ports::{AuthError, TokenClaims};
use quire_shared::ErrorResponse;

use crate::state::AppState;

/// Authenticated user identity extractor.
///
/// Use this in handlers to require authentication:
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            name: claims.name,
            email: claims.email,
        }
    }
}

/// Error type for authentication failures.
#[derive(Debug)]
pub struct AuthenticationError(pub AuthError);

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl actix_web::ResponseError for AuthenticationError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        match &self.0 {
            AuthError::TokenExpired
            | AuthError::InvalidToken(_)
            | AuthError::MissingAuth
            | AuthError::InvalidCredentials => actix_web::http::StatusCode::UNAUTHORIZED,
            AuthError::HashingError(_) => actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        let error = match &self.0 {
            AuthError::TokenExpired => ErrorResponse::new(401, "Token Expired")
                .with_detail("Your authentication token has expired. Please login again."),
            AuthError::InvalidToken(msg) => {
                ErrorResponse::new(401, "Invalid Token").with_detail(msg.clone())
            }
            AuthError::MissingAuth => ErrorResponse::new(401, "Authentication Required")
                .with_detail("Please provide a valid Bearer token in the Authorization header."),
            AuthError::InvalidCredentials => ErrorResponse::unauthorized(),
            AuthError::HashingError(_) => ErrorResponse::internal_error(),
        };

        actix_web::HttpResponse::build(self.status_code()).json(error)
    }
}

fn authenticate(req: &HttpRequest) -> Result<Identity, AuthenticationError> {
    let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
        tracing::error!("AppState not found in app data");
        AuthenticationError(AuthError::InvalidToken(
            "Server configuration error".to_string(),
        ))
    })?;

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthenticationError(AuthError::MissingAuth))?;

    let auth_str = auth_header.to_str().map_err(|_| {
        AuthenticationError(AuthError::InvalidToken(
            "Invalid authorization header".to_string(),
        ))
    })?;

    let token = auth_str.strip_prefix("Bearer ").ok_or_else(|| {
        AuthenticationError(AuthError::InvalidToken(
            "Expected Bearer token".to_string(),
        ))
    })?;

    state
        .tokens
        .validate(token)
        .map(Identity::from)
        .map_err(AuthenticationError)
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|identity| identity.user_id)
    }
}

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalIdentity(authenticate(req).ok())))
    }
}
