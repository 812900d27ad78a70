//! Authentication handlers.

use actix_web::{HttpResponse, web};

use quire_core::domain::User;
use quire_core::ports::BaseRepository;
use quire_shared::dto::{AuthResponse, LoginRequest, RegisterUserRequest};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::presenter;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

fn token_response(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let token = state.tokens.issue(user)?;
    Ok(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiration_seconds().max(0) as u64,
        user: presenter::user(user),
    })
}

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();

    let mut errors = Vec::new();
    if name.is_empty() {
        errors.push("Name is required".to_string());
    }
    if email.is_empty() || !email.contains('@') {
        errors.push("Invalid email address".to_string());
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = state.passwords.hash(&req.password)?;
    let user = state.users.save(User::new(name, email, password_hash)).await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok(HttpResponse::Created().json(token_response(&state, &user)?))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let email = req.email.trim().to_lowercase();

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !state.passwords.verify(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected");
        return Err(AppError::Unauthorized);
    }

    Ok(HttpResponse::Ok().json(token_response(&state, &user)?))
}

/// GET /api/auth/me - Protected route
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    tracing::debug!(user_id = %identity.user_id, email = %identity.email, "Resolved identity");
    Ok(HttpResponse::Ok().json(presenter::user(&user)))
}
