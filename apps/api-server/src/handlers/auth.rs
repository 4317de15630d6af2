//! Authentication handlers.

use actix_web::{HttpResponse, web};
use std::sync::Arc;

use quill_core::domain::User;
use quill_core::ports::{PasswordService, TokenService};
use quill_shared::dto::{AuthResponse, LoginRequest, RegisterUserRequest, UserResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

fn token_response(
    token_service: &dyn TokenService,
    user: &User,
) -> AppResult<AuthResponse> {
    let token = token_service
        .generate_token(user.id, &user.email)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: token_service.expiration_seconds().max(0) as u64,
    })
}

/// POST /auth/register
pub async fn register(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.email.is_empty() || !req.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if state.users.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = password_service
        .hash(&req.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let user = User::new(req.email, password_hash, state.clock.now());
    let saved = state.users.save(user).await?;
    tracing::info!(user_id = %saved.id, "User registered");

    Ok(HttpResponse::Created().json(token_response(token_service.get_ref().as_ref(), &saved)?))
}

/// POST /auth/login
pub async fn login(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let valid = password_service
        .verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        return Err(AppError::Unauthorized);
    }

    Ok(HttpResponse::Ok().json(token_response(token_service.get_ref().as_ref(), &user)?))
}

/// GET /auth/me
pub async fn me(identity: Identity) -> HttpResponse {
    HttpResponse::Ok().json(UserResponse {
        id: identity.user_id,
        email: identity.email,
    })
}
