//! Authentication routes for register, login, token refresh, and logout.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
};
use serde_json::json;
use tracing::{error, info};

use crate::AppState;
use fxgate_core::auth::{hash_password, verify_password};
use fxgate_db::UserRepository;
use fxgate_shared::Role;
use fxgate_shared::auth::{
    LoginRequest, LoginResponse, LogoutRequest, RefreshRequest, RegisterRequest, UserInfo,
};

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", delete(logout))
}

/// Minimal email shape check; full RFC validation is not the point here.
fn email_is_valid(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

/// POST /auth/register - Register a new account.
///
/// Registration always grants `[viewer]`; editor is assigned out-of-band.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    if !email_is_valid(&payload.email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_email",
                "message": "A valid email address is required"
            })),
        )
            .into_response();
    }
    if payload.password.len() < 5 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_password",
                "message": "Password must be at least 5 characters long"
            })),
        )
            .into_response();
    }

    let user_repo = UserRepository::new((*state.db).clone());

    match user_repo.email_exists(&payload.email).await {
        Ok(true) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "email_exists",
                    "message": "An account with this email already exists"
                })),
            )
                .into_response();
        }
        Ok(false) => {}
        Err(e) => {
            error!(error = %e, "Database error checking email");
            return internal_error("An error occurred during registration");
        }
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "Failed to hash password");
            return internal_error("An error occurred during registration");
        }
    };

    let user = match user_repo
        .create(&payload.email, &password_hash, vec![Role::Viewer])
        .await
    {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "Failed to create user");
            return internal_error("An error occurred during registration");
        }
    };

    info!(user_id = %user.id, email = %user.email, "New account registered");

    (
        StatusCode::CREATED,
        Json(json!({
            "user": {
                "id": user.id,
                "email": user.email,
                "roles": user.roles.as_slice()
            },
            "message": "Registration successful"
        })),
    )
        .into_response()
}

/// POST /auth/login - Authenticate and return a token pair.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let user_repo = UserRepository::new((*state.db).clone());

    let user = match user_repo.find_by_email(&payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            info!(email = %payload.email, "Login attempt for non-existent account");
            return invalid_credentials();
        }
        Err(e) => {
            error!(error = %e, "Database error during login");
            return internal_error("An error occurred during login");
        }
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            info!(user_id = %user.id, "Failed login attempt - invalid password");
            return invalid_credentials();
        }
        Err(e) => {
            error!(error = %e, "Password verification error");
            return internal_error("An error occurred during login");
        }
    }

    let access_token = match state
        .jwt_service
        .issue_access_token(user.id, user.roles.as_slice())
    {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to issue access token");
            return internal_error("An error occurred during login");
        }
    };

    let refresh_token = match state.jwt_service.issue_refresh_token(user.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to issue refresh token");
            return internal_error("An error occurred during login");
        }
    };

    info!(user_id = %user.id, "Account logged in");

    let response = LoginResponse {
        user: UserInfo {
            id: user.id,
            email: user.email,
            roles: user.roles.0,
        },
        access_token,
        refresh_token,
        expires_in: state.jwt_service.access_token_expires_in(),
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// POST /auth/refresh - Rotate a refresh token into a fresh access token.
///
/// Roles come from the credential store at rotation time, not from the
/// refresh token, so a role change invalidates older capability claims.
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> impl IntoResponse {
    let account_id = match state.jwt_service.verify_refresh_token(&payload.refresh_token) {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "invalid_token",
                    "message": "Invalid refresh token"
                })),
            )
                .into_response();
        }
    };

    let user_repo = UserRepository::new((*state.db).clone());
    let user = match user_repo.find_by_id(account_id).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            // Token is live but the account is gone.
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "invalid_token",
                    "message": "Invalid refresh token"
                })),
            )
                .into_response();
        }
        Err(e) => {
            error!(error = %e, "Database error during token refresh");
            return internal_error("An error occurred during token refresh");
        }
    };

    let access_token = match state
        .jwt_service
        .issue_access_token(user.id, user.roles.as_slice())
    {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to issue access token");
            return internal_error("An error occurred during token refresh");
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "access_token": access_token,
            "expires_in": state.jwt_service.access_token_expires_in()
        })),
    )
        .into_response()
}

/// DELETE /auth/logout - Revoke a refresh token.
async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<LogoutRequest>,
) -> impl IntoResponse {
    match state.jwt_service.revoke_refresh_token(&payload.refresh_token) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_token",
                "message": "Refresh token is not active"
            })),
        )
            .into_response(),
    }
}

fn invalid_credentials() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "invalid_credentials",
            "message": "Invalid email or password"
        })),
    )
        .into_response()
}

fn internal_error(message: &str) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_error",
            "message": message
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(email_is_valid("user@example.com"));
        assert!(!email_is_valid("no-at-sign"));
        assert!(!email_is_valid("@example.com"));
        assert!(!email_is_valid("user@nodot"));
    }
}
