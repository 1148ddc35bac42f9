// Admin session handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    auth::{
        password::{hash_password_async, needs_rehash, verify_password_async},
        BUILTIN_ADMIN_ID,
    },
    error::ApiError,
    handlers::ValidJson,
    middleware::AuthenticatedAdmin,
    models::{self, AdminUserPatch, AdminUserResponse},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AdminUserResponse,
}

/// Exchange admin credentials for a bearer token
/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = request.username.unwrap_or_default().trim().to_string();
    let password = request.password.unwrap_or_default();
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }

    info!("Admin login attempt for: {}", username);

    let user = if state.auth.is_builtin_admin(&username, &password) {
        state.auth.builtin_admin()
    } else {
        authenticate_stored_admin(&state, &username, &password).await?
    };

    let now = models::now();
    let token = state
        .auth
        .issue_token(&user, now)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;

    info!("Admin {} logged in", user.username);
    Ok((StatusCode::OK, Json(LoginResponse { token, user })))
}

async fn authenticate_stored_admin(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<AdminUserResponse, ApiError> {
    let invalid = || ApiError::unauthorized("Invalid username or password");

    let Some(user) = state.store.find_admin_user(username).await? else {
        return Err(invalid());
    };
    if !user.is_active {
        warn!("Login rejected for inactive admin: {}", username);
        return Err(invalid());
    }
    let Some(hash) = user.password_hash.clone() else {
        return Err(invalid());
    };

    let verified = match verify_password_async(password.to_string(), hash.clone()).await {
        Ok(verified) => verified,
        Err(e) => {
            warn!("Stored password hash for {} is unusable: {:#}", username, e);
            false
        }
    };
    if !verified {
        return Err(invalid());
    }

    if needs_rehash(&hash) {
        upgrade_password_hash(state, &user.id, password).await;
    }

    if let Err(e) = state.store.record_admin_login(&user.id).await {
        warn!("Failed to record login time for {}: {}", username, e);
    }

    let mut response = AdminUserResponse::from(user);
    response.last_login_at = Some(models::now());
    Ok(response)
}

/// Best effort: a failed upgrade leaves the old hash in place.
async fn upgrade_password_hash(state: &AppState, id: &str, password: &str) {
    let rehashed = match hash_password_async(password.to_string()).await {
        Ok(rehashed) => rehashed,
        Err(e) => {
            warn!("Failed to rehash password for {}: {:#}", id, e);
            return;
        }
    };

    let patch = AdminUserPatch {
        password_hash: Some(rehashed),
        ..Default::default()
    };
    match state.store.update_admin_user(id, &patch).await {
        Ok(_) => info!("Upgraded password hash for admin {}", id),
        Err(e) => warn!("Failed to store upgraded password hash for {}: {}", id, e),
    }
}

/// Current admin profile
/// GET /api/admin/me
pub async fn me(
    State(state): State<AppState>,
    Extension(AuthenticatedAdmin(claims)): Extension<AuthenticatedAdmin>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.sub == BUILTIN_ADMIN_ID {
        return Ok((StatusCode::OK, Json(state.auth.builtin_admin())));
    }

    let user = state
        .store
        .find_admin_user(&claims.username)
        .await?
        .filter(|user| user.id == claims.sub && user.is_active)
        .ok_or_else(|| ApiError::unauthorized("Account is no longer active"))?;

    Ok((StatusCode::OK, Json(AdminUserResponse::from(user))))
}
