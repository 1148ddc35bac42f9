// Admin user handlers
// HTTP handlers for back-office account management

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    auth::password::hash_password_async,
    error::ApiError,
    handlers::{deleted, item, items, non_blank, ValidJson},
    models::{self, AdminUserResponse, CreateAdminUserRequest, UpdateAdminUserRequest},
    state::AppState,
    store::UserQuery,
};

#[derive(Debug, Default, Deserialize)]
pub struct UserSearchParams {
    pub q: Option<String>,
}

/// Get all admin users
/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UserSearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Fetching admin users");
    let query = UserQuery {
        q: non_blank(&params.q),
    };

    let users: Vec<AdminUserResponse> = state
        .store
        .list_admin_users(&query)
        .await?
        .into_iter()
        .map(AdminUserResponse::from)
        .collect();

    info!("Retrieved {} admin users", users.len());
    Ok((StatusCode::OK, items(users)))
}

/// Create a new admin user
/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateAdminUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate().map_err(ApiError::Validation)?;
    let password_hash =
        hash_password_async(request.password.clone().unwrap_or_default()).await?;
    let user = request.into_admin_user(password_hash, models::now());
    info!("Creating admin user: {}", user.username);

    let created = state.store.create_admin_user(&user).await?;

    info!("Successfully created admin user with id: {}", created.id);
    Ok((StatusCode::CREATED, item(AdminUserResponse::from(created))))
}

/// Update admin user by ID
/// PUT /api/admin/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ValidJson(request): ValidJson<UpdateAdminUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Updating admin user with id: {}", user_id);
    request.validate().map_err(ApiError::Validation)?;

    let password_hash = match request.new_password() {
        Some(password) => Some(hash_password_async(password.to_string()).await?),
        None => None,
    };
    let patch = request.into_patch(password_hash);

    let updated = state.store.update_admin_user(&user_id, &patch).await?;

    info!("Successfully updated admin user with id: {}", user_id);
    Ok((StatusCode::OK, item(AdminUserResponse::from(updated))))
}

/// Delete admin user by ID
/// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Deleting admin user with id: {}", user_id);

    state.store.delete_admin_user(&user_id).await?;

    info!("Successfully deleted admin user with id: {}", user_id);
    Ok((StatusCode::OK, deleted()))
}
