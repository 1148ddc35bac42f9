// Category handlers
// Admin CRUD plus the public list of active categories

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::ApiError,
    handlers::{deleted, item, items, non_blank, ValidJson},
    models::{self, CreateCategoryRequest, UpdateCategoryRequest},
    state::AppState,
    store::CategoryQuery,
};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Active categories for the public site
/// GET /api/categories
pub async fn list_public_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let query = CategoryQuery {
        active_only: true,
        ..Default::default()
    };
    let categories = state.store.list_categories(&query).await?;

    Ok((StatusCode::OK, items(categories)))
}

/// All categories, optionally filtered by `q`
/// GET /api/admin/categories
/// GET /api/admin/categories/search
pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = CategoryQuery {
        q: non_blank(&params.q),
        active_only: false,
    };
    info!("Listing categories (q: {:?})", query.q);

    let categories = state.store.list_categories(&query).await?;

    info!("Retrieved {} categories", categories.len());
    Ok((StatusCode::OK, items(categories)))
}

/// POST /api/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate().map_err(ApiError::Validation)?;
    let category = request.into_category(models::now());
    info!("Creating category with slug: {}", category.slug);

    let created = state.store.create_category(&category).await?;

    info!("Successfully created category with id: {}", created.id);
    Ok((StatusCode::CREATED, item(created)))
}

/// PUT /api/admin/categories/:id
pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
    ValidJson(request): ValidJson<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Updating category with id: {}", category_id);
    let patch = request.into_patch().map_err(ApiError::Validation)?;

    let updated = state.store.update_category(&category_id, &patch).await?;

    info!("Successfully updated category with id: {}", category_id);
    Ok((StatusCode::OK, item(updated)))
}

/// DELETE /api/admin/categories/:id
pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Deleting category with id: {}", category_id);

    state.store.delete_category(&category_id).await?;

    info!("Successfully deleted category with id: {}", category_id);
    Ok((StatusCode::OK, deleted()))
}
