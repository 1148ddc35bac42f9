// Link exchange handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::ApiError,
    handlers::{deleted, item, items, non_blank, ValidJson},
    models::{self, CreateLinkRequest, Link, UpdateLinkRequest},
    state::AppState,
    store::LinkQuery,
};

#[derive(Debug, Default, Deserialize)]
pub struct LinkSearchParams {
    pub q: Option<String>,
}

/// Enabled links for the public footer.
/// Store failures are logged and answered with an empty list.
/// GET /api/links
pub async fn list_public_links(State(state): State<AppState>) -> impl IntoResponse {
    let query = LinkQuery {
        enabled_only: true,
        ..Default::default()
    };

    let links = match state.store.list_links(&query).await {
        Ok(links) => links,
        Err(e) => {
            warn!("Serving empty link list after store failure: {}", e);
            Vec::<Link>::new()
        }
    };

    (StatusCode::OK, items(links))
}

/// GET /api/admin/links
pub async fn list_links(
    State(state): State<AppState>,
    Query(params): Query<LinkSearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = LinkQuery {
        q: non_blank(&params.q),
        enabled_only: false,
    };

    let links = state.store.list_links(&query).await?;

    info!("Retrieved {} links", links.len());
    Ok((StatusCode::OK, items(links)))
}

/// POST /api/admin/links
pub async fn create_link(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate().map_err(ApiError::Validation)?;
    let link = request.into_link(models::now());
    info!("Creating link: {}", link.url);

    let created = state.store.create_link(&link).await?;

    Ok((StatusCode::CREATED, item(created)))
}

/// PUT /api/admin/links/:id
pub async fn update_link(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    ValidJson(request): ValidJson<UpdateLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Updating link with id: {}", link_id);
    let patch = request.into_patch().map_err(ApiError::Validation)?;

    let updated = state.store.update_link(&link_id, &patch).await?;

    Ok((StatusCode::OK, item(updated)))
}

/// DELETE /api/admin/links/:id
pub async fn delete_link(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Deleting link with id: {}", link_id);

    state.store.delete_link(&link_id).await?;

    Ok((StatusCode::OK, deleted()))
}
