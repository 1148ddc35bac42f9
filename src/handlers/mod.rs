// Handlers module
// HTTP handlers for the public and admin APIs

pub mod auth;
pub mod categories;
pub mod feedback;
pub mod links;
pub mod public;
pub mod skills;
pub mod users;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::ApiError;

/// Health check handler
/// Returns "OK" with 200 status for monitoring purposes
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// `{ "items": [...] }`
#[derive(Debug, Serialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

/// `{ "item": {...} }`
#[derive(Debug, Serialize)]
pub struct ItemResponse<T> {
    pub item: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub page: usize,
    /// Same value as `page_size`, under the key older admin clients read.
    pub limit: usize,
    pub page_size: usize,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
}

pub fn items<T: Serialize>(items: Vec<T>) -> Json<ItemsResponse<T>> {
    Json(ItemsResponse { items })
}

pub fn item<T: Serialize>(item: T) -> Json<ItemResponse<T>> {
    Json(ItemResponse { item })
}

pub fn deleted() -> Json<DeletedResponse> {
    Json(DeletedResponse { success: true })
}

/// JSON body extractor whose rejections use the API error envelope.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        Ok(ValidJson(value))
    }
}

pub const MAX_PAGE_SIZE: usize = 100;
/// Keeps `offset()` well inside what SQL `OFFSET` accepts.
pub const MAX_PAGE: usize = 1_000_000;

/// Page number and size parsed from query strings. Unparsable values fall
/// back to the defaults; the size is clamped to `1..=MAX_PAGE_SIZE` and the
/// page to `1..=MAX_PAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Pagination {
    pub fn from_params(page: Option<&str>, limit: Option<&str>, default_size: usize) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<usize>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
            .min(MAX_PAGE);
        let page_size = limit
            .and_then(|l| l.trim().parse::<usize>().ok())
            .unwrap_or(default_size)
            .clamp(1, MAX_PAGE_SIZE);
        Pagination { page, page_size }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn respond<T: Serialize>(&self, items: Vec<T>, total: u64) -> Json<PageResponse<T>> {
        let size = self.page_size as u64;
        Json(PageResponse {
            items,
            page: self.page,
            limit: self.page_size,
            page_size: self.page_size,
            total,
            total_pages: total.div_ceil(size),
        })
    }
}

/// Blank query parameters count as absent.
pub(crate) fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
