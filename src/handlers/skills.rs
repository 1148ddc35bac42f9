// Skill handlers
// Admin CRUD, paged listing, exact-match search and status counts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::ApiError,
    handlers::{deleted, item, items, non_blank, Pagination, ValidJson, MAX_PAGE_SIZE},
    models::{self, CreateSkillRequest, DifficultyLevel, SkillStatus, UpdateSkillRequest},
    state::AppState,
    store::SkillQuery,
};

const ADMIN_PAGE_SIZE: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub struct AdminSkillParams {
    pub q: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SkillSearchParams {
    pub git_url: Option<String>,
    pub title: Option<String>,
    pub author_name: Option<String>,
}

/// Paged skill listing for the back office
/// GET /api/admin/skills
pub async fn list_skills(
    State(state): State<AppState>,
    Query(params): Query<AdminSkillParams>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination =
        Pagination::from_params(params.page.as_deref(), params.limit.as_deref(), ADMIN_PAGE_SIZE);

    let status = match non_blank(&params.status) {
        Some(raw) => Some(
            SkillStatus::parse(&raw)
                .ok_or_else(|| ApiError::validation(format!("Unknown status: {}", raw)))?,
        ),
        None => None,
    };
    let difficulty = match non_blank(&params.difficulty) {
        Some(raw) => Some(
            DifficultyLevel::parse(&raw)
                .ok_or_else(|| ApiError::validation(format!("Unknown difficulty: {}", raw)))?,
        ),
        None => None,
    };

    let query = SkillQuery {
        q: non_blank(&params.q),
        status,
        category_id: non_blank(&params.category),
        difficulty,
        offset: pagination.offset(),
        limit: Some(pagination.page_size),
        ..Default::default()
    };
    info!(
        "Listing skills page {} (size {}, status {:?})",
        pagination.page, pagination.page_size, query.status
    );

    let page = state.store.list_skills(&query).await?;

    info!("Retrieved {} of {} skills", page.items.len(), page.total);
    Ok((StatusCode::OK, pagination.respond(page.items, page.total)))
}

/// Exact-match lookup used by the importer to detect duplicates
/// GET /api/admin/skills/search
pub async fn search_skills(
    State(state): State<AppState>,
    Query(params): Query<SkillSearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = SkillQuery {
        git_url: non_blank(&params.git_url),
        title: non_blank(&params.title),
        author_name: non_blank(&params.author_name),
        limit: Some(MAX_PAGE_SIZE),
        ..Default::default()
    };
    if query.git_url.is_none() && query.title.is_none() && query.author_name.is_none() {
        return Err(ApiError::validation(
            "One of git_url, title or author_name is required",
        ));
    }

    let page = state.store.list_skills(&query).await?;

    Ok((StatusCode::OK, items(page.items)))
}

/// Skill counts per status
/// GET /api/admin/skills/stats
pub async fn skill_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let counts = state.store.skill_status_counts().await?;
    Ok((StatusCode::OK, Json(counts)))
}

/// GET /api/admin/skills/:id
pub async fn get_skill(
    State(state): State<AppState>,
    Path(skill_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Fetching skill with id: {}", skill_id);

    let skill = state.store.get_skill(&skill_id).await?;

    Ok((StatusCode::OK, item(skill)))
}

/// POST /api/admin/skills
pub async fn create_skill(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateSkillRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate().map_err(ApiError::Validation)?;
    let skill = request.into_skill(models::now());
    info!("Creating skill: {}", skill.title);

    let created = state.store.create_skill(&skill).await?;

    info!("Successfully created skill with id: {}", created.id);
    Ok((StatusCode::CREATED, item(created)))
}

/// PUT /api/admin/skills/:id
pub async fn update_skill(
    State(state): State<AppState>,
    Path(skill_id): Path<String>,
    ValidJson(request): ValidJson<UpdateSkillRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Updating skill with id: {}", skill_id);
    let patch = request.into_patch().map_err(ApiError::Validation)?;

    let updated = state.store.update_skill(&skill_id, &patch).await?;

    info!("Successfully updated skill with id: {}", skill_id);
    Ok((StatusCode::OK, item(updated)))
}

/// DELETE /api/admin/skills/:id
pub async fn delete_skill(
    State(state): State<AppState>,
    Path(skill_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Deleting skill with id: {}", skill_id);

    state.store.delete_skill(&skill_id).await?;

    info!("Successfully deleted skill with id: {}", skill_id);
    Ok((StatusCode::OK, deleted()))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use crate::handlers::testing::{admin_token, send, test_app};

    fn skill_body(title: &str, status: &str) -> Value {
        json!({
            "title": title,
            "content": "Body text",
            "category_id": "cat-1",
            "status": status,
            "tags": "rust, async,rust",
            "git_url": format!("https://github.com/example/{}", title.to_lowercase().replace(' ', "-")),
        })
    }

    #[tokio::test]
    async fn test_create_and_update_skill() {
        let (app, state, _dir) = test_app();
        let token = admin_token(&state);

        let (status, body) = send(
            &app,
            "POST",
            "/api/admin/skills",
            Some(&token),
            Some(skill_body("Tokio Basics", "draft")),
        )
        .await;
        assert_eq!(status, 201);
        let created = &body["item"];
        assert_eq!(created["tags"], json!(["rust", "async"]));
        assert_eq!(created["status"], "draft");
        assert!(created["published_at"].is_null());
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/admin/skills/{}", id),
            Some(&token),
            Some(json!({"status": "published", "description": null})),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["item"]["status"], "published");
        assert!(body["item"]["published_at"].is_string());
        assert_eq!(body["item"]["title"], "Tokio Basics");

        let (status, body) =
            send(&app, "GET", &format!("/api/admin/skills/{}", id), Some(&token), None).await;
        assert_eq!(status, 200);
        assert_eq!(body["item"]["id"], id.as_str());
    }

    #[tokio::test]
    async fn test_create_skill_requires_fields() {
        let (app, state, _dir) = test_app();
        let token = admin_token(&state);

        let (status, body) = send(
            &app,
            "POST",
            "/api/admin/skills",
            Some(&token),
            Some(json!({"title": "No content"})),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = send(
            &app,
            "POST",
            "/api/admin/skills",
            Some(&token),
            Some(json!("not an object")),
        )
        .await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn test_list_skills_paging_and_filters() {
        let (app, state, _dir) = test_app();
        let token = admin_token(&state);

        for i in 0..5 {
            let status_name = if i % 2 == 0 { "published" } else { "draft" };
            let (status, _) = send(
                &app,
                "POST",
                "/api/admin/skills",
                Some(&token),
                Some(skill_body(&format!("Skill {}", i), status_name)),
            )
            .await;
            assert_eq!(status, 201);
        }

        let (status, body) = send(
            &app,
            "GET",
            "/api/admin/skills?page=2&limit=2",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["page"], 2);
        assert_eq!(body["pageSize"], 2);
        assert_eq!(body["limit"], 2);
        assert_eq!(body["total"], 5);
        assert_eq!(body["totalPages"], 3);
        assert_eq!(body["items"].as_array().unwrap().len(), 2);

        let (_, body) = send(
            &app,
            "GET",
            "/api/admin/skills?status=published",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(body["total"], 3);

        let (status, _) = send(
            &app,
            "GET",
            "/api/admin/skills?status=bogus",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, 400);

        let (status, body) = send(&app, "GET", "/api/admin/skills/stats", Some(&token), None).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"published": 3, "draft": 2, "archived": 0, "total": 5}));
    }

    #[tokio::test]
    async fn test_search_skills_by_exact_fields() {
        let (app, state, _dir) = test_app();
        let token = admin_token(&state);

        for title in ["Alpha", "Alpha Two"] {
            send(
                &app,
                "POST",
                "/api/admin/skills",
                Some(&token),
                Some(skill_body(title, "draft")),
            )
            .await;
        }

        let (status, body) = send(
            &app,
            "GET",
            "/api/admin/skills/search?title=Alpha",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let (status, body) = send(
            &app,
            "GET",
            "/api/admin/skills/search?git_url=https://github.com/example/alpha-two",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["items"][0]["title"], "Alpha Two");

        let (status, _) = send(&app, "GET", "/api/admin/skills/search", Some(&token), None).await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn test_delete_missing_skill() {
        let (app, state, _dir) = test_app();
        let token = admin_token(&state);

        let (status, body) =
            send(&app, "DELETE", "/api/admin/skills/missing", Some(&token), None).await;
        assert_eq!(status, 404);
        assert_eq!(body["error"]["message"], "Skill not found");
    }
}
