// Public skill handlers
// Read-only catalog endpoints for the public site. Only published skills are visible.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::{
    error::ApiError,
    handlers::{item, items, non_blank, Pagination},
    models::{AuthorInfo, Skill, SkillStatus},
    state::AppState,
    store::SkillQuery,
};

const PUBLIC_PAGE_SIZE: usize = 12;
const SHOWCASE_LIMIT: usize = 24;
/// Tag that marks a skill as featured in imported data.
pub const FEATURED_TAG: &str = "精选";

#[derive(Debug, Default, Deserialize)]
pub struct PublicSkillParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// A published skill with its author's public profile, when known.
#[derive(Debug, Serialize)]
pub struct PublicSkill {
    #[serde(flatten)]
    pub skill: Skill,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorInfo>,
}

/// GET /api/skills
pub async fn list_published_skills(
    State(state): State<AppState>,
    Query(params): Query<PublicSkillParams>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination =
        Pagination::from_params(params.page.as_deref(), params.limit.as_deref(), PUBLIC_PAGE_SIZE);

    let query = SkillQuery {
        q: non_blank(&params.q),
        category_id: non_blank(&params.category),
        offset: pagination.offset(),
        limit: Some(pagination.page_size),
        ..SkillQuery::published()
    };
    let page = state.store.list_skills(&query).await?;

    Ok((StatusCode::OK, pagination.respond(page.items, page.total)))
}

/// Newest published skills
/// GET /api/skills/latest
pub async fn latest_skills(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let query = SkillQuery {
        limit: Some(SHOWCASE_LIMIT),
        ..SkillQuery::published()
    };
    let page = state.store.list_skills(&query).await?;

    Ok((StatusCode::OK, items(page.items)))
}

/// Published skills flagged `featured` or tagged as featured, newest first
/// GET /api/skills/featured
pub async fn featured_skills(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let flagged = SkillQuery {
        featured_only: true,
        limit: Some(SHOWCASE_LIMIT),
        ..SkillQuery::published()
    };
    let tagged = SkillQuery {
        tag: Some(FEATURED_TAG.to_string()),
        limit: Some(SHOWCASE_LIMIT),
        ..SkillQuery::published()
    };

    let flagged = state.store.list_skills(&flagged).await?.items;
    let tagged = state.store.list_skills(&tagged).await?.items;

    Ok((StatusCode::OK, items(merge_showcase(flagged, tagged))))
}

/// Union by id, newest first, capped at the showcase size.
fn merge_showcase(first: Vec<Skill>, second: Vec<Skill>) -> Vec<Skill> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Skill> = first
        .into_iter()
        .chain(second)
        .filter(|skill| seen.insert(skill.id.clone()))
        .collect();
    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged.truncate(SHOWCASE_LIMIT);
    merged
}

/// GET /api/skills/count
pub async fn count_published_skills(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let counts = state.store.skill_status_counts().await?;
    Ok((StatusCode::OK, Json(json!({ "total": counts.published }))))
}

/// GET /api/skills/:id
pub async fn get_published_skill(
    State(state): State<AppState>,
    Path(skill_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let skill = published_skill(&state, &skill_id).await?;
    let author = find_author(&state, &skill).await;

    Ok((StatusCode::OK, item(PublicSkill { skill, author })))
}

/// Count a download and return the updated skill
/// POST /api/skills/:id/download
pub async fn record_download(
    State(state): State<AppState>,
    Path(skill_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    published_skill(&state, &skill_id).await?;

    let skill = state.store.increment_skill_downloads(&skill_id).await?;

    info!("Skill {} downloaded ({} total)", skill_id, skill.download_count);
    Ok((StatusCode::OK, item(skill)))
}

async fn published_skill(state: &AppState, skill_id: &str) -> Result<Skill, ApiError> {
    let skill = state.store.get_skill(skill_id).await?;
    if skill.status != SkillStatus::Published {
        return Err(ApiError::not_found("Skill"));
    }
    Ok(skill)
}

/// Author enrichment is best effort; failures leave `author` out.
async fn find_author(state: &AppState, skill: &Skill) -> Option<AuthorInfo> {
    let author_id = skill.user_id.clone()?;
    match state.store.registered_users_by_ids(&[author_id]).await {
        Ok(users) => users.first().map(AuthorInfo::from),
        Err(e) => {
            warn!("Failed to load author for skill {}: {}", skill.id, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::{json, Value};

    use crate::handlers::testing::{admin_token, send, test_app};

    fn skill(id: &str, minutes: i64) -> Skill {
        let mut skill = crate::models::CreateSkillRequest {
            title: Some(id.to_string()),
            content: Some("c".to_string()),
            category_id: Some("cat".to_string()),
            ..Default::default()
        }
        .into_skill(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        skill.id = id.to_string();
        skill.created_at = skill.created_at + Duration::minutes(minutes);
        skill
    }

    #[test]
    fn test_merge_showcase_dedupes_and_sorts() {
        let merged = merge_showcase(
            vec![skill("a", 1), skill("b", 3)],
            vec![skill("b", 3), skill("c", 2)],
        );
        let ids: Vec<&str> = merged.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_merge_showcase_caps_size() {
        let many: Vec<Skill> = (0..30).map(|i| skill(&format!("s{}", i), i)).collect();
        assert_eq!(merge_showcase(many, Vec::new()).len(), SHOWCASE_LIMIT);
    }

    async fn create(app: &axum::Router, token: &str, body: Value) -> String {
        let (status, body) = send(app, "POST", "/api/admin/skills", Some(token), Some(body)).await;
        assert_eq!(status, 201);
        body["item"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_public_endpoints_only_show_published() {
        let (app, state, _dir) = test_app();
        let token = admin_token(&state);

        let published = create(
            &app,
            &token,
            json!({"title": "Visible", "content": "c", "category_id": "cat", "status": "published", "featured": true}),
        )
        .await;
        let tagged = create(
            &app,
            &token,
            json!({"title": "Tagged", "content": "c", "category_id": "cat", "status": "published", "tags": ["精选"]}),
        )
        .await;
        let draft = create(
            &app,
            &token,
            json!({"title": "Hidden", "content": "c", "category_id": "cat", "featured": true}),
        )
        .await;

        let (status, body) = send(&app, "GET", "/api/skills", None, None).await;
        assert_eq!(status, 200);
        assert_eq!(body["total"], 2);
        assert_eq!(body["pageSize"], 12);

        let (_, body) = send(&app, "GET", "/api/skills?q=visi", None, None).await;
        assert_eq!(body["total"], 1);

        let (_, body) = send(&app, "GET", "/api/skills/count", None, None).await;
        assert_eq!(body, json!({"total": 2}));

        let (_, body) = send(&app, "GET", "/api/skills/latest", None, None).await;
        assert_eq!(body["items"].as_array().unwrap().len(), 2);

        let (_, body) = send(&app, "GET", "/api/skills/featured", None, None).await;
        let mut ids: Vec<String> = body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap().to_string())
            .collect();
        ids.sort();
        let mut expected = vec![published.clone(), tagged];
        expected.sort();
        assert_eq!(ids, expected);

        let (status, body) = send(&app, "GET", &format!("/api/skills/{}", published), None, None).await;
        assert_eq!(status, 200);
        assert_eq!(body["item"]["title"], "Visible");
        assert!(body["item"].get("author").is_none());

        let (status, _) = send(&app, "GET", &format!("/api/skills/{}", draft), None, None).await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_record_download() {
        let (app, state, _dir) = test_app();
        let token = admin_token(&state);

        let id = create(
            &app,
            &token,
            json!({"title": "Tool", "content": "c", "category_id": "cat", "status": "published"}),
        )
        .await;

        let uri = format!("/api/skills/{}/download", id);
        send(&app, "POST", &uri, None, None).await;
        let (status, body) = send(&app, "POST", &uri, None, None).await;
        assert_eq!(status, 200);
        assert_eq!(body["item"]["download_count"], 2);

        let (status, _) = send(&app, "POST", "/api/skills/nope/download", None, None).await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_author_enrichment_from_registered_users() {
        let (app, state, dir) = test_app();
        let token = admin_token(&state);

        std::fs::write(
            dir.path().join("registered_users.dev.json"),
            json!([{
                "id": "author-1",
                "username": "ferris",
                "email": "ferris@example.com",
                "avatar_url": "https://example.com/ferris.png",
                "role": "normal"
            }])
            .to_string(),
        )
        .unwrap();

        let id = create(
            &app,
            &token,
            json!({"title": "Crabs", "content": "c", "category_id": "cat", "status": "published", "author_id": "author-1"}),
        )
        .await;

        let (status, body) = send(&app, "GET", &format!("/api/skills/{}", id), None, None).await;
        assert_eq!(status, 200);
        assert_eq!(
            body["item"]["author"],
            json!({"id": "author-1", "username": "ferris", "avatar_url": "https://example.com/ferris.png"})
        );
        assert_eq!(body["item"]["user_id"], "author-1");
    }
}
