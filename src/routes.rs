use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{
    handlers::{auth, categories, feedback, health_check, links, public, skills, users},
    middleware::require_admin,
    state::AppState,
};

/// Create the Axum router with all endpoints.
/// Cross-cutting layers (tracing, CORS, timeout) are added by the caller.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Public catalog endpoints
        .route("/api/links", get(links::list_public_links))
        .route("/api/categories", get(categories::list_public_categories))
        .route("/api/skills", get(public::list_published_skills))
        .route("/api/skills/latest", get(public::latest_skills))
        .route("/api/skills/featured", get(public::featured_skills))
        .route("/api/skills/count", get(public::count_published_skills))
        .route("/api/skills/:id", get(public::get_published_skill))
        .route("/api/skills/:id/download", post(public::record_download))
        .route("/api/feedback", post(feedback::submit_feedback))
        // Back office
        .nest("/api/admin", admin_router(state.clone()))
        .with_state(state)
}

fn admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(auth::me))
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/categories/search", get(categories::list_categories))
        .route(
            "/categories/:id",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route("/skills", get(skills::list_skills).post(skills::create_skill))
        .route("/skills/search", get(skills::search_skills))
        .route("/skills/stats", get(skills::skill_stats))
        .route(
            "/skills/:id",
            get(skills::get_skill)
                .put(skills::update_skill)
                .delete(skills::delete_skill),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", put(users::update_user).delete(users::delete_user))
        .route("/links", get(links::list_links).post(links::create_link))
        .route("/links/:id", put(links::update_link).delete(links::delete_link))
        // Everything above requires an admin token
        .route_layer(middleware::from_fn_with_state(state, require_admin))
        .route("/login", post(auth::login))
}
