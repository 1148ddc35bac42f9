use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{CatalogStore, CategoryQuery, LinkQuery, SkillPage, SkillQuery, StatusCounts, UserQuery};
use crate::error::StoreResult;
use crate::models::{
    AdminUser, AdminUserPatch, Category, CategoryPatch, Feedback, Link, LinkPatch, RegisteredUser,
    Skill, SkillPatch,
};

/// Runs every operation on `primary` and repeats it on `fallback` when the
/// primary reports a connectivity or schema failure. Other errors are
/// returned unchanged. Writes served by the fallback are never replayed on
/// the primary.
pub struct FallbackStore {
    primary: Arc<dyn CatalogStore>,
    fallback: Arc<dyn CatalogStore>,
}

impl FallbackStore {
    pub fn new(primary: Arc<dyn CatalogStore>, fallback: Arc<dyn CatalogStore>) -> Self {
        FallbackStore { primary, fallback }
    }
}

macro_rules! with_fallback {
    ($self:ident, $op:literal, |$store:ident| $call:expr) => {{
        let $store = &$self.primary;
        match $call {
            Err(err) if err.is_fallback_eligible() => {
                warn!(
                    "{} failed on {} store ({}), serving from {} store",
                    $op,
                    $self.primary.backend_name(),
                    err,
                    $self.fallback.backend_name()
                );
                let $store = &$self.fallback;
                $call
            }
            result => result,
        }
    }};
}

#[async_trait]
impl CatalogStore for FallbackStore {
    fn backend_name(&self) -> &'static str {
        "fallback"
    }

    async fn list_categories(&self, query: &CategoryQuery) -> StoreResult<Vec<Category>> {
        with_fallback!(self, "list_categories", |store| store.list_categories(query).await)
    }

    async fn create_category(&self, category: &Category) -> StoreResult<Category> {
        with_fallback!(self, "create_category", |store| store.create_category(category).await)
    }

    async fn update_category(&self, id: &str, patch: &CategoryPatch) -> StoreResult<Category> {
        with_fallback!(self, "update_category", |store| store.update_category(id, patch).await)
    }

    async fn delete_category(&self, id: &str) -> StoreResult<()> {
        with_fallback!(self, "delete_category", |store| store.delete_category(id).await)
    }

    async fn list_skills(&self, query: &SkillQuery) -> StoreResult<SkillPage> {
        with_fallback!(self, "list_skills", |store| store.list_skills(query).await)
    }

    async fn get_skill(&self, id: &str) -> StoreResult<Skill> {
        with_fallback!(self, "get_skill", |store| store.get_skill(id).await)
    }

    async fn create_skill(&self, skill: &Skill) -> StoreResult<Skill> {
        with_fallback!(self, "create_skill", |store| store.create_skill(skill).await)
    }

    async fn update_skill(&self, id: &str, patch: &SkillPatch) -> StoreResult<Skill> {
        with_fallback!(self, "update_skill", |store| store.update_skill(id, patch).await)
    }

    async fn delete_skill(&self, id: &str) -> StoreResult<()> {
        with_fallback!(self, "delete_skill", |store| store.delete_skill(id).await)
    }

    async fn increment_skill_downloads(&self, id: &str) -> StoreResult<Skill> {
        with_fallback!(self, "increment_skill_downloads", |store| store
            .increment_skill_downloads(id)
            .await)
    }

    async fn skill_status_counts(&self) -> StoreResult<StatusCounts> {
        with_fallback!(self, "skill_status_counts", |store| store.skill_status_counts().await)
    }

    async fn list_admin_users(&self, query: &UserQuery) -> StoreResult<Vec<AdminUser>> {
        with_fallback!(self, "list_admin_users", |store| store.list_admin_users(query).await)
    }

    async fn find_admin_user(&self, username: &str) -> StoreResult<Option<AdminUser>> {
        with_fallback!(self, "find_admin_user", |store| store.find_admin_user(username).await)
    }

    async fn create_admin_user(&self, user: &AdminUser) -> StoreResult<AdminUser> {
        with_fallback!(self, "create_admin_user", |store| store.create_admin_user(user).await)
    }

    async fn update_admin_user(&self, id: &str, patch: &AdminUserPatch) -> StoreResult<AdminUser> {
        with_fallback!(self, "update_admin_user", |store| store
            .update_admin_user(id, patch)
            .await)
    }

    async fn delete_admin_user(&self, id: &str) -> StoreResult<()> {
        with_fallback!(self, "delete_admin_user", |store| store.delete_admin_user(id).await)
    }

    async fn record_admin_login(&self, id: &str) -> StoreResult<()> {
        with_fallback!(self, "record_admin_login", |store| store.record_admin_login(id).await)
    }

    async fn registered_users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<RegisteredUser>> {
        with_fallback!(self, "registered_users_by_ids", |store| store
            .registered_users_by_ids(ids)
            .await)
    }

    async fn list_links(&self, query: &LinkQuery) -> StoreResult<Vec<Link>> {
        with_fallback!(self, "list_links", |store| store.list_links(query).await)
    }

    async fn create_link(&self, link: &Link) -> StoreResult<Link> {
        with_fallback!(self, "create_link", |store| store.create_link(link).await)
    }

    async fn update_link(&self, id: &str, patch: &LinkPatch) -> StoreResult<Link> {
        with_fallback!(self, "update_link", |store| store.update_link(id, patch).await)
    }

    async fn delete_link(&self, id: &str) -> StoreResult<()> {
        with_fallback!(self, "delete_link", |store| store.delete_link(id).await)
    }

    async fn create_feedback(&self, feedback: &Feedback) -> StoreResult<Feedback> {
        with_fallback!(self, "create_feedback", |store| store.create_feedback(feedback).await)
    }
}
