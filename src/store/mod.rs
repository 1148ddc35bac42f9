//! Catalog persistence.
//!
//! `CatalogStore` is the single seam between the HTTP layer and storage. Two
//! implementations exist: the hosted Postgres store (`crate::db::Database`)
//! and the local JSON-file store (`file::FileStore`). `fallback::FallbackStore`
//! composes them.

pub mod fallback;
pub mod file;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    AdminUser, AdminUserPatch, Category, CategoryPatch, DifficultyLevel, Feedback, Link, LinkPatch,
    RegisteredUser, Skill, SkillPatch, SkillStatus,
};

pub use fallback::FallbackStore;
pub use file::FileStore;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Short name used in logs.
    fn backend_name(&self) -> &'static str;

    // Categories
    async fn list_categories(&self, query: &CategoryQuery) -> StoreResult<Vec<Category>>;
    async fn create_category(&self, category: &Category) -> StoreResult<Category>;
    async fn update_category(&self, id: &str, patch: &CategoryPatch) -> StoreResult<Category>;
    async fn delete_category(&self, id: &str) -> StoreResult<()>;

    // Skills
    async fn list_skills(&self, query: &SkillQuery) -> StoreResult<SkillPage>;
    async fn get_skill(&self, id: &str) -> StoreResult<Skill>;
    async fn create_skill(&self, skill: &Skill) -> StoreResult<Skill>;
    async fn update_skill(&self, id: &str, patch: &SkillPatch) -> StoreResult<Skill>;
    async fn delete_skill(&self, id: &str) -> StoreResult<()>;
    async fn increment_skill_downloads(&self, id: &str) -> StoreResult<Skill>;
    async fn skill_status_counts(&self) -> StoreResult<StatusCounts>;

    // Admin users
    async fn list_admin_users(&self, query: &UserQuery) -> StoreResult<Vec<AdminUser>>;
    async fn find_admin_user(&self, username: &str) -> StoreResult<Option<AdminUser>>;
    async fn create_admin_user(&self, user: &AdminUser) -> StoreResult<AdminUser>;
    async fn update_admin_user(&self, id: &str, patch: &AdminUserPatch) -> StoreResult<AdminUser>;
    async fn delete_admin_user(&self, id: &str) -> StoreResult<()>;
    async fn record_admin_login(&self, id: &str) -> StoreResult<()>;

    // Registered users
    async fn registered_users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<RegisteredUser>>;

    // Links
    async fn list_links(&self, query: &LinkQuery) -> StoreResult<Vec<Link>>;
    async fn create_link(&self, link: &Link) -> StoreResult<Link>;
    async fn update_link(&self, id: &str, patch: &LinkPatch) -> StoreResult<Link>;
    async fn delete_link(&self, id: &str) -> StoreResult<()>;

    // Feedback
    async fn create_feedback(&self, feedback: &Feedback) -> StoreResult<Feedback>;
}

/// Filters for `list_skills`. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct SkillQuery {
    /// Case-insensitive substring over titles, descriptions and content.
    pub q: Option<String>,
    pub status: Option<SkillStatus>,
    pub category_id: Option<String>,
    pub difficulty: Option<DifficultyLevel>,
    pub featured_only: bool,
    /// Exact tag membership.
    pub tag: Option<String>,
    pub title: Option<String>,
    pub author_name: Option<String>,
    pub git_url: Option<String>,
    pub offset: usize,
    /// `None` returns every match.
    pub limit: Option<usize>,
}

impl SkillQuery {
    pub fn published() -> Self {
        SkillQuery {
            status: Some(SkillStatus::Published),
            ..Default::default()
        }
    }

    pub fn matches(&self, skill: &Skill) -> bool {
        if let Some(status) = self.status {
            if skill.status != status {
                return false;
            }
        }
        if let Some(ref category_id) = self.category_id {
            if skill.category_id.as_deref() != Some(category_id.as_str()) {
                return false;
            }
        }
        if let Some(level) = self.difficulty {
            if skill.difficulty_level != level {
                return false;
            }
        }
        if self.featured_only && !skill.featured {
            return false;
        }
        if let Some(ref tag) = self.tag {
            if !skill.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(ref title) = self.title {
            if &skill.title != title {
                return false;
            }
        }
        if let Some(ref author) = self.author_name {
            if skill.author_name.as_deref() != Some(author.as_str()) {
                return false;
            }
        }
        if let Some(ref git_url) = self.git_url {
            if skill.git_url.as_deref() != Some(git_url.as_str()) {
                return false;
            }
        }
        match search_term(&self.q) {
            Some(needle) => skill
                .searchable_text()
                .any(|field| contains_ignore_case(field, &needle)),
            None => true,
        }
    }
}

/// One page of skills plus the total number of matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillPage {
    pub items: Vec<Skill>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub published: u64,
    pub draft: u64,
    pub archived: u64,
    pub total: u64,
}

impl StatusCounts {
    pub fn tally<'a>(skills: impl IntoIterator<Item = &'a Skill>) -> Self {
        let mut counts = StatusCounts::default();
        for skill in skills {
            match skill.status {
                SkillStatus::Published => counts.published += 1,
                SkillStatus::Draft => counts.draft += 1,
                SkillStatus::Archived => counts.archived += 1,
            }
            counts.total += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryQuery {
    pub q: Option<String>,
    pub active_only: bool,
}

impl CategoryQuery {
    pub fn matches(&self, category: &Category) -> bool {
        if self.active_only && !category.is_active {
            return false;
        }
        match search_term(&self.q) {
            Some(needle) => [
                Some(category.name.as_str()),
                category.name_en.as_deref(),
                category.description.as_deref(),
                category.description_en.as_deref(),
                Some(category.slug.as_str()),
            ]
            .into_iter()
            .flatten()
            .any(|field| contains_ignore_case(field, &needle)),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub q: Option<String>,
}

impl UserQuery {
    pub fn matches(&self, user: &AdminUser) -> bool {
        match search_term(&self.q) {
            Some(needle) => {
                contains_ignore_case(&user.username, &needle)
                    || contains_ignore_case(&user.email, &needle)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkQuery {
    pub q: Option<String>,
    pub enabled_only: bool,
}

impl LinkQuery {
    pub fn matches(&self, link: &Link) -> bool {
        if self.enabled_only && !link.enabled {
            return false;
        }
        match search_term(&self.q) {
            Some(needle) => [
                Some(link.name.as_str()),
                Some(link.url.as_str()),
                link.description.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| contains_ignore_case(field, &needle)),
            None => true,
        }
    }
}

/// Build the store stack described by the configuration:
/// hosted + fallback, hosted only (fallback disabled), or local files only.
///
/// With fallback enabled an unreachable database is logged and tolerated;
/// otherwise startup fails.
pub async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn CatalogStore>> {
    let Some(ref db_config) = config.database else {
        info!(
            "No hosted database configured; using local JSON store at {}",
            config.data_dir.display()
        );
        return Ok(Arc::new(FileStore::new(&config.data_dir)));
    };

    let database = Database::connect(db_config).context("Failed to create database pool")?;

    let ready = async {
        database.health_check().await?;
        if config.auto_migrate {
            database.migrate().await?;
        }
        Ok::<(), StoreError>(())
    }
    .await;

    match ready {
        Ok(()) => info!("Database connection established"),
        Err(e) if config.fallback_enabled => {
            warn!("Hosted database not ready, requests will use the local store: {}", e)
        }
        Err(e) => return Err(e).context("Hosted database is not reachable"),
    }

    if !config.fallback_enabled {
        info!("Fallback store disabled; serving from the hosted database only");
        return Ok(Arc::new(database));
    }

    info!(
        "Serving from the hosted database with local fallback at {}",
        config.data_dir.display()
    );
    Ok(Arc::new(FallbackStore::new(
        Arc::new(database),
        Arc::new(FileStore::new(&config.data_dir)),
    )))
}

/// Trimmed, lowercased search term; blank means "no search".
pub(crate) fn search_term(q: &Option<String>) -> Option<String> {
    q.as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase)
}

fn contains_ignore_case(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}
