//! Local JSON-file store.
//!
//! Each entity lives in its own pretty-printed JSON array under the data
//! directory. Every operation reads the whole file, modifies it in memory and
//! overwrites it. Missing files are created as `[]`. Damaged content (not a
//! JSON array, or entries that do not map) is skipped on reads, but writes
//! refuse to run over it so nothing on disk is dropped.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{CatalogStore, CategoryQuery, LinkQuery, SkillPage, SkillQuery, StatusCounts, UserQuery};
use crate::error::{StoreError, StoreResult};
use crate::mapper;
use crate::models::{
    self, AdminUser, AdminUserPatch, Category, CategoryPatch, Feedback, Link, LinkPatch,
    RegisteredUser, Skill, SkillPatch,
};

const CATEGORIES_FILE: &str = "categories.dev.json";
const SKILLS_FILE: &str = "skills.dev.json";
const USERS_FILE: &str = "users.dev.json";
const REGISTERED_USERS_FILE: &str = "registered_users.dev.json";
const LINKS_FILE: &str = "links.dev.json";
const FEEDBACK_FILE: &str = "feedback.dev.json";

/// Whether the caller will rewrite the file from what it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

impl Access {
    fn tolerate<T>(self, path: &Path, problem: String, records: Vec<T>) -> StoreResult<Vec<T>> {
        match self {
            Access::Read => {
                warn!("Data file {} {}, serving readable entries", path.display(), problem);
                Ok(records)
            }
            Access::Write => Err(StoreError::Io(format!(
                "{} {}; fix it before writing",
                path.display(),
                problem
            ))),
        }
    }
}

pub struct FileStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_records<T>(
        &self,
        file: &str,
        access: Access,
        parse: fn(&Value) -> StoreResult<T>,
    ) -> StoreResult<Vec<T>> {
        let path = self.dir.join(file);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("Creating empty data file {}", path.display());
                tokio::fs::create_dir_all(&self.dir).await?;
                tokio::fs::write(&path, "[]").await?;
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let entries = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                return access.tolerate(&path, "is not a JSON array".to_string(), Vec::new());
            }
            Err(err) => {
                return access.tolerate(&path, format!("is not valid JSON ({})", err), Vec::new());
            }
        };

        let mut records = Vec::with_capacity(entries.len());
        let mut unreadable = 0usize;
        for entry in &entries {
            match parse(entry) {
                Ok(record) => records.push(record),
                Err(err) => {
                    unreadable += 1;
                    warn!("Unreadable entry in {}: {}", path.display(), err);
                }
            }
        }
        if unreadable > 0 {
            return access.tolerate(&path, format!("has {} unreadable entries", unreadable), records);
        }
        Ok(records)
    }

    async fn write_records<T: Serialize>(&self, file: &str, records: &[T]) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_string_pretty(records)?;
        tokio::fs::write(self.dir.join(file), body).await?;
        Ok(())
    }

    async fn categories(&self, access: Access) -> StoreResult<Vec<Category>> {
        self.read_records(CATEGORIES_FILE, access, mapper::category_from_row).await
    }

    async fn skills(&self, access: Access) -> StoreResult<Vec<Skill>> {
        self.read_records(SKILLS_FILE, access, mapper::skill_from_row).await
    }

    async fn admin_users(&self, access: Access) -> StoreResult<Vec<AdminUser>> {
        self.read_records(USERS_FILE, access, mapper::admin_user_from_row).await
    }

    async fn links(&self, access: Access) -> StoreResult<Vec<Link>> {
        self.read_records(LINKS_FILE, access, mapper::link_from_row).await
    }
}

fn position_of<T>(records: &[T], id: &str, key: impl Fn(&T) -> &str) -> Option<usize> {
    records.iter().position(|record| key(record) == id)
}

fn check_admin_conflict(
    users: &[AdminUser],
    username: &str,
    email: &str,
    skip_id: Option<&str>,
) -> StoreResult<()> {
    for user in users {
        if Some(user.id.as_str()) == skip_id {
            continue;
        }
        if user.username == username {
            return Err(StoreError::conflict("Username already exists"));
        }
        if user.email.eq_ignore_ascii_case(email) {
            return Err(StoreError::conflict("Email address already exists"));
        }
    }
    Ok(())
}

#[async_trait]
impl CatalogStore for FileStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn list_categories(&self, query: &CategoryQuery) -> StoreResult<Vec<Category>> {
        let _guard = self.lock.lock().await;
        let mut categories: Vec<Category> = self
            .categories(Access::Read)
            .await?
            .into_iter()
            .filter(|c| query.matches(c))
            .collect();
        categories.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(categories)
    }

    async fn create_category(&self, category: &Category) -> StoreResult<Category> {
        let _guard = self.lock.lock().await;
        let mut categories = self.categories(Access::Write).await?;
        if categories.iter().any(|c| c.slug == category.slug) {
            return Err(StoreError::conflict("Slug already exists"));
        }
        categories.push(category.clone());
        self.write_records(CATEGORIES_FILE, &categories).await?;
        Ok(category.clone())
    }

    async fn update_category(&self, id: &str, patch: &CategoryPatch) -> StoreResult<Category> {
        let _guard = self.lock.lock().await;
        let mut categories = self.categories(Access::Write).await?;
        let index = position_of(&categories, id, |c| c.id.as_str())
            .ok_or_else(|| StoreError::not_found("Category"))?;

        if let Some(ref slug) = patch.slug {
            if categories.iter().any(|c| c.id != id && &c.slug == slug) {
                return Err(StoreError::conflict("Slug already exists"));
            }
        }

        patch.apply(&mut categories[index], models::now());
        let updated = categories[index].clone();
        self.write_records(CATEGORIES_FILE, &categories).await?;
        Ok(updated)
    }

    async fn delete_category(&self, id: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut categories = self.categories(Access::Write).await?;
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            return Err(StoreError::not_found("Category"));
        }
        self.write_records(CATEGORIES_FILE, &categories).await
    }

    async fn list_skills(&self, query: &SkillQuery) -> StoreResult<SkillPage> {
        let _guard = self.lock.lock().await;
        let mut matched: Vec<Skill> = self
            .skills(Access::Read)
            .await?
            .into_iter()
            .filter(|s| query.matches(s))
            .collect();
        // Stable, so equal timestamps keep file order (newest prepended).
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(SkillPage { items, total })
    }

    async fn get_skill(&self, id: &str) -> StoreResult<Skill> {
        let _guard = self.lock.lock().await;
        self.skills(Access::Read)
            .await?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::not_found("Skill"))
    }

    async fn create_skill(&self, skill: &Skill) -> StoreResult<Skill> {
        let _guard = self.lock.lock().await;
        let mut skills = self.skills(Access::Write).await?;
        skills.insert(0, skill.clone());
        self.write_records(SKILLS_FILE, &skills).await?;
        Ok(skill.clone())
    }

    async fn update_skill(&self, id: &str, patch: &SkillPatch) -> StoreResult<Skill> {
        let _guard = self.lock.lock().await;
        let mut skills = self.skills(Access::Write).await?;
        let index =
            position_of(&skills, id, |s| s.id.as_str()).ok_or_else(|| StoreError::not_found("Skill"))?;

        patch.apply(&mut skills[index], models::now());
        let updated = skills[index].clone();
        self.write_records(SKILLS_FILE, &skills).await?;
        Ok(updated)
    }

    async fn delete_skill(&self, id: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut skills = self.skills(Access::Write).await?;
        let before = skills.len();
        skills.retain(|s| s.id != id);
        if skills.len() == before {
            return Err(StoreError::not_found("Skill"));
        }
        self.write_records(SKILLS_FILE, &skills).await
    }

    async fn increment_skill_downloads(&self, id: &str) -> StoreResult<Skill> {
        let _guard = self.lock.lock().await;
        let mut skills = self.skills(Access::Write).await?;
        let index =
            position_of(&skills, id, |s| s.id.as_str()).ok_or_else(|| StoreError::not_found("Skill"))?;

        skills[index].download_count += 1;
        let updated = skills[index].clone();
        self.write_records(SKILLS_FILE, &skills).await?;
        Ok(updated)
    }

    async fn skill_status_counts(&self) -> StoreResult<StatusCounts> {
        let _guard = self.lock.lock().await;
        Ok(StatusCounts::tally(&self.skills(Access::Read).await?))
    }

    async fn list_admin_users(&self, query: &UserQuery) -> StoreResult<Vec<AdminUser>> {
        let _guard = self.lock.lock().await;
        let mut users: Vec<AdminUser> = self
            .admin_users(Access::Read)
            .await?
            .into_iter()
            .filter(|u| query.matches(u))
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn find_admin_user(&self, username: &str) -> StoreResult<Option<AdminUser>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .admin_users(Access::Read)
            .await?
            .into_iter()
            .find(|u| u.username == username))
    }

    async fn create_admin_user(&self, user: &AdminUser) -> StoreResult<AdminUser> {
        let _guard = self.lock.lock().await;
        let mut users = self.admin_users(Access::Write).await?;
        check_admin_conflict(&users, &user.username, &user.email, None)?;
        users.push(user.clone());
        self.write_records(USERS_FILE, &users).await?;
        Ok(user.clone())
    }

    async fn update_admin_user(&self, id: &str, patch: &AdminUserPatch) -> StoreResult<AdminUser> {
        let _guard = self.lock.lock().await;
        let mut users = self.admin_users(Access::Write).await?;
        let index = position_of(&users, id, |u| u.id.as_str())
            .ok_or_else(|| StoreError::not_found("Admin user"))?;

        let username = patch.username.as_deref().unwrap_or(&users[index].username);
        let email = patch.email.as_deref().unwrap_or(&users[index].email);
        check_admin_conflict(&users, username, email, Some(id))?;

        patch.apply(&mut users[index], models::now());
        let updated = users[index].clone();
        self.write_records(USERS_FILE, &users).await?;
        Ok(updated)
    }

    async fn delete_admin_user(&self, id: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut users = self.admin_users(Access::Write).await?;
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(StoreError::not_found("Admin user"));
        }
        self.write_records(USERS_FILE, &users).await
    }

    async fn record_admin_login(&self, id: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut users = self.admin_users(Access::Write).await?;
        let index = position_of(&users, id, |u| u.id.as_str())
            .ok_or_else(|| StoreError::not_found("Admin user"))?;

        let now = models::now();
        users[index].last_login_at = Some(now);
        users[index].updated_at = now;
        self.write_records(USERS_FILE, &users).await
    }

    async fn registered_users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<RegisteredUser>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let _guard = self.lock.lock().await;
        let users = self
            .read_records(REGISTERED_USERS_FILE, Access::Read, mapper::registered_user_from_row)
            .await?;
        Ok(users.into_iter().filter(|u| ids.contains(&u.id)).collect())
    }

    async fn list_links(&self, query: &LinkQuery) -> StoreResult<Vec<Link>> {
        let _guard = self.lock.lock().await;
        let mut links: Vec<Link> = self
            .links(Access::Read)
            .await?
            .into_iter()
            .filter(|l| query.matches(l))
            .collect();
        links.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(links)
    }

    async fn create_link(&self, link: &Link) -> StoreResult<Link> {
        let _guard = self.lock.lock().await;
        let mut links = self.links(Access::Write).await?;
        links.push(link.clone());
        self.write_records(LINKS_FILE, &links).await?;
        Ok(link.clone())
    }

    async fn update_link(&self, id: &str, patch: &LinkPatch) -> StoreResult<Link> {
        let _guard = self.lock.lock().await;
        let mut links = self.links(Access::Write).await?;
        let index =
            position_of(&links, id, |l| l.id.as_str()).ok_or_else(|| StoreError::not_found("Link"))?;

        patch.apply(&mut links[index], models::now());
        let updated = links[index].clone();
        self.write_records(LINKS_FILE, &links).await?;
        Ok(updated)
    }

    async fn delete_link(&self, id: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut links = self.links(Access::Write).await?;
        let before = links.len();
        links.retain(|l| l.id != id);
        if links.len() == before {
            return Err(StoreError::not_found("Link"));
        }
        self.write_records(LINKS_FILE, &links).await
    }

    async fn create_feedback(&self, feedback: &Feedback) -> StoreResult<Feedback> {
        let _guard = self.lock.lock().await;
        let mut entries = self
            .read_records(FEEDBACK_FILE, Access::Write, mapper::feedback_from_row)
            .await?;
        entries.push(feedback.clone());
        self.write_records(FEEDBACK_FILE, &entries).await?;
        Ok(feedback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CreateAdminUserRequest, CreateCategoryRequest, CreateLinkRequest, CreateSkillRequest,
        SkillStatus,
    };
    use chrono::Duration;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("data"));
        (dir, store)
    }

    fn category(slug: &str) -> Category {
        CreateCategoryRequest {
            name: Some(slug.to_uppercase()),
            slug: Some(slug.to_string()),
            ..Default::default()
        }
        .into_category(models::now())
    }

    fn skill(title: &str, status: &str) -> Skill {
        CreateSkillRequest {
            title: Some(title.to_string()),
            content: Some(format!("About {}", title)),
            category_id: Some("cat-1".to_string()),
            status: Some(status.to_string()),
            ..Default::default()
        }
        .into_skill(models::now())
    }

    fn admin(username: &str, email: &str) -> AdminUser {
        CreateAdminUserRequest {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some("secret1".to_string()),
            ..Default::default()
        }
        .into_admin_user("hash".to_string(), models::now())
    }

    #[tokio::test]
    async fn test_missing_files_are_created_empty() {
        let (_dir, store) = store();

        let categories = store.list_categories(&CategoryQuery::default()).await.unwrap();
        assert!(categories.is_empty());

        let raw = std::fs::read_to_string(store.dir().join(CATEGORIES_FILE)).unwrap();
        assert_eq!(raw, "[]");
    }

    #[tokio::test]
    async fn test_invalid_file_reads_as_empty() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.dir().join(SKILLS_FILE), "{ not json").unwrap();
        std::fs::write(store.dir().join(LINKS_FILE), r#"{"id":"x"}"#).unwrap();

        let page = store.list_skills(&SkillQuery::default()).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(store.list_links(&LinkQuery::default()).await.unwrap().is_empty());

        assert!(matches!(
            store.create_skill(&skill("Fresh", "draft")).await,
            Err(StoreError::Io(_))
        ));
        let raw = std::fs::read_to_string(store.dir().join(SKILLS_FILE)).unwrap();
        assert_eq!(raw, "{ not json");
    }

    #[tokio::test]
    async fn test_writes_keep_unreadable_entries_on_disk() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(
            store.dir().join(SKILLS_FILE),
            json!([
                { "id": "s1", "title": "Kept", "status": "published" },
                { "title": "Missing id" }
            ])
            .to_string(),
        )
        .unwrap();

        let page = store.list_skills(&SkillQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Kept");

        let result = store.create_skill(&skill("Fresh", "draft")).await;
        assert!(matches!(result, Err(StoreError::Io(ref m)) if m.contains("1 unreadable")));
        assert!(store.delete_skill("s1").await.is_err());

        let raw = std::fs::read_to_string(store.dir().join(SKILLS_FILE)).unwrap();
        assert!(raw.contains("Missing id"));
        assert!(raw.contains("Kept"));
        assert!(!raw.contains("Fresh"));
    }

    #[tokio::test]
    async fn test_category_crud_and_slug_conflict() {
        let (_dir, store) = store();

        let created = store.create_category(&category("frontend")).await.unwrap();
        let conflict = store.create_category(&category("frontend")).await;
        assert!(matches!(conflict, Err(StoreError::Conflict(_))));

        let other = store.create_category(&category("backend")).await.unwrap();
        let clash = CategoryPatch {
            slug: Some("frontend".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_category(&other.id, &clash).await,
            Err(StoreError::Conflict(_))
        ));

        let rename = CategoryPatch {
            name: Some("Web".to_string()),
            ..Default::default()
        };
        let updated = store.update_category(&created.id, &rename).await.unwrap();
        assert_eq!(updated.name, "Web");
        assert_eq!(updated.slug, "frontend");

        store.delete_category(&created.id).await.unwrap();
        assert!(matches!(
            store.delete_category(&created.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_categories_ordered_and_filtered() {
        let (_dir, store) = store();

        let mut late = category("late");
        late.sort_order = 5;
        let mut hidden = category("hidden");
        hidden.is_active = false;
        let mut first = category("first");
        first.sort_order = 1;

        for c in [&late, &hidden, &first] {
            store.create_category(c).await.unwrap();
        }

        let active = store
            .list_categories(&CategoryQuery {
                active_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let slugs: Vec<&str> = active.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["first", "late"]);

        let searched = store
            .list_categories(&CategoryQuery {
                q: Some("HIDD".to_string()),
                active_only: false,
            })
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
    }

    #[tokio::test]
    async fn test_skill_writes_are_visible_to_reads() {
        let (_dir, store) = store();

        let created = store.create_skill(&skill("Rust async", "published")).await.unwrap();
        let fetched = store.get_skill(&created.id).await.unwrap();
        assert_eq!(fetched, created);

        let patch = SkillPatch {
            status: Some(SkillStatus::Archived),
            tags: Some(vec!["tokio".to_string()]),
            ..Default::default()
        };
        let updated = store.update_skill(&created.id, &patch).await.unwrap();
        assert_eq!(updated.status, SkillStatus::Archived);
        assert_eq!(store.get_skill(&created.id).await.unwrap().tags, vec!["tokio".to_string()]);

        let bumped = store.increment_skill_downloads(&created.id).await.unwrap();
        assert_eq!(bumped.download_count, 1);

        store.delete_skill(&created.id).await.unwrap();
        assert!(matches!(store.get_skill(&created.id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.delete_skill(&created.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_skills_pages_newest_first() {
        let (_dir, store) = store();
        let base = models::now();

        for (i, status) in ["published", "draft", "published", "published"].iter().enumerate() {
            let mut s = skill(&format!("Skill {}", i), status);
            s.created_at = base + Duration::minutes(i as i64);
            store.create_skill(&s).await.unwrap();
        }

        let page = store
            .list_skills(&SkillQuery {
                offset: 1,
                limit: Some(1),
                ..SkillQuery::published()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Skill 2");

        let counts = store.skill_status_counts().await.unwrap();
        assert_eq!(counts.published, 3);
        assert_eq!(counts.draft, 1);
        assert_eq!(counts.total, 4);
    }

    #[tokio::test]
    async fn test_admin_user_conflicts() {
        let (_dir, store) = store();

        let first = store.create_admin_user(&admin("alice", "alice@example.com")).await.unwrap();
        assert!(matches!(
            store.create_admin_user(&admin("alice", "other@example.com")).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store.create_admin_user(&admin("bob", "ALICE@example.com")).await,
            Err(StoreError::Conflict(_))
        ));

        let bob = store.create_admin_user(&admin("bob", "bob@example.com")).await.unwrap();
        let steal = AdminUserPatch {
            username: Some("alice".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_admin_user(&bob.id, &steal).await,
            Err(StoreError::Conflict(_))
        ));

        // Re-saving your own username is not a conflict.
        let same = AdminUserPatch {
            username: Some("alice".to_string()),
            ..Default::default()
        };
        assert!(store.update_admin_user(&first.id, &same).await.is_ok());

        store.record_admin_login(&first.id).await.unwrap();
        let found = store.find_admin_user("alice").await.unwrap().unwrap();
        assert!(found.last_login_at.is_some());
        assert_eq!(found.password_hash.as_deref(), Some("hash"));
        assert!(store.find_admin_user("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_links_and_feedback() {
        let (_dir, store) = store();

        let link = CreateLinkRequest {
            name: Some("Rust".to_string()),
            url: Some("https://www.rust-lang.org".to_string()),
            enabled: Some(false),
            ..Default::default()
        }
        .into_link(models::now());
        store.create_link(&link).await.unwrap();

        let enabled = store
            .list_links(&LinkQuery {
                enabled_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(enabled.is_empty());
        assert_eq!(store.list_links(&LinkQuery::default()).await.unwrap().len(), 1);

        let feedback = Feedback {
            id: models::new_id(),
            content: "hello".to_string(),
            contact: None,
            page_url: None,
            created_at: models::now(),
        };
        store.create_feedback(&feedback).await.unwrap();
        let raw = std::fs::read_to_string(store.dir().join(FEEDBACK_FILE)).unwrap();
        assert!(raw.contains("hello"));
    }

    #[tokio::test]
    async fn test_registered_users_and_legacy_skill_shape() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(
            store.dir().join(REGISTERED_USERS_FILE),
            json!([
                { "id": "u1", "username": "octocat", "avatar_url": "https://a/1.png" },
                { "id": "u2", "username": "hubot" }
            ])
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            store.dir().join(SKILLS_FILE),
            json!([{ "id": "s1", "name": "Legacy", "status": "published", "tags": "a,b" }]).to_string(),
        )
        .unwrap();

        let users = store
            .registered_users_by_ids(&["u2".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "hubot");

        let legacy = store.get_skill("s1").await.unwrap();
        assert_eq!(legacy.title, "Legacy");
        assert_eq!(legacy.tags, vec!["a".to_string(), "b".to_string()]);
    }
}
