//! Translation between hosted-store rows and the application's records.
//!
//! Hosted tables have drifted over time (`name` vs `title`, `repo_url` vs
//! `git_url`, tags stored as text or JSON). Rows are read as JSON objects and
//! every field is looked up under each of its known column names, so a
//! missing or renamed column degrades to a default instead of failing the
//! whole read. The same readers are used for legacy JSON files.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};
use crate::models::{
    AdminRole, AdminUser, AdminUserPatch, Category, CategoryPatch, CreateSkillRequest,
    DifficultyLevel, Feedback, Link, LinkPatch, RegisteredRole, RegisteredUser, Skill, SkillPatch,
    SkillStatus,
};

/// Title used when a hosted row carries neither `title` nor `name`.
pub const UNTITLED_SKILL: &str = "Untitled skill";

pub type Row = Map<String, Value>;

/// Deserialize a field so that an absent key stays `None` while an explicit
/// `null` becomes `Some(None)`. Pair with `#[serde(default)]`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Normalize a tag value into a clean list.
///
/// Accepts a comma-separated string, an array of strings, an array of
/// `{ "name": .. }` objects, or any mix of the latter two. Entries are
/// trimmed, blanks dropped and duplicates removed keeping the first one.
pub fn normalize_tags(value: &Value) -> Vec<String> {
    let raw: Vec<&str> = match value {
        Value::String(text) => text.split(',').collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.as_str()),
                Value::Object(obj) => obj.get("name").and_then(Value::as_str),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    dedup_trimmed(raw)
}

/// Arrays of strings only; anything else is an empty list.
pub fn coerce_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => dedup_trimmed(items.iter().filter_map(Value::as_str).collect()),
        _ => Vec::new(),
    }
}

fn dedup_trimmed(raw: Vec<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for entry in raw {
        let entry = entry.trim();
        if !entry.is_empty() && !out.iter().any(|existing| existing == entry) {
            out.push(entry.to_string());
        }
    }
    out
}

/// `published_at` to stamp when a record moves to `status`.
pub fn derive_published_at(status: SkillStatus, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match status {
        SkillStatus::Published => Some(now),
        SkillStatus::Draft | SkillStatus::Archived => None,
    }
}

/// Timestamp in the form written to both stores.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    // `timestamp without time zone` columns come back without an offset.
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

// Field readers. Each takes the candidate column names in priority order.

fn lookup<'a>(row: &'a Row, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| row.get(*key))
        .find(|value| !value.is_null())
}

fn text(row: &Row, keys: &[&str]) -> Option<String> {
    match lookup(row, keys)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn non_empty_text(row: &Row, keys: &[&str]) -> Option<String> {
    text(row, keys).filter(|value| !value.trim().is_empty())
}

fn integer(row: &Row, keys: &[&str]) -> Option<i64> {
    match lookup(row, keys)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

fn boolean(row: &Row, keys: &[&str]) -> Option<bool> {
    match lookup(row, keys)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" => Some(true),
            "false" | "f" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn timestamp(row: &Row, keys: &[&str]) -> Option<DateTime<Utc>> {
    lookup(row, keys).and_then(Value::as_str).and_then(parse_timestamp)
}

fn timestamp_or_epoch(row: &Row, keys: &[&str]) -> DateTime<Utc> {
    timestamp(row, keys).unwrap_or_default()
}

fn tags(row: &Row, keys: &[&str]) -> Vec<String> {
    match lookup(row, keys) {
        // Tags stored as serialized JSON text.
        Some(Value::String(text)) if text.trim_start().starts_with('[') => {
            serde_json::from_str::<Value>(text)
                .map(|parsed| normalize_tags(&parsed))
                .unwrap_or_default()
        }
        Some(value) => normalize_tags(value),
        None => Vec::new(),
    }
}

fn string_list(row: &Row, keys: &[&str]) -> Vec<String> {
    match lookup(row, keys) {
        Some(Value::String(text)) => serde_json::from_str::<Value>(text)
            .map(|parsed| coerce_string_list(&parsed))
            .unwrap_or_default(),
        Some(value) => coerce_string_list(value),
        None => Vec::new(),
    }
}

fn as_row(value: &Value) -> StoreResult<&Row> {
    value
        .as_object()
        .ok_or_else(|| StoreError::Backend("hosted row is not a JSON object".to_string()))
}

fn required_id(row: &Row) -> StoreResult<String> {
    non_empty_text(row, &["id"])
        .ok_or_else(|| StoreError::Backend("hosted row has no id".to_string()))
}

fn opt_value<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or(Value::Null)
}

fn opt_timestamp_value(value: Option<&DateTime<Utc>>) -> Value {
    value.map(|ts| Value::String(format_timestamp(ts))).unwrap_or(Value::Null)
}

fn string_array(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

// Skills

pub fn skill_from_row(value: &Value) -> StoreResult<Skill> {
    let row = as_row(value)?;

    Ok(Skill {
        id: required_id(row)?,
        title: non_empty_text(row, &["title", "name"]).unwrap_or_else(|| UNTITLED_SKILL.to_string()),
        title_en: text(row, &["title_en", "name_en"]),
        description: text(row, &["description"]),
        description_en: text(row, &["description_en"]),
        content: text(row, &["content"]).unwrap_or_default(),
        content_en: text(row, &["content_en"]),
        category_id: text(row, &["category_id"]),
        user_id: text(row, &["author_id", "user_id"]),
        author_name: text(row, &["author_name"]),
        difficulty_level: text(row, &["difficulty_level", "difficulty"])
            .and_then(|raw| DifficultyLevel::parse(&raw))
            .unwrap_or_default(),
        estimated_time: integer(row, &["estimated_time"]).and_then(|n| i32::try_from(n).ok()),
        tags: tags(row, &["tags"]),
        prerequisites: string_list(row, &["prerequisites"]),
        status: text(row, &["status"])
            .and_then(|raw| SkillStatus::parse(&raw))
            .unwrap_or_default(),
        featured: boolean(row, &["featured", "is_featured"]).unwrap_or(false),
        recommended: boolean(row, &["recommended", "is_recommended"]).unwrap_or(false),
        git_url: non_empty_text(row, &["git_url", "repo_url", "github_url"]),
        install_command: non_empty_text(row, &["install_command", "install"]),
        view_count: integer(row, &["view_count", "views"]).unwrap_or(0),
        like_count: integer(row, &["like_count", "likes"]).unwrap_or(0),
        download_count: integer(row, &["download_count", "downloads"]).unwrap_or(0),
        published_at: timestamp(row, &["published_at"]),
        created_at: timestamp_or_epoch(row, &["created_at"]),
        updated_at: timestamp_or_epoch(row, &["updated_at", "created_at"]),
    })
}

/// Hosted column set for a new skill.
pub fn skill_columns(skill: &Skill) -> Row {
    let mut row = Row::new();
    row.insert("id".into(), skill.id.clone().into());
    row.insert("name".into(), skill.title.clone().into());
    row.insert("title_en".into(), opt_value(skill.title_en.clone()));
    row.insert("description".into(), opt_value(skill.description.clone()));
    row.insert("description_en".into(), opt_value(skill.description_en.clone()));
    row.insert("content".into(), skill.content.clone().into());
    row.insert("content_en".into(), opt_value(skill.content_en.clone()));
    row.insert("category_id".into(), opt_value(skill.category_id.clone()));
    row.insert("author_id".into(), opt_value(skill.user_id.clone()));
    row.insert("author_name".into(), opt_value(skill.author_name.clone()));
    row.insert("difficulty_level".into(), skill.difficulty_level.as_str().into());
    row.insert("estimated_time".into(), opt_value(skill.estimated_time));
    row.insert("tags".into(), string_array(&skill.tags));
    row.insert("prerequisites".into(), string_array(&skill.prerequisites));
    row.insert("status".into(), skill.status.as_str().into());
    row.insert("featured".into(), skill.featured.into());
    row.insert("recommended".into(), skill.recommended.into());
    row.insert("repo_url".into(), opt_value(skill.git_url.clone()));
    row.insert("install_command".into(), opt_value(skill.install_command.clone()));
    row.insert("view_count".into(), skill.view_count.into());
    row.insert("like_count".into(), skill.like_count.into());
    row.insert("download_count".into(), skill.download_count.into());
    row.insert("published_at".into(), opt_timestamp_value(skill.published_at.as_ref()));
    row.insert("created_at".into(), format_timestamp(&skill.created_at).into());
    row.insert("updated_at".into(), format_timestamp(&skill.updated_at).into());
    row
}

/// Hosted columns touched by an update. Always includes `updated_at`.
pub fn skill_patch_columns(patch: &SkillPatch, now: DateTime<Utc>) -> Row {
    let mut row = Row::new();
    if let Some(ref title) = patch.title {
        row.insert("name".into(), title.clone().into());
    }
    if let Some(ref value) = patch.title_en {
        row.insert("title_en".into(), opt_value(value.clone()));
    }
    if let Some(ref value) = patch.description {
        row.insert("description".into(), opt_value(value.clone()));
    }
    if let Some(ref value) = patch.description_en {
        row.insert("description_en".into(), opt_value(value.clone()));
    }
    if let Some(ref content) = patch.content {
        row.insert("content".into(), content.clone().into());
    }
    if let Some(ref value) = patch.content_en {
        row.insert("content_en".into(), opt_value(value.clone()));
    }
    if let Some(ref value) = patch.category_id {
        row.insert("category_id".into(), opt_value(value.clone()));
    }
    if let Some(ref value) = patch.author_name {
        row.insert("author_name".into(), opt_value(value.clone()));
    }
    if let Some(level) = patch.difficulty_level {
        row.insert("difficulty_level".into(), level.as_str().into());
    }
    if let Some(value) = patch.estimated_time {
        row.insert("estimated_time".into(), opt_value(value));
    }
    if let Some(ref tags) = patch.tags {
        row.insert("tags".into(), string_array(tags));
    }
    if let Some(ref prerequisites) = patch.prerequisites {
        row.insert("prerequisites".into(), string_array(prerequisites));
    }
    if let Some(status) = patch.status {
        row.insert("status".into(), status.as_str().into());
        if let Some(stamp) = derive_published_at(status, now) {
            row.insert("published_at".into(), format_timestamp(&stamp).into());
        }
    }
    if let Some(featured) = patch.featured {
        row.insert("featured".into(), featured.into());
    }
    if let Some(recommended) = patch.recommended {
        row.insert("recommended".into(), recommended.into());
    }
    if let Some(ref value) = patch.git_url {
        row.insert("repo_url".into(), opt_value(value.clone()));
    }
    if let Some(ref value) = patch.install_command {
        row.insert("install_command".into(), opt_value(value.clone()));
    }
    row.insert("updated_at".into(), format_timestamp(&now).into());
    row
}

/// Read a loosely shaped skill object (seed files, legacy exports) into a
/// create request, honouring the same column aliases as hosted rows.
pub fn skill_request_from_value(value: &Value) -> StoreResult<CreateSkillRequest> {
    let row = as_row(value)?;

    Ok(CreateSkillRequest {
        title: non_empty_text(row, &["title", "name"]),
        title_en: text(row, &["title_en", "name_en"]),
        description: text(row, &["description"]),
        description_en: text(row, &["description_en"]),
        content: non_empty_text(row, &["content", "description"]),
        content_en: text(row, &["content_en"]),
        category_id: text(row, &["category_id"]),
        user_id: text(row, &["author_id", "user_id"]),
        author_name: text(row, &["author_name", "author"]),
        difficulty_level: text(row, &["difficulty_level", "difficulty"]),
        estimated_time: integer(row, &["estimated_time"]).and_then(|n| i32::try_from(n).ok()),
        tags: lookup(row, &["tags"]).map(|_| Value::from(tags(row, &["tags"]))),
        prerequisites: lookup(row, &["prerequisites"])
            .map(|_| Value::from(string_list(row, &["prerequisites"]))),
        status: text(row, &["status"]),
        featured: boolean(row, &["featured", "is_featured"]),
        recommended: boolean(row, &["recommended", "is_recommended"]),
        git_url: non_empty_text(row, &["git_url", "repo_url", "github_url"]),
        install_command: non_empty_text(row, &["install_command", "install"]),
    })
}

// Categories

pub fn category_from_row(value: &Value) -> StoreResult<Category> {
    let row = as_row(value)?;

    Ok(Category {
        id: required_id(row)?,
        name: text(row, &["name"]).unwrap_or_default(),
        name_en: text(row, &["name_en"]),
        slug: text(row, &["slug"]).unwrap_or_default(),
        description: text(row, &["description"]),
        description_en: text(row, &["description_en"]),
        is_active: boolean(row, &["is_active", "active"]).unwrap_or(true),
        sort_order: integer(row, &["sort_order"])
            .and_then(|n| i32::try_from(n).ok())
            .unwrap_or(0),
        created_at: timestamp_or_epoch(row, &["created_at"]),
        updated_at: timestamp_or_epoch(row, &["updated_at", "created_at"]),
    })
}

pub fn category_columns(category: &Category) -> Row {
    let mut row = Row::new();
    row.insert("id".into(), category.id.clone().into());
    row.insert("name".into(), category.name.clone().into());
    row.insert("name_en".into(), opt_value(category.name_en.clone()));
    row.insert("slug".into(), category.slug.clone().into());
    row.insert("description".into(), opt_value(category.description.clone()));
    row.insert("description_en".into(), opt_value(category.description_en.clone()));
    row.insert("is_active".into(), category.is_active.into());
    row.insert("sort_order".into(), category.sort_order.into());
    row.insert("created_at".into(), format_timestamp(&category.created_at).into());
    row.insert("updated_at".into(), format_timestamp(&category.updated_at).into());
    row
}

pub fn category_patch_columns(patch: &CategoryPatch, now: DateTime<Utc>) -> Row {
    let mut row = Row::new();
    if let Some(ref name) = patch.name {
        row.insert("name".into(), name.clone().into());
    }
    if let Some(ref value) = patch.name_en {
        row.insert("name_en".into(), opt_value(value.clone()));
    }
    if let Some(ref slug) = patch.slug {
        row.insert("slug".into(), slug.clone().into());
    }
    if let Some(ref value) = patch.description {
        row.insert("description".into(), opt_value(value.clone()));
    }
    if let Some(ref value) = patch.description_en {
        row.insert("description_en".into(), opt_value(value.clone()));
    }
    if let Some(active) = patch.is_active {
        row.insert("is_active".into(), active.into());
    }
    if let Some(order) = patch.sort_order {
        row.insert("sort_order".into(), order.into());
    }
    row.insert("updated_at".into(), format_timestamp(&now).into());
    row
}

// Admin users

pub fn admin_user_from_row(value: &Value) -> StoreResult<AdminUser> {
    let row = as_row(value)?;

    Ok(AdminUser {
        id: required_id(row)?,
        username: text(row, &["username"]).unwrap_or_default(),
        email: text(row, &["email"]).unwrap_or_default(),
        password_hash: non_empty_text(row, &["password_hash", "password"]),
        role: text(row, &["role"])
            .and_then(|raw| AdminRole::parse(&raw))
            .unwrap_or_default(),
        is_active: boolean(row, &["is_active", "active"]).unwrap_or(true),
        last_login_at: timestamp(row, &["last_login_at", "last_login"]),
        created_at: timestamp_or_epoch(row, &["created_at"]),
        updated_at: timestamp_or_epoch(row, &["updated_at", "created_at"]),
    })
}

pub fn admin_user_columns(user: &AdminUser) -> Row {
    let mut row = Row::new();
    row.insert("id".into(), user.id.clone().into());
    row.insert("username".into(), user.username.clone().into());
    row.insert("email".into(), user.email.clone().into());
    row.insert("password_hash".into(), opt_value(user.password_hash.clone()));
    row.insert("role".into(), user.role.as_str().into());
    row.insert("is_active".into(), user.is_active.into());
    row.insert("last_login_at".into(), opt_timestamp_value(user.last_login_at.as_ref()));
    row.insert("created_at".into(), format_timestamp(&user.created_at).into());
    row.insert("updated_at".into(), format_timestamp(&user.updated_at).into());
    row
}

pub fn admin_user_patch_columns(patch: &AdminUserPatch, now: DateTime<Utc>) -> Row {
    let mut row = Row::new();
    if let Some(ref username) = patch.username {
        row.insert("username".into(), username.clone().into());
    }
    if let Some(ref email) = patch.email {
        row.insert("email".into(), email.clone().into());
    }
    if let Some(ref hash) = patch.password_hash {
        row.insert("password_hash".into(), hash.clone().into());
    }
    if let Some(role) = patch.role {
        row.insert("role".into(), role.as_str().into());
    }
    if let Some(active) = patch.is_active {
        row.insert("is_active".into(), active.into());
    }
    row.insert("updated_at".into(), format_timestamp(&now).into());
    row
}

// Registered users

pub fn registered_user_from_row(value: &Value) -> StoreResult<RegisteredUser> {
    let row = as_row(value)?;

    Ok(RegisteredUser {
        id: required_id(row)?,
        github_id: text(row, &["github_id"]),
        username: text(row, &["username", "login", "name"]).unwrap_or_default(),
        email: text(row, &["email"]),
        avatar_url: text(row, &["avatar_url", "avatar"]),
        github_url: text(row, &["github_url", "html_url"]),
        role: match text(row, &["role"]).as_deref() {
            Some("admin") => RegisteredRole::Admin,
            _ => RegisteredRole::Normal,
        },
        created_at: timestamp_or_epoch(row, &["created_at"]),
        updated_at: timestamp_or_epoch(row, &["updated_at", "created_at"]),
    })
}

// Links

pub fn link_from_row(value: &Value) -> StoreResult<Link> {
    let row = as_row(value)?;

    Ok(Link {
        id: required_id(row)?,
        name: text(row, &["name", "title"]).unwrap_or_default(),
        url: text(row, &["url"]).unwrap_or_default(),
        description: text(row, &["description"]),
        logo_url: text(row, &["logo_url", "logo"]),
        enabled: boolean(row, &["enabled", "is_active"]).unwrap_or(true),
        sort_order: integer(row, &["sort_order"])
            .and_then(|n| i32::try_from(n).ok())
            .unwrap_or(0),
        created_at: timestamp_or_epoch(row, &["created_at"]),
        updated_at: timestamp_or_epoch(row, &["updated_at", "created_at"]),
    })
}

pub fn link_columns(link: &Link) -> Row {
    let mut row = Row::new();
    row.insert("id".into(), link.id.clone().into());
    row.insert("name".into(), link.name.clone().into());
    row.insert("url".into(), link.url.clone().into());
    row.insert("description".into(), opt_value(link.description.clone()));
    row.insert("logo_url".into(), opt_value(link.logo_url.clone()));
    row.insert("enabled".into(), link.enabled.into());
    row.insert("sort_order".into(), link.sort_order.into());
    row.insert("created_at".into(), format_timestamp(&link.created_at).into());
    row.insert("updated_at".into(), format_timestamp(&link.updated_at).into());
    row
}

pub fn link_patch_columns(patch: &LinkPatch, now: DateTime<Utc>) -> Row {
    let mut row = Row::new();
    if let Some(ref name) = patch.name {
        row.insert("name".into(), name.clone().into());
    }
    if let Some(ref url) = patch.url {
        row.insert("url".into(), url.clone().into());
    }
    if let Some(ref value) = patch.description {
        row.insert("description".into(), opt_value(value.clone()));
    }
    if let Some(ref value) = patch.logo_url {
        row.insert("logo_url".into(), opt_value(value.clone()));
    }
    if let Some(enabled) = patch.enabled {
        row.insert("enabled".into(), enabled.into());
    }
    if let Some(order) = patch.sort_order {
        row.insert("sort_order".into(), order.into());
    }
    row.insert("updated_at".into(), format_timestamp(&now).into());
    row
}

// Feedback

pub fn feedback_from_row(value: &Value) -> StoreResult<Feedback> {
    let row = as_row(value)?;

    Ok(Feedback {
        id: required_id(row)?,
        content: text(row, &["content", "message"]).unwrap_or_default(),
        contact: text(row, &["contact", "email"]),
        page_url: text(row, &["page_url", "page"]),
        created_at: timestamp_or_epoch(row, &["created_at"]),
    })
}

pub fn feedback_columns(feedback: &Feedback) -> Row {
    let mut row = Row::new();
    row.insert("id".into(), feedback.id.clone().into());
    row.insert("content".into(), feedback.content.clone().into());
    row.insert("contact".into(), opt_value(feedback.contact.clone()));
    row.insert("page_url".into(), opt_value(feedback.page_url.clone()));
    row.insert("created_at".into(), format_timestamp(&feedback.created_at).into());
    row
}
