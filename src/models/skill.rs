use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mapper::{self, double_option};

use super::{check_length, new_id, optional_text, required_text};

/// Publication state of a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl SkillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillStatus::Draft => "draft",
            SkillStatus::Published => "published",
            SkillStatus::Archived => "archived",
        }
    }

    /// Accepts the canonical names plus the legacy `active`/`inactive` values
    /// found in older seed data.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" | "inactive" => Some(SkillStatus::Draft),
            "published" | "active" => Some(SkillStatus::Published),
            "archived" => Some(SkillStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(DifficultyLevel::Beginner),
            "intermediate" => Some(DifficultyLevel::Intermediate),
            "advanced" => Some(DifficultyLevel::Advanced),
            _ => None,
        }
    }
}

/// A catalog entry: an article or resource describing one learnable skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub content_en: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    /// Author; the hosted table calls this `author_id`.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub difficulty_level: DifficultyLevel,
    #[serde(default)]
    pub estimated_time: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub status: SkillStatus,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub recommended: bool,
    #[serde(default)]
    pub git_url: Option<String>,
    #[serde(default)]
    pub install_command: Option<String>,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub download_count: i64,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Skill {
    /// Text fields searched by the `q` filter.
    pub fn searchable_text(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.title.as_str()),
            self.title_en.as_deref(),
            self.description.as_deref(),
            self.description_en.as_deref(),
            Some(self.content.as_str()),
            self.content_en.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Body of `POST /api/admin/skills`.
///
/// `tags` and `prerequisites` stay untyped here so that a comma-separated
/// string, a string array and an array of `{ "name": .. }` objects are all
/// accepted.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSkillRequest {
    pub title: Option<String>,
    pub title_en: Option<String>,
    pub description: Option<String>,
    pub description_en: Option<String>,
    pub content: Option<String>,
    pub content_en: Option<String>,
    pub category_id: Option<String>,
    #[serde(alias = "author_id")]
    pub user_id: Option<String>,
    pub author_name: Option<String>,
    pub difficulty_level: Option<String>,
    pub estimated_time: Option<i32>,
    pub tags: Option<Value>,
    pub prerequisites: Option<Value>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    pub recommended: Option<bool>,
    pub git_url: Option<String>,
    pub install_command: Option<String>,
}

impl CreateSkillRequest {
    pub fn validate(&self) -> Result<(), String> {
        let title = required_text(&self.title, "title")?;
        check_length(&title, "Title", 200)?;
        required_text(&self.content, "content")?;
        required_text(&self.category_id, "category_id")?;

        if let Some(ref status) = self.status {
            if SkillStatus::parse(status).is_none() {
                return Err(format!("Unknown status: {}", status));
            }
        }

        if let Some(ref level) = self.difficulty_level {
            if DifficultyLevel::parse(level).is_none() {
                return Err(format!("Unknown difficulty_level: {}", level));
            }
        }

        if let Some(minutes) = self.estimated_time {
            if minutes < 0 {
                return Err("estimated_time cannot be negative".to_string());
            }
        }

        Ok(())
    }

    /// Build the record to insert. Call `validate` first.
    pub fn into_skill(self, now: DateTime<Utc>) -> Skill {
        let status = self
            .status
            .as_deref()
            .and_then(SkillStatus::parse)
            .unwrap_or_default();

        Skill {
            id: new_id(),
            title: self.title.unwrap_or_default().trim().to_string(),
            title_en: optional_text(self.title_en),
            description: optional_text(self.description),
            description_en: optional_text(self.description_en),
            content: self.content.unwrap_or_default(),
            content_en: optional_text(self.content_en),
            category_id: optional_text(self.category_id),
            user_id: optional_text(self.user_id),
            author_name: optional_text(self.author_name),
            difficulty_level: self
                .difficulty_level
                .as_deref()
                .and_then(DifficultyLevel::parse)
                .unwrap_or_default(),
            estimated_time: self.estimated_time,
            tags: self.tags.as_ref().map(mapper::normalize_tags).unwrap_or_default(),
            prerequisites: self
                .prerequisites
                .as_ref()
                .map(mapper::coerce_string_list)
                .unwrap_or_default(),
            status,
            featured: self.featured.unwrap_or(false),
            recommended: self.recommended.unwrap_or(false),
            git_url: optional_text(self.git_url),
            install_command: optional_text(self.install_command),
            view_count: 0,
            like_count: 0,
            download_count: 0,
            published_at: mapper::derive_published_at(status, now),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `PUT /api/admin/skills/:id`. Absent fields are left untouched;
/// an explicit `null` clears a nullable field.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSkillRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub title_en: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description_en: Option<Option<String>>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub content_en: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub author_name: Option<Option<String>>,
    pub difficulty_level: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub estimated_time: Option<Option<i32>>,
    pub tags: Option<Value>,
    pub prerequisites: Option<Value>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    pub recommended: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub git_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub install_command: Option<Option<String>>,
}

/// Typed, normalized change set for one skill.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillPatch {
    pub title: Option<String>,
    pub title_en: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub description_en: Option<Option<String>>,
    pub content: Option<String>,
    pub content_en: Option<Option<String>>,
    pub category_id: Option<Option<String>>,
    pub author_name: Option<Option<String>>,
    pub difficulty_level: Option<DifficultyLevel>,
    pub estimated_time: Option<Option<i32>>,
    pub tags: Option<Vec<String>>,
    pub prerequisites: Option<Vec<String>>,
    pub status: Option<SkillStatus>,
    pub featured: Option<bool>,
    pub recommended: Option<bool>,
    pub git_url: Option<Option<String>>,
    pub install_command: Option<Option<String>>,
}

impl UpdateSkillRequest {
    pub fn into_patch(self) -> Result<SkillPatch, String> {
        let title = match self.title {
            Some(title) => {
                let title = required_text(&Some(title), "title")?;
                check_length(&title, "Title", 200)?;
                Some(title)
            }
            None => None,
        };

        if let Some(ref content) = self.content {
            if content.trim().is_empty() {
                return Err("Content cannot be empty".to_string());
            }
        }

        let status = match self.status {
            Some(ref raw) => Some(
                SkillStatus::parse(raw).ok_or_else(|| format!("Unknown status: {}", raw))?,
            ),
            None => None,
        };

        let difficulty_level = match self.difficulty_level {
            Some(ref raw) => Some(
                DifficultyLevel::parse(raw)
                    .ok_or_else(|| format!("Unknown difficulty_level: {}", raw))?,
            ),
            None => None,
        };

        Ok(SkillPatch {
            title,
            title_en: self.title_en.map(optional_text),
            description: self.description.map(optional_text),
            description_en: self.description_en.map(optional_text),
            content: self.content,
            content_en: self.content_en.map(optional_text),
            category_id: self.category_id.map(optional_text),
            author_name: self.author_name.map(optional_text),
            difficulty_level,
            estimated_time: self.estimated_time,
            tags: self.tags.as_ref().map(mapper::normalize_tags),
            prerequisites: self.prerequisites.as_ref().map(mapper::coerce_string_list),
            status,
            featured: self.featured,
            recommended: self.recommended,
            git_url: self.git_url.map(optional_text),
            install_command: self.install_command.map(optional_text),
        })
    }
}

impl SkillPatch {
    /// Apply the change set in memory. Moving to `published` re-stamps
    /// `published_at`, the same as the hosted column mapping does.
    pub fn apply(&self, skill: &mut Skill, now: DateTime<Utc>) {
        if let Some(ref title) = self.title {
            skill.title = title.clone();
        }
        if let Some(ref value) = self.title_en {
            skill.title_en = value.clone();
        }
        if let Some(ref value) = self.description {
            skill.description = value.clone();
        }
        if let Some(ref value) = self.description_en {
            skill.description_en = value.clone();
        }
        if let Some(ref content) = self.content {
            skill.content = content.clone();
        }
        if let Some(ref value) = self.content_en {
            skill.content_en = value.clone();
        }
        if let Some(ref value) = self.category_id {
            skill.category_id = value.clone();
        }
        if let Some(ref value) = self.author_name {
            skill.author_name = value.clone();
        }
        if let Some(level) = self.difficulty_level {
            skill.difficulty_level = level;
        }
        if let Some(value) = self.estimated_time {
            skill.estimated_time = value;
        }
        if let Some(ref tags) = self.tags {
            skill.tags = tags.clone();
        }
        if let Some(ref prerequisites) = self.prerequisites {
            skill.prerequisites = prerequisites.clone();
        }
        if let Some(status) = self.status {
            skill.status = status;
            if let Some(stamp) = mapper::derive_published_at(status, now) {
                skill.published_at = Some(stamp);
            }
        }
        if let Some(featured) = self.featured {
            skill.featured = featured;
        }
        if let Some(recommended) = self.recommended {
            skill.recommended = recommended;
        }
        if let Some(ref value) = self.git_url {
            skill.git_url = value.clone();
        }
        if let Some(ref value) = self.install_command {
            skill.install_command = value.clone();
        }

        skill.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    fn create_request() -> CreateSkillRequest {
        CreateSkillRequest {
            title: Some("  Vue 3 Component Guide ".to_string()),
            content: Some("Composition API in depth".to_string()),
            category_id: Some("cat-fe".to_string()),
            tags: Some(json!("vue, frontend, vue")),
            ..Default::default()
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(SkillStatus::parse("Published"), Some(SkillStatus::Published));
        assert_eq!(SkillStatus::parse("active"), Some(SkillStatus::Published));
        assert_eq!(SkillStatus::parse("inactive"), Some(SkillStatus::Draft));
        assert_eq!(SkillStatus::parse("deleted"), None);
        assert_eq!(SkillStatus::default(), SkillStatus::Draft);
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!(DifficultyLevel::parse(" ADVANCED "), Some(DifficultyLevel::Advanced));
        assert_eq!(DifficultyLevel::parse("expert"), None);
    }

    #[test]
    fn test_create_request_validation() {
        assert!(create_request().validate().is_ok());

        let missing_title = CreateSkillRequest {
            title: None,
            ..create_request()
        };
        assert_eq!(
            missing_title.validate(),
            Err("Missing required field: title".to_string())
        );

        let missing_content = CreateSkillRequest {
            content: Some("   ".to_string()),
            ..create_request()
        };
        assert!(missing_content.validate().is_err());

        let missing_category = CreateSkillRequest {
            category_id: None,
            ..create_request()
        };
        assert!(missing_category.validate().is_err());

        let bad_status = CreateSkillRequest {
            status: Some("deleted".to_string()),
            ..create_request()
        };
        assert!(bad_status.validate().is_err());

        let long_title = CreateSkillRequest {
            title: Some("a".repeat(201)),
            ..create_request()
        };
        assert!(long_title.validate().is_err());
    }

    #[test]
    fn test_into_skill_defaults() {
        let skill = create_request().into_skill(fixed_now());

        assert!(!skill.id.is_empty());
        assert_eq!(skill.title, "Vue 3 Component Guide");
        assert_eq!(skill.tags, vec!["vue".to_string(), "frontend".to_string()]);
        assert_eq!(skill.status, SkillStatus::Draft);
        assert_eq!(skill.difficulty_level, DifficultyLevel::Beginner);
        assert_eq!(skill.published_at, None);
        assert_eq!(skill.created_at, fixed_now());
        assert_eq!(skill.updated_at, fixed_now());
        assert_eq!(skill.download_count, 0);
    }

    #[test]
    fn test_into_skill_published_sets_published_at() {
        let request = CreateSkillRequest {
            status: Some("published".to_string()),
            ..create_request()
        };
        let skill = request.into_skill(fixed_now());
        assert_eq!(skill.status, SkillStatus::Published);
        assert_eq!(skill.published_at, Some(fixed_now()));
    }

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let request: UpdateSkillRequest =
            serde_json::from_value(json!({ "description": null, "featured": true })).unwrap();
        let patch = request.into_patch().unwrap();

        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.title_en, None);
        assert_eq!(patch.featured, Some(true));
    }

    #[test]
    fn test_update_request_rejects_unknown_status() {
        let request: UpdateSkillRequest =
            serde_json::from_value(json!({ "status": "gone" })).unwrap();
        assert!(request.into_patch().is_err());
    }

    #[test]
    fn test_patch_apply() {
        let mut skill = create_request().into_skill(fixed_now());
        let later = fixed_now() + chrono::Duration::hours(1);

        let patch = SkillPatch {
            title: Some("Renamed".to_string()),
            description: Some(Some("New description".to_string())),
            tags: Some(vec!["a".to_string()]),
            status: Some(SkillStatus::Published),
            ..Default::default()
        };
        patch.apply(&mut skill, later);

        assert_eq!(skill.title, "Renamed");
        assert_eq!(skill.description.as_deref(), Some("New description"));
        assert_eq!(skill.tags, vec!["a".to_string()]);
        assert_eq!(skill.status, SkillStatus::Published);
        assert_eq!(skill.published_at, Some(later));
        assert_eq!(skill.created_at, fixed_now());
        assert_eq!(skill.updated_at, later);
    }

    #[test]
    fn test_skill_deserializes_sparse_record() {
        let json = r#"{"id":"1","title":"Python basics","created_at":"2024-01-12T11:15:00Z"}"#;
        let skill: Skill = serde_json::from_str(json).expect("Failed to deserialize skill");

        assert_eq!(skill.id, "1");
        assert_eq!(skill.content, "");
        assert!(skill.tags.is_empty());
        assert_eq!(skill.status, SkillStatus::Draft);
        assert_eq!(skill.updated_at, DateTime::<Utc>::default());
    }
}
