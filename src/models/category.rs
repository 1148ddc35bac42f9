use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mapper::double_option;

use super::{check_length, new_id, optional_text, required_text};

/// スキルを分類するカテゴリ。`slug` はストア全体で一意。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// カテゴリ作成 API の入力。
#[derive(Debug, Default, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
    pub name_en: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub description_en: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

/// カテゴリ更新 API の入力。`null` を明示した項目はクリアされる。
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub name_en: Option<Option<String>>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description_en: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub name_en: Option<Option<String>>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub description_en: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

impl CreateCategoryRequest {
    /// 名前と slug は必須。slug は小文字英数字とハイフンのみ許可する。
    pub fn validate(&self) -> Result<(), String> {
        let name = required_text(&self.name, "name")?;
        check_length(&name, "Name", 100)?;

        let slug = required_text(&self.slug, "slug")?;
        validate_slug(&slug)?;

        Ok(())
    }

    pub fn into_category(self, now: DateTime<Utc>) -> Category {
        Category {
            id: new_id(),
            name: self.name.unwrap_or_default().trim().to_string(),
            name_en: optional_text(self.name_en),
            slug: self.slug.unwrap_or_default().trim().to_string(),
            description: optional_text(self.description),
            description_en: optional_text(self.description_en),
            is_active: self.is_active.unwrap_or(true),
            sort_order: self.sort_order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        }
    }
}

impl UpdateCategoryRequest {
    pub fn into_patch(self) -> Result<CategoryPatch, String> {
        let name = match self.name {
            Some(name) => {
                let name = required_text(&Some(name), "name")?;
                check_length(&name, "Name", 100)?;
                Some(name)
            }
            None => None,
        };

        let slug = match self.slug {
            Some(slug) => {
                let slug = required_text(&Some(slug), "slug")?;
                validate_slug(&slug)?;
                Some(slug)
            }
            None => None,
        };

        Ok(CategoryPatch {
            name,
            name_en: self.name_en.map(optional_text),
            slug,
            description: self.description.map(optional_text),
            description_en: self.description_en.map(optional_text),
            is_active: self.is_active,
            sort_order: self.sort_order,
        })
    }
}

impl CategoryPatch {
    pub fn apply(&self, category: &mut Category, now: DateTime<Utc>) {
        if let Some(ref name) = self.name {
            category.name = name.clone();
        }
        if let Some(ref value) = self.name_en {
            category.name_en = value.clone();
        }
        if let Some(ref slug) = self.slug {
            category.slug = slug.clone();
        }
        if let Some(ref value) = self.description {
            category.description = value.clone();
        }
        if let Some(ref value) = self.description_en {
            category.description_en = value.clone();
        }
        if let Some(active) = self.is_active {
            category.is_active = active;
        }
        if let Some(order) = self.sort_order {
            category.sort_order = order;
        }

        category.updated_at = now;
    }
}

fn validate_slug(slug: &str) -> Result<(), String> {
    check_length(slug, "Slug", 100)?;

    let valid = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(
            "Slug may only contain lowercase letters, digits and hyphens".to_string(),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> CreateCategoryRequest {
        CreateCategoryRequest {
            name: Some("前端开发".to_string()),
            name_en: Some("Frontend".to_string()),
            slug: Some("frontend".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_category_request_validation() {
        assert!(request().validate().is_ok());

        let missing_name = CreateCategoryRequest {
            name: Some(" ".to_string()),
            ..request()
        };
        assert!(missing_name.validate().is_err());

        let missing_slug = CreateCategoryRequest {
            slug: None,
            ..request()
        };
        assert_eq!(
            missing_slug.validate(),
            Err("Missing required field: slug".to_string())
        );

        let bad_slug = CreateCategoryRequest {
            slug: Some("Front End".to_string()),
            ..request()
        };
        assert!(bad_slug.validate().is_err());
    }

    #[test]
    fn test_into_category_defaults() {
        let now = crate::models::now();
        let category = request().into_category(now);

        assert!(category.is_active);
        assert_eq!(category.sort_order, 0);
        assert_eq!(category.slug, "frontend");
        assert_eq!(category.created_at, now);
    }

    #[test]
    fn test_update_patch_and_apply() {
        let now = crate::models::now();
        let mut category = request().into_category(now);

        let update: UpdateCategoryRequest =
            serde_json::from_value(json!({ "name_en": null, "sort_order": 3 })).unwrap();
        let patch = update.into_patch().unwrap();
        patch.apply(&mut category, now);

        assert_eq!(category.name_en, None);
        assert_eq!(category.sort_order, 3);
        assert_eq!(category.name, "前端开发");
    }

    #[test]
    fn test_update_rejects_bad_slug() {
        let update: UpdateCategoryRequest =
            serde_json::from_value(json!({ "slug": "UPPER" })).unwrap();
        assert!(update.into_patch().is_err());
    }

    #[test]
    fn test_category_deserialization_defaults() {
        let json = r#"{"id":"c1","name":"AI","slug":"ai"}"#;
        let category: Category = serde_json::from_str(json).expect("Failed to deserialize category");

        assert!(category.is_active);
        assert_eq!(category.sort_order, 0);
        assert_eq!(category.description, None);
    }
}
