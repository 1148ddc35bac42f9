use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mapper::double_option;

use super::{check_length, is_http_url, new_id, optional_text, required_text};

/// Partner site shown in the link-exchange section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateLinkRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub enabled: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLinkRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub logo_url: Option<Option<String>>,
    pub enabled: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<Option<String>>,
    pub logo_url: Option<Option<String>>,
    pub enabled: Option<bool>,
    pub sort_order: Option<i32>,
}

impl CreateLinkRequest {
    pub fn validate(&self) -> Result<(), String> {
        let name = required_text(&self.name, "name")?;
        check_length(&name, "Name", 100)?;

        let url = required_text(&self.url, "url")?;
        validate_url(&url)?;

        Ok(())
    }

    pub fn into_link(self, now: DateTime<Utc>) -> Link {
        Link {
            id: new_id(),
            name: self.name.unwrap_or_default().trim().to_string(),
            url: self.url.unwrap_or_default().trim().to_string(),
            description: optional_text(self.description),
            logo_url: optional_text(self.logo_url),
            enabled: self.enabled.unwrap_or(true),
            sort_order: self.sort_order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        }
    }
}

impl UpdateLinkRequest {
    pub fn into_patch(self) -> Result<LinkPatch, String> {
        let name = match self.name {
            Some(name) => Some(required_text(&Some(name), "name")?),
            None => None,
        };

        let url = match self.url {
            Some(url) => {
                let url = required_text(&Some(url), "url")?;
                validate_url(&url)?;
                Some(url)
            }
            None => None,
        };

        Ok(LinkPatch {
            name,
            url,
            description: self.description.map(optional_text),
            logo_url: self.logo_url.map(optional_text),
            enabled: self.enabled,
            sort_order: self.sort_order,
        })
    }
}

impl LinkPatch {
    pub fn apply(&self, link: &mut Link, now: DateTime<Utc>) {
        if let Some(ref name) = self.name {
            link.name = name.clone();
        }
        if let Some(ref url) = self.url {
            link.url = url.clone();
        }
        if let Some(ref value) = self.description {
            link.description = value.clone();
        }
        if let Some(ref value) = self.logo_url {
            link.logo_url = value.clone();
        }
        if let Some(enabled) = self.enabled {
            link.enabled = enabled;
        }
        if let Some(order) = self.sort_order {
            link.sort_order = order;
        }

        link.updated_at = now;
    }
}

fn validate_url(url: &str) -> Result<(), String> {
    if !is_http_url(url) {
        return Err("URL must start with http:// or https://".to_string());
    }
    check_length(url, "URL", 2048)
}
