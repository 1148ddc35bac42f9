use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisteredRole {
    Admin,
    #[default]
    Normal,
}

/// Site member signed in through GitHub. Read-only here; used to attach
/// author details to public skill responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: String,
    #[serde(default)]
    pub github_id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub role: RegisteredRole,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

/// Public author block embedded in a skill response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorInfo {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl From<&RegisteredUser> for AuthorInfo {
    fn from(user: &RegisteredUser) -> Self {
        AuthorInfo {
            id: user.id.clone(),
            username: user.username.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}
